//! Flagscan - feature-flag usage scanner for code review.
//!
//! Flagscan scans source text and unified diffs for runtime feature-flag
//! ("flipper") checks, extracts the flag names involved, and synthesizes
//! the review artifacts a flag-gated change needs: a QA checklist and an
//! environment-setup brief. A reviewer can see at a glance "this change is
//! flag-gated, here is what to verify" without grepping the diff.
//!
//! # Architecture
//!
//! Matching is purely textual - no AST, no code execution:
//!
//! - `scan`: the detection engine - ordered rule registry, content matcher,
//!   and fingerprint-keyed result cache
//! - `diff`: unified-diff parsing with per-file content reconstruction
//! - `analyzer`: runs the matcher over every source file a diff touches
//! - `report`: markdown review sections and CLI output formats
//! - `cli`: command-line surface (`scan`, `diff`)
//!
//! Reports are a pure function of the detections found in one invocation;
//! nothing is persisted.

pub mod analyzer;
pub mod cli;
pub mod diff;
pub mod report;
pub mod scan;

pub use analyzer::{
    is_source_file, ContentOrigin, ContentSource, DiffAnalysisResult, DiffAnalyzer,
    FileAnalysisResult, FsContentSource, SourceError,
};
pub use diff::{ChangeStatus, FileChangeRecord};
pub use report::{build_sections, ReportSections};
pub use scan::{
    fingerprint, rules, AnalysisResult, ContentMatcher, Detection, DetectionRule, ResultCache,
    RuleCategory,
};
