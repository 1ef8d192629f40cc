//! Flag-usage detection: rule registry, content matcher, and result cache.

mod cache;
mod matcher;
mod rules;
mod types;

pub use cache::ResultCache;
pub use matcher::{fingerprint, ContentMatcher};
pub use rules::{rules, DetectionRule};
pub use types::{AnalysisResult, Detection, RuleCategory};
