//! Diff analysis: runs the content matcher over every source file touched
//! by a unified diff and aggregates the flags found.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diff::{self, ChangeStatus, FileChangeRecord};
use crate::report;
use crate::scan::{ContentMatcher, Detection, ResultCache};

/// Extensions of source and template files worth scanning. Documentation
/// and style files are deliberately excluded: a false negative on an odd
/// extension beats flag-looking noise from prose.
static SOURCE_FILES: Lazy<GlobSet> = Lazy::new(|| {
    let mut builder = GlobSetBuilder::new();
    for pattern in [
        "*.ts", "*.tsx", "*.js", "*.jsx", "*.mjs", "*.html", "*.vue",
    ] {
        builder.add(Glob::new(pattern).unwrap());
    }
    builder.build().unwrap()
});

/// Whether a changed path passes the source/template filter.
pub fn is_source_file(path: &str) -> bool {
    match Path::new(path).file_name() {
        Some(name) => SOURCE_FILES.is_match(name),
        None => false,
    }
}

/// Failure while reading from a content source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Provides current file content when a diff carries none (e.g. rename-only
/// or mode-change sections).
///
/// `Ok(None)` means the file does not exist; `Err` means it could not be
/// read. Both are treated as "no content available" by the analyzer -
/// failures are logged, never fatal.
pub trait ContentSource: Send + Sync {
    fn read(&self, path: &str) -> Result<Option<String>, SourceError>;
}

/// Content source reading relative paths under a base directory.
pub struct FsContentSource {
    base: PathBuf,
}

impl FsContentSource {
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }
}

impl ContentSource for FsContentSource {
    fn read(&self, path: &str) -> Result<Option<String>, SourceError> {
        let full = self.base.join(path);
        match std::fs::read_to_string(&full) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SourceError::Io {
                path: path.to_string(),
                source: e,
            }),
        }
    }
}

/// Where a file's analyzed content came from.
///
/// Carried on each per-file result so a consumer can tell "scanned, found
/// nothing" apart from "could not be read".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentOrigin {
    /// Content reconstructed from the diff itself.
    Diff,
    /// Content read from the content-source collaborator.
    File,
    /// No content could be obtained; detections are necessarily empty.
    Unavailable,
}

/// Analysis of one file touched by a diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAnalysisResult {
    pub path: String,
    pub status: ChangeStatus,
    pub origin: ContentOrigin,
    pub detections: Vec<Detection>,
}

/// Aggregated analysis of a whole diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffAnalysisResult {
    pub files: Vec<FileAnalysisResult>,
    /// Unique resolved flag names, in order of first appearance.
    pub flags: Vec<String>,
    pub summary: String,
    /// QA checklist markdown; empty when no flags were found.
    pub qa_section: String,
    /// Environment-setup markdown; empty when no flags were found.
    pub details_section: String,
}

impl DiffAnalysisResult {
    /// Total detections across all files.
    pub fn detection_count(&self) -> usize {
        self.files.iter().map(|f| f.detections.len()).sum()
    }
}

/// Orchestrates diff parsing, file filtering, and per-file matching.
pub struct DiffAnalyzer {
    matcher: ContentMatcher,
    source: Option<Box<dyn ContentSource>>,
}

impl Default for DiffAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffAnalyzer {
    pub fn new() -> Self {
        Self {
            matcher: ContentMatcher::new(),
            source: None,
        }
    }

    /// Share a result cache with other matchers.
    pub fn with_cache(cache: Arc<ResultCache>) -> Self {
        Self {
            matcher: ContentMatcher::with_cache(cache),
            source: None,
        }
    }

    /// Set the collaborator used to read files the diff carries no content
    /// for.
    pub fn content_source<S: ContentSource + 'static>(mut self, source: S) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Entry point for cache-invalidation signals (e.g. file watchers).
    pub fn clear_cache(&self) {
        self.matcher.cache().clear();
    }

    /// Analyze every source file touched by a unified diff.
    pub fn analyze_diff(&self, diff_text: &str) -> DiffAnalysisResult {
        let records: Vec<FileChangeRecord> = diff::parse(diff_text)
            .into_iter()
            .filter(|r| is_source_file(&r.path))
            .collect();

        // Per-file analyses are independent; the result cache is the only
        // shared state and supports concurrent insert/lookup.
        let files: Vec<FileAnalysisResult> = records
            .par_iter()
            .map(|record| self.analyze_file(record))
            .collect();

        let mut seen = HashSet::new();
        let mut flags = Vec::new();
        for file in &files {
            for detection in &file.detections {
                if let Some(flag) = &detection.flag {
                    if seen.insert(flag.clone()) {
                        flags.push(flag.clone());
                    }
                }
            }
        }

        let sections = report::build_sections(&flags);
        let summary = format!(
            "{} source file(s) analyzed, {} flag(s) touched",
            files.len(),
            flags.len()
        );

        DiffAnalysisResult {
            files,
            flags,
            summary,
            qa_section: sections.qa,
            details_section: sections.details,
        }
    }

    fn analyze_file(&self, record: &FileChangeRecord) -> FileAnalysisResult {
        if record.status == ChangeStatus::Deleted {
            return FileAnalysisResult {
                path: record.path.clone(),
                status: record.status,
                origin: ContentOrigin::Unavailable,
                detections: vec![],
            };
        }

        let (origin, content) = if !record.content.is_empty() {
            (ContentOrigin::Diff, Some(record.content.clone()))
        } else {
            self.fetch_content(&record.path)
        };

        let detections = match content {
            Some(text) => self.matcher.analyze(&text).detections.clone(),
            None => vec![],
        };

        FileAnalysisResult {
            path: record.path.clone(),
            status: record.status,
            origin,
            detections,
        }
    }

    /// Best-effort read through the content source. One failing read must
    /// not abort analysis of the remaining files.
    fn fetch_content(&self, path: &str) -> (ContentOrigin, Option<String>) {
        let Some(source) = &self.source else {
            log::debug!("no content source configured, skipping {}", path);
            return (ContentOrigin::Unavailable, None);
        };
        match source.read(path) {
            Ok(Some(text)) => (ContentOrigin::File, Some(text)),
            Ok(None) => {
                log::debug!("{} not present in content source", path);
                (ContentOrigin::Unavailable, None)
            }
            Err(e) => {
                log::warn!("{}", e);
                (ContentOrigin::Unavailable, None)
            }
        }
    }
}
