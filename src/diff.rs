//! Unified-diff parsing.
//!
//! Reconstructs, per changed file, the text of the file as it now reads:
//! added (`+`) and context (leading space) lines are kept, removed lines and
//! everything else are dropped. This is a best-effort reconstruction, not a
//! byte-exact checkout - detection only needs to see the resulting text.

use serde::{Deserialize, Serialize};

/// How a file was changed in the diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeStatus::Added => write!(f, "added"),
            ChangeStatus::Modified => write!(f, "modified"),
            ChangeStatus::Deleted => write!(f, "deleted"),
            ChangeStatus::Renamed => write!(f, "renamed"),
        }
    }
}

/// One file section of a unified diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeRecord {
    /// Post-change path (the "b/" side of the diff header).
    pub path: String,
    pub status: ChangeStatus,
    /// Reconstructed current content. Always empty for deleted files.
    pub content: String,
}

/// Parse a unified diff into per-file change records, in diff order.
///
/// Best-effort: unrecognized lines are skipped, never rejected. Content
/// lines appearing before the first file header are ignored.
pub fn parse(diff_text: &str) -> Vec<FileChangeRecord> {
    let mut files = Vec::new();
    let mut current: Option<FileChangeRecord> = None;

    for line in diff_text.lines() {
        if let Some(header) = line.strip_prefix("diff --git ") {
            flush(&mut files, current.take());
            current = Some(FileChangeRecord {
                path: header_path(header),
                status: ChangeStatus::Modified,
                content: String::new(),
            });
            continue;
        }

        let Some(file) = current.as_mut() else {
            continue;
        };

        if line.starts_with("new file mode") {
            file.status = ChangeStatus::Added;
        } else if line.starts_with("deleted file mode") {
            file.status = ChangeStatus::Deleted;
        } else if line.starts_with("rename from") || line.starts_with("rename to") {
            file.status = ChangeStatus::Renamed;
        } else if line.starts_with("+++") || line.starts_with("---") {
            // File-header lines, not content.
        } else if let Some(added) = line.strip_prefix('+') {
            file.content.push_str(added);
            file.content.push('\n');
        } else if let Some(context) = line.strip_prefix(' ') {
            file.content.push_str(context);
            file.content.push('\n');
        }
        // Removed lines, hunk headers, index lines: ignored.
    }

    flush(&mut files, current);
    files
}

/// Extract the post-change path from a `diff --git a/<path> b/<path>` header.
fn header_path(header: &str) -> String {
    header
        .split(" b/")
        .last()
        .unwrap_or(header)
        .trim()
        .to_string()
}

fn flush(files: &mut Vec<FileChangeRecord>, current: Option<FileChangeRecord>) {
    if let Some(mut file) = current {
        if file.status == ChangeStatus::Deleted {
            file.content.clear();
        }
        files.push(file);
    }
}
