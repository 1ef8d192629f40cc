//! In-memory cache of analysis results, keyed by content fingerprint.
//!
//! The cache is purely a performance optimization: clearing it never changes
//! observable behavior. It has no TTL or staleness detection of its own -
//! collaborators watching the underlying files are responsible for calling
//! `clear()` when content changes.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::AnalysisResult;

/// Maps a text fingerprint to the result computed for that text.
///
/// Entries are written on miss and never updated in place; concurrent
/// writers for the same fingerprint always carry identical results, so
/// last-writer-wins is fine.
#[derive(Default)]
pub struct ResultCache {
    entries: RwLock<HashMap<u64, Arc<AnalysisResult>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a previously computed result.
    pub fn get(&self, fingerprint: u64) -> Option<Arc<AnalysisResult>> {
        let entries = self.entries.read().ok()?;
        entries.get(&fingerprint).cloned()
    }

    /// Store a computed result.
    pub fn insert(&self, fingerprint: u64, result: Arc<AnalysisResult>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(fingerprint, result);
        }
    }

    /// Drop all entries at once.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
