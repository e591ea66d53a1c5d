//! Session-wide response cache.
//!
//! The cache is an explicit service shared by handle. Only the data layer in
//! this crate writes to it; front ends get read access.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::RwLock;
use tracing::debug;

use crate::models::{CanonicalResult, GameDetails, HistoryEntry, Tag};

/// Thread-safe cache of tag lists, reconciled results, game details and history.
///
/// Writes are last-response-wins: whichever response for a key is stored
/// last is the authoritative value, regardless of request issue order.
#[derive(Debug, Clone, Default)]
pub struct ResponseCache {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    tags: HashMap<Option<usize>, Vec<Tag>>,
    results: HashMap<String, CanonicalResult>,
    details: HashMap<String, GameDetails>,
    history: Option<CachedHistory>,
}

#[derive(Debug)]
struct CachedHistory {
    entries: Vec<HistoryEntry>,
    fetched_at: Instant,
}

impl ResponseCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag list previously fetched for `count`.
    pub fn tags(&self, count: Option<usize>) -> Option<Vec<Tag>> {
        self.inner.read().tags.get(&count).cloned()
    }

    /// Reconciled result stored under `result_id`.
    pub fn result(&self, result_id: &str) -> Option<CanonicalResult> {
        self.inner.read().results.get(result_id).cloned()
    }

    /// Game details stored under `id`.
    pub fn details(&self, id: &str) -> Option<GameDetails> {
        self.inner.read().details.get(id).cloned()
    }

    /// History loaded less than `stale_after` ago.
    pub fn history(&self, stale_after: Duration) -> Option<Vec<HistoryEntry>> {
        let inner = self.inner.read();
        inner
            .history
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < stale_after)
            .map(|cached| cached.entries.clone())
    }

    /// Number of cached results and details, for diagnostics.
    pub fn entry_counts(&self) -> (usize, usize) {
        let inner = self.inner.read();
        (inner.results.len(), inner.details.len())
    }

    pub(crate) fn store_tags(&self, count: Option<usize>, tags: Vec<Tag>) {
        self.inner.write().tags.insert(count, tags);
    }

    pub(crate) fn store_result(&self, result: CanonicalResult) {
        debug!(result_id = %result.internal_id, "Caching result");
        self.inner
            .write()
            .results
            .insert(result.internal_id.clone(), result);
    }

    pub(crate) fn store_details(&self, id: &str, details: GameDetails) {
        debug!(id, "Caching game details");
        self.inner.write().details.insert(id.to_string(), details);
    }

    pub(crate) fn store_history(&self, entries: Vec<HistoryEntry>) {
        self.inner.write().history = Some(CachedHistory {
            entries,
            fetched_at: Instant::now(),
        });
    }

    /// Forget every cached result, e.g. when a new unrelated search starts.
    pub(crate) fn invalidate_results(&self) {
        self.inner.write().results.clear();
    }

    pub(crate) fn invalidate_history(&self) {
        self.inner.write().history = None;
    }

    /// Drop everything. Called on logout so nothing leaks across sessions.
    pub(crate) fn clear(&self) {
        let mut inner = self.inner.write();
        inner.tags.clear();
        inner.results.clear();
        inner.details.clear();
        inner.history = None;
        debug!("Response cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, name: &str) -> CanonicalResult {
        CanonicalResult {
            display_name: name.to_string(),
            internal_id: id.to_string(),
            external_id: None,
            summary_list: Vec::new(),
            details: None,
        }
    }

    #[test]
    fn later_store_overwrites_earlier_value() {
        let cache = ResponseCache::new();
        cache.store_result(result("x", "first"));
        cache.store_result(result("x", "second"));
        assert_eq!(cache.result("x").unwrap().display_name, "second");
        assert_eq!(cache.entry_counts(), (1, 0));
    }

    #[test]
    fn handles_share_state() {
        let cache = ResponseCache::new();
        let reader = cache.clone();
        cache.store_tags(Some(10), vec![Tag::new("1", "Action")]);
        assert_eq!(reader.tags(Some(10)).unwrap().len(), 1);
        assert!(reader.tags(None).is_none());
    }

    #[test]
    fn history_respects_staleness_window() {
        let cache = ResponseCache::new();
        cache.store_history(Vec::new());
        assert!(cache.history(Duration::from_secs(60)).is_some());
        assert!(cache.history(Duration::ZERO).is_none());

        cache.invalidate_history();
        assert!(cache.history(Duration::from_secs(60)).is_none());
    }

    #[test]
    fn clear_drops_every_key_space() {
        let cache = ResponseCache::new();
        cache.store_tags(None, vec![Tag::new("1", "Action")]);
        cache.store_result(result("x", "Hades"));
        cache.store_details("12", GameDetails::default());
        cache.store_history(Vec::new());

        cache.clear();
        assert!(cache.tags(None).is_none());
        assert!(cache.result("x").is_none());
        assert!(cache.details("12").is_none());
        assert!(cache.history(Duration::from_secs(60)).is_none());
    }
}
