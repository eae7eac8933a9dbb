//! Per-stream descriptor cache
//!
//! Holds the current SRI of every active stream together with a revision
//! number. Each install takes a fresh revision, so a connection that last
//! received an older revision must be sent the descriptor again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use contracts::{StreamId, StreamSri};

/// Current descriptor of one stream
#[derive(Debug, Clone)]
pub struct SriEntry {
    pub sri: Arc<StreamSri>,
    pub revision: u64,
    /// Revision at which the stream became active; kept across refreshes
    pub generation: u64,
}

#[derive(Debug, Default)]
pub struct SriCache {
    active: RwLock<HashMap<StreamId, SriEntry>>,
    /// Descriptors of ended streams, kept for late queries
    last_known: RwLock<HashMap<StreamId, Arc<StreamSri>>>,
    next_revision: AtomicU64,
}

impl SriCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn take_revision(&self) -> u64 {
        self.next_revision.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Install or refresh a descriptor; returns the new entry
    pub fn install(&self, sri: StreamSri) -> SriEntry {
        let revision = self.take_revision();
        let mut active = self.active.write();
        let generation = active
            .get(&sri.stream_id)
            .map_or(revision, |previous| previous.generation);
        let entry = SriEntry {
            sri: Arc::new(sri),
            revision,
            generation,
        };
        active.insert(entry.sri.stream_id.clone(), entry.clone());
        entry
    }

    /// Current entry, creating a default descriptor for an unseen stream.
    ///
    /// The boolean is true when the entry was created by this call.
    pub fn ensure(&self, stream_id: &str) -> (SriEntry, bool) {
        if let Some(entry) = self.active.read().get(stream_id) {
            return (entry.clone(), false);
        }
        let mut active = self.active.write();
        // Raced with another writer between the two locks
        if let Some(entry) = active.get(stream_id) {
            return (entry.clone(), false);
        }
        let revision = self.take_revision();
        let entry = SriEntry {
            sri: Arc::new(StreamSri::new(stream_id)),
            revision,
            generation: revision,
        };
        active.insert(StreamId::from(stream_id), entry.clone());
        (entry, true)
    }

    pub fn get(&self, stream_id: &str) -> Option<SriEntry> {
        self.active.read().get(stream_id).cloned()
    }

    pub fn contains(&self, stream_id: &str) -> bool {
        self.active.read().contains_key(stream_id)
    }

    /// Remove a stream from the active set, keeping its last descriptor
    pub fn retire(&self, stream_id: &str) -> Option<Arc<StreamSri>> {
        let entry = self.active.write().remove(stream_id)?;
        self.last_known
            .write()
            .insert(entry.sri.stream_id.clone(), Arc::clone(&entry.sri));
        Some(entry.sri)
    }

    pub fn current(&self) -> HashMap<String, StreamSri> {
        self.active
            .read()
            .iter()
            .map(|(id, entry)| (id.to_string(), StreamSri::clone(&entry.sri)))
            .collect()
    }

    /// Active descriptors ordered by stream id
    pub fn active(&self) -> Vec<StreamSri> {
        let mut list: Vec<_> = self
            .active
            .read()
            .values()
            .map(|entry| StreamSri::clone(&entry.sri))
            .collect();
        list.sort_by(|a, b| a.stream_id.cmp(&b.stream_id));
        list
    }

    pub fn stream_ids(&self) -> Vec<StreamId> {
        let mut ids: Vec<_> = self.active.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn last_known(&self, stream_id: &str) -> Option<StreamSri> {
        self.last_known
            .read()
            .get(stream_id)
            .map(|sri| StreamSri::clone(sri))
    }

    pub fn clear_last_known(&self) {
        self.last_known.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_bumps_revision_even_if_unchanged() {
        let cache = SriCache::new();
        let first = cache.install(StreamSri::new("s1"));
        let second = cache.install(StreamSri::new("s1"));
        assert!(second.revision > first.revision);
        assert_eq!(*first.sri, *second.sri);
        assert_eq!(second.generation, first.generation);
    }

    #[test]
    fn test_restarted_stream_gets_new_generation() {
        let cache = SriCache::new();
        let first = cache.install(StreamSri::new("s1"));
        cache.retire("s1");
        let (second, created) = cache.ensure("s1");
        assert!(created);
        assert_ne!(second.generation, first.generation);
    }

    #[test]
    fn test_ensure_creates_default_once() {
        let cache = SriCache::new();
        let (entry, created) = cache.ensure("s1");
        assert!(created);
        assert_eq!(*entry.sri, StreamSri::new("s1"));

        let (again, created) = cache.ensure("s1");
        assert!(!created);
        assert_eq!(again.revision, entry.revision);
    }

    #[test]
    fn test_retire_keeps_last_known() {
        let cache = SriCache::new();
        let mut sri = StreamSri::new("s1");
        sri.xdelta = 0.001;
        cache.install(sri.clone());

        assert!(cache.retire("s1").is_some());
        assert!(!cache.contains("s1"));
        assert_eq!(cache.last_known("s1"), Some(sri));

        cache.clear_last_known();
        assert!(cache.last_known("s1").is_none());
        assert!(cache.retire("s1").is_none());
    }

    #[test]
    fn test_active_is_sorted() {
        let cache = SriCache::new();
        cache.install(StreamSri::new("b"));
        cache.install(StreamSri::new("a"));
        let ids: Vec<_> = cache.active().into_iter().map(|s| s.stream_id).collect();
        assert_eq!(ids, vec![StreamId::from("a"), StreamId::from("b")]);
        assert_eq!(cache.current().len(), 2);
    }
}
