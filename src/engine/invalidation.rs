//! Per-profile scan cache with dirty tracking.
//!
//! Marking a profile dirty never drops its cached snapshot: stale data stays
//! readable until a successful rescan replaces it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::resolver::ResolvedGraph;
use crate::profile::ProfileId;

/// Result of one successful profile scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSnapshot {
    /// Discovered assets, deduplicated, in discovery order.
    pub assets: Vec<PathBuf>,
    /// Include resolution, present for composite profiles.
    pub composite: Option<ResolvedGraph>,
}

/// Cached scan state of one profile.
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    pub dirty: bool,
    /// At least one scan has completed.
    pub scanned: bool,
    pub snapshot: Option<Arc<ProfileSnapshot>>,
    pub scanned_at: Option<DateTime<Utc>>,
}

/// Source of truth for whether a profile's cached assets can be trusted.
///
/// Owned by a single mutator; no internal locking.
#[derive(Debug, Default)]
pub struct InvalidationStore {
    entries: HashMap<ProfileId, ScanState>,
}

impl InvalidationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a profile stale. Returns `true` if it was not dirty before.
    pub fn mark_dirty(&mut self, id: &ProfileId) -> bool {
        let entry = self.entries.entry(id.clone()).or_default();
        let newly_dirty = !entry.dirty;
        entry.dirty = true;

        if newly_dirty {
            crate::debug_event!("store", "dirty", "{id}");
        }
        newly_dirty
    }

    /// Replace the cached snapshot and clear the dirty flag.
    pub fn mark_clean(&mut self, id: &ProfileId, snapshot: ProfileSnapshot) {
        let entry = self.entries.entry(id.clone()).or_default();
        entry.dirty = false;
        entry.scanned = true;
        entry.snapshot = Some(Arc::new(snapshot));
        entry.scanned_at = Some(Utc::now());

        crate::debug_event!("store", "clean", "{id}");
    }

    /// Unknown profiles are not dirty.
    pub fn is_dirty(&self, id: &ProfileId) -> bool {
        self.entries.get(id).is_some_and(|entry| entry.dirty)
    }

    /// Dirty, or never scanned.
    pub fn needs_scan(&self, id: &ProfileId) -> bool {
        self.entries
            .get(id)
            .is_none_or(|entry| entry.dirty || !entry.scanned)
    }

    /// Last successful snapshot, possibly stale.
    pub fn snapshot(&self, id: &ProfileId) -> Option<Arc<ProfileSnapshot>> {
        self.entries.get(id).and_then(|entry| entry.snapshot.clone())
    }

    pub fn state(&self, id: &ProfileId) -> Option<&ScanState> {
        self.entries.get(id)
    }

    pub fn remove(&mut self, id: &ProfileId) -> Option<ScanState> {
        self.entries.remove(id)
    }

    /// Drop entries whose profile no longer exists.
    pub fn retain(&mut self, mut exists: impl FnMut(&ProfileId) -> bool) {
        self.entries.retain(|id, _| exists(id));
    }

    pub fn dirty_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.dirty).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(assets: &[&str]) -> ProfileSnapshot {
        ProfileSnapshot {
            assets: assets.iter().map(PathBuf::from).collect(),
            composite: None,
        }
    }

    #[test]
    fn test_unknown_profile_is_not_dirty() {
        let store = InvalidationStore::new();
        let id = ProfileId::from("ghost");

        assert!(!store.is_dirty(&id));
        assert!(store.needs_scan(&id));
        assert!(store.snapshot(&id).is_none());
    }

    #[test]
    fn test_mark_dirty_is_idempotent() {
        let mut store = InvalidationStore::new();
        let id = ProfileId::from("a");

        assert!(store.mark_dirty(&id));
        assert!(!store.mark_dirty(&id));
        assert!(store.is_dirty(&id));
        assert_eq!(store.len(), 1);
        assert_eq!(store.dirty_count(), 1);
    }

    #[test]
    fn test_dirty_keeps_stale_snapshot_readable() {
        let mut store = InvalidationStore::new();
        let id = ProfileId::from("a");

        store.mark_clean(&id, snapshot(&["Assets/A/x.png"]));
        store.mark_dirty(&id);

        let stale = store.snapshot(&id).unwrap();
        assert_eq!(stale.assets, vec![PathBuf::from("Assets/A/x.png")]);
        assert!(store.is_dirty(&id));
    }

    #[test]
    fn test_mark_clean_replaces_snapshot() {
        let mut store = InvalidationStore::new();
        let id = ProfileId::from("a");

        store.mark_dirty(&id);
        store.mark_clean(&id, snapshot(&["one"]));
        store.mark_dirty(&id);
        store.mark_clean(&id, snapshot(&["two"]));

        let state = store.state(&id).unwrap();
        assert!(!state.dirty);
        assert!(state.scanned);
        assert!(state.scanned_at.is_some());
        assert_eq!(state.snapshot.as_deref(), Some(&snapshot(&["two"])));
        assert!(!store.needs_scan(&id));
    }

    #[test]
    fn test_retain_drops_vanished_profiles() {
        let mut store = InvalidationStore::new();
        store.mark_dirty(&ProfileId::from("keep"));
        store.mark_dirty(&ProfileId::from("gone"));

        store.retain(|id| id.as_str() == "keep");

        assert_eq!(store.len(), 1);
        assert!(store.is_dirty(&ProfileId::from("keep")));
        assert!(!store.is_dirty(&ProfileId::from("gone")));
    }
}
