//! Ties relevance matching, invalidation, debouncing and composite
//! resolution together.
//!
//! The coordinator is a plain single-owner state machine. It never blocks;
//! whoever owns it feeds change batches in and calls [`ChangeCoordinator::tick`]
//! while the scheduler is armed.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexSet;
use tokio::time::{Duration, Instant};

use super::collector::{AssetCollector, NoopObserver, RescanObserver};
use super::debouncer::{DebounceScheduler, PendingSet, Transition};
use super::error::{EngineError, EngineResult};
use super::invalidation::{InvalidationStore, ProfileSnapshot};
use super::relevance::PathMatcher;
use super::resolver::{CompositeResolver, ResolvedGraph};
use crate::config::Settings;
use crate::notifications::{NotificationBroadcaster, ProfileEvent};
use crate::profile::{Profile, ProfileId, ProfileRegistry};

/// Outcome of one debounce flush.
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Visible profiles rescanned and marked clean.
    pub rescanned: Vec<ProfileId>,
    /// Hidden profiles left dirty for a lazy rescan on display.
    pub deferred: Vec<ProfileId>,
    /// Rescans that failed; these profiles stay dirty.
    pub failed: Vec<(ProfileId, EngineError)>,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.rescanned.is_empty() && self.deferred.is_empty() && self.failed.is_empty()
    }
}

/// Entry point for change batches and profile lifecycle events.
pub struct ChangeCoordinator {
    profiles: ProfileRegistry,
    matcher: PathMatcher,
    store: InvalidationStore,
    scheduler: DebounceScheduler,
    collector: Arc<dyn AssetCollector>,
    observer: Arc<dyn RescanObserver>,
    broadcaster: Arc<NotificationBroadcaster>,
    /// Profiles currently shown in a detail view.
    visible: HashSet<ProfileId>,
    /// Host is mid bulk reload; change batches are dropped.
    reloading: bool,
}

impl ChangeCoordinator {
    pub fn builder() -> ChangeCoordinatorBuilder {
        ChangeCoordinatorBuilder::new()
    }

    /// Handle a batch of raw changed paths.
    ///
    /// Marks every affected profile dirty, along with every composite that
    /// includes one of them, and arms or extends the debounce.
    pub fn on_changes<P: AsRef<str>>(&mut self, batch: &[P], now: Instant) -> Transition {
        if self.reloading {
            crate::debug_event!("coordinator", "dropped", "{} paths during reload", batch.len());
            return Transition::Ignored;
        }
        if batch.is_empty() {
            return Transition::Ignored;
        }

        self.prune_store();

        let direct: Vec<ProfileId> = self
            .profiles
            .iter()
            .filter(|profile| !profile.roots.is_empty())
            .filter(|profile| self.matcher.is_relevant(profile.roots.as_slice(), batch))
            .map(|profile| profile.id.clone())
            .collect();

        if direct.is_empty() {
            crate::debug_event!("coordinator", "irrelevant", "{} paths", batch.len());
            return Transition::Ignored;
        }

        let affected = self.with_dependents(direct);
        crate::debug_event!(
            "coordinator",
            "affected",
            "{} profiles by {} paths",
            affected.len(),
            batch.len()
        );
        self.invalidate(affected, now)
    }

    /// Add or replace a profile definition.
    ///
    /// A change to the roots or include list invalidates the profile and the
    /// composites that include it.
    pub fn upsert_profile(&mut self, profile: Profile, now: Instant) -> Transition {
        let id = profile.id.clone();
        let changed = match self.profiles.get(&id) {
            Some(existing) => existing.scan_inputs_differ(&profile),
            None => true,
        };
        self.profiles.upsert(profile);

        if !changed {
            return Transition::Ignored;
        }
        crate::debug_event!("coordinator", "definition changed", "{id}");
        let affected = self.with_dependents(vec![id]);
        self.invalidate(affected, now)
    }

    /// Stop tracking a profile. Composites that included it become dirty.
    pub fn remove_profile(&mut self, id: &ProfileId, now: Instant) -> Transition {
        if !self.profiles.contains(id) {
            return Transition::Ignored;
        }
        let dependents: Vec<ProfileId> = self
            .with_dependents(vec![id.clone()])
            .into_iter()
            .filter(|dependent| dependent != id)
            .collect();

        self.profiles.remove(id);
        self.store.remove(id);
        self.scheduler.remove(id);
        self.visible.remove(id);
        self.broadcaster.send(ProfileEvent::Removed { profile: id.clone() });
        crate::log_event!("coordinator", "removed", "{id}");

        self.invalidate(dependents, now)
    }

    /// Run a flush if the quiet period has elapsed.
    pub async fn tick(&mut self, now: Instant) -> Option<FlushReport> {
        let pending = self.scheduler.poll(now)?;
        Some(self.flush(pending).await)
    }

    /// Rescan visible dirty profiles in `pending`; leave hidden ones dirty.
    async fn flush(&mut self, pending: PendingSet) -> FlushReport {
        let mut report = FlushReport::default();

        for id in pending {
            if !self.profiles.contains(&id) {
                self.store.remove(&id);
                continue;
            }
            if !self.store.is_dirty(&id) {
                // Already refreshed since it was queued
                continue;
            }
            if !self.visible.contains(&id) {
                report.deferred.push(id);
                continue;
            }

            match self.scan_profile(&id).await {
                Ok(_) => report.rescanned.push(id),
                Err(e) => {
                    tracing::error!("[coordinator] rescan of {id} failed: {e}");
                    self.broadcaster.send(ProfileEvent::ScanFailed {
                        profile: id.clone(),
                        reason: e.to_string(),
                    });
                    report.failed.push((id, e));
                }
            }
        }

        if !report.rescanned.is_empty() {
            self.broadcaster.send(ProfileEvent::DetailsChanged {
                profiles: report.rescanned.clone(),
            });
        }

        crate::log_event!(
            "coordinator",
            "flush",
            "{} rescanned, {} deferred, {} failed",
            report.rescanned.len(),
            report.deferred.len(),
            report.failed.len()
        );
        report
    }

    /// The profile entered the display scope. Rescans it if it is dirty or
    /// has never been scanned. Returns whether a rescan ran.
    pub async fn on_displayed(&mut self, id: &ProfileId) -> EngineResult<bool> {
        self.require(id)?;
        self.visible.insert(id.clone());

        if !self.store.needs_scan(id) {
            return Ok(false);
        }
        self.rescan(id).await.map(|_| true)
    }

    /// The profile left the display scope.
    pub fn on_hidden(&mut self, id: &ProfileId) {
        self.visible.remove(id);
    }

    /// Rescan a profile now regardless of its dirty state.
    ///
    /// Returns the number of discovered assets.
    pub async fn rescan(&mut self, id: &ProfileId) -> EngineResult<usize> {
        match self.scan_profile(id).await {
            Ok(count) => {
                self.broadcaster.send(ProfileEvent::DetailsChanged {
                    profiles: vec![id.clone()],
                });
                Ok(count)
            }
            Err(e) => {
                tracing::error!("[coordinator] rescan of {id} failed: {e}");
                self.broadcaster.send(ProfileEvent::ScanFailed {
                    profile: id.clone(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Scan a profile and, for composites, every resolved member.
    ///
    /// Members with a clean snapshot reuse it; plain members scanned here
    /// are stored as their own snapshot. On any failure the profile's
    /// snapshot is left untouched and it stays dirty.
    async fn scan_profile(&mut self, id: &ProfileId) -> EngineResult<usize> {
        let profile = self.require(id)?.clone();
        let collector = Arc::clone(&self.collector);

        let mut assets: IndexSet<PathBuf> = collector.scan(&profile).await?.into_iter().collect();

        let composite = if profile.is_composite() {
            let graph = self.resolve_profile(&profile);
            for cycle in &graph.cycles {
                let path: Vec<&str> = cycle.iter().map(ProfileId::as_str).collect();
                tracing::warn!("[resolver] include cycle in {id}: {}", path.join(" -> "));
            }

            for member_id in &graph.members {
                let member_assets = match self.store.snapshot(member_id) {
                    Some(snapshot) if !self.store.needs_scan(member_id) => snapshot.assets.clone(),
                    _ => {
                        let member = self.require(member_id)?.clone();
                        let scanned = collector.scan(&member).await?;
                        if !member.is_composite() {
                            // A plain member's scan is its complete snapshot
                            self.store.mark_clean(
                                member_id,
                                ProfileSnapshot {
                                    assets: scanned.clone(),
                                    composite: None,
                                },
                            );
                            self.observer.on_rescanned(member_id, scanned.len());
                        }
                        scanned
                    }
                };
                assets.extend(member_assets);
            }
            Some(graph)
        } else {
            None
        };

        let count = assets.len();
        self.store.mark_clean(
            id,
            ProfileSnapshot {
                assets: assets.into_iter().collect(),
                composite,
            },
        );
        self.observer.on_rescanned(id, count);
        crate::log_event!("coordinator", "rescanned", "{id} ({count} assets)");

        Ok(count)
    }

    /// Ignore change batches until [`ChangeCoordinator::end_reload`].
    pub fn begin_reload(&mut self) {
        self.reloading = true;
        crate::debug_event!("coordinator", "reload started");
    }

    pub fn end_reload(&mut self) {
        self.reloading = false;
        crate::debug_event!("coordinator", "reload finished");
    }

    pub fn is_reloading(&self) -> bool {
        self.reloading
    }

    /// Resolve the include graph of a tracked profile.
    pub fn resolve(&self, id: &ProfileId) -> Option<ResolvedGraph> {
        self.profiles.get(id).map(|profile| self.resolve_profile(profile))
    }

    fn resolve_profile(&self, profile: &Profile) -> ResolvedGraph {
        CompositeResolver::new(|id: &ProfileId| self.profiles.get(id)).resolve(profile)
    }

    /// `ids` plus every composite whose resolved graph contains one of them.
    fn with_dependents(&self, ids: Vec<ProfileId>) -> Vec<ProfileId> {
        let mut affected: IndexSet<ProfileId> = ids.into_iter().collect();
        let resolver = CompositeResolver::new(|id: &ProfileId| self.profiles.get(id));

        for profile in self.profiles.iter().filter(|p| p.is_composite()) {
            if affected.contains(&profile.id) {
                continue;
            }
            let graph = resolver.resolve(profile);
            if graph.members.iter().any(|member| affected.contains(member)) {
                affected.insert(profile.id.clone());
            }
        }

        affected.into_iter().collect()
    }

    fn invalidate(&mut self, ids: Vec<ProfileId>, now: Instant) -> Transition {
        for id in &ids {
            self.store.mark_dirty(id);
        }
        self.scheduler.notify(ids, now)
    }

    fn prune_store(&mut self) {
        let profiles = &self.profiles;
        self.store.retain(|id| profiles.contains(id));
    }

    fn require(&self, id: &ProfileId) -> EngineResult<&Profile> {
        self.profiles
            .get(id)
            .ok_or_else(|| EngineError::UnknownProfile {
                profile: id.clone(),
            })
    }

    /// Dirty state of a profile. Vanished profiles are not dirty.
    pub fn is_dirty(&self, id: &ProfileId) -> bool {
        self.profiles.contains(id) && self.store.is_dirty(id)
    }

    /// Last snapshot of a profile, possibly stale.
    pub fn snapshot(&self, id: &ProfileId) -> Option<Arc<ProfileSnapshot>> {
        if !self.profiles.contains(id) {
            return None;
        }
        self.store.snapshot(id)
    }

    pub fn is_visible(&self, id: &ProfileId) -> bool {
        self.visible.contains(id)
    }

    pub fn is_armed(&self) -> bool {
        self.scheduler.is_armed()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    pub fn pending(&self) -> &PendingSet {
        self.scheduler.pending()
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    pub fn store(&self) -> &InvalidationStore {
        &self.store
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ProfileEvent> {
        self.broadcaster.subscribe()
    }
}

/// Builder for constructing a [`ChangeCoordinator`].
pub struct ChangeCoordinatorBuilder {
    collector: Option<Arc<dyn AssetCollector>>,
    observer: Arc<dyn RescanObserver>,
    broadcaster: Option<Arc<NotificationBroadcaster>>,
    project_root: Option<String>,
    quiet_period: Duration,
    broadcast_capacity: usize,
    profiles: ProfileRegistry,
}

impl ChangeCoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            collector: None,
            observer: Arc::new(NoopObserver),
            broadcaster: None,
            project_root: None,
            quiet_period: Duration::from_millis(750),
            broadcast_capacity: 100,
            profiles: ProfileRegistry::new(),
        }
    }

    /// Take the quiet period, broadcast capacity and project root from
    /// settings. A relative project root is resolved against the current
    /// directory.
    pub fn settings(mut self, settings: &Settings) -> Self {
        self.quiet_period = settings.engine.quiet_period();
        self.broadcast_capacity = settings.engine.broadcast_capacity;
        self.project_root = settings.project_root.as_ref().map(|root| {
            crate::config::absolute_root(root)
                .unwrap_or_else(|_| root.clone())
                .to_string_lossy()
                .into_owned()
        });
        self
    }

    /// Set the asset collector (required).
    pub fn collector(mut self, collector: Arc<dyn AssetCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    /// Set the rescan observer. Defaults to [`NoopObserver`].
    pub fn observer(mut self, observer: Arc<dyn RescanObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Capacity of the private broadcaster created when none is injected.
    pub fn broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the notification broadcaster. A private one is created otherwise.
    pub fn broadcaster(mut self, broadcaster: Arc<NotificationBroadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn project_root(mut self, root: impl Into<String>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    pub fn quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = quiet_period;
        self
    }

    /// Seed the initial profiles.
    pub fn profiles(mut self, profiles: impl IntoIterator<Item = Profile>) -> Self {
        for profile in profiles {
            self.profiles.upsert(profile);
        }
        self
    }

    pub fn build(self) -> EngineResult<ChangeCoordinator> {
        let collector = self.collector.ok_or_else(|| EngineError::Config {
            reason: "Asset collector is required".to_string(),
        })?;

        let matcher = match self.project_root {
            Some(root) => PathMatcher::with_project_root(root),
            None => PathMatcher::new(),
        };

        Ok(ChangeCoordinator {
            profiles: self.profiles,
            matcher,
            store: InvalidationStore::new(),
            scheduler: DebounceScheduler::new(self.quiet_period),
            collector,
            observer: self.observer,
            broadcaster: self.broadcaster.unwrap_or_else(|| {
                Arc::new(NotificationBroadcaster::new(self.broadcast_capacity))
            }),
            visible: HashSet::new(),
            reloading: false,
        })
    }
}

impl Default for ChangeCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
