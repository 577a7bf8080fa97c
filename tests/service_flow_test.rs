//! End-to-end flows through the coordinator service.
//!
//! All tests run on tokio's paused clock, so debounce timing is exact.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use exportwatch::config::EngineConfig;
use exportwatch::engine::{AssetCollector, ChangeCoordinator, CoordinatorService, EngineError};
use exportwatch::{NotificationBroadcaster, Profile, ProfileEvent, ProfileId};
use tokio::sync::broadcast;
use tokio::time::Instant;

#[derive(Default)]
struct CountingCollector {
    scans: AtomicUsize,
}

#[async_trait]
impl AssetCollector for CountingCollector {
    async fn scan(&self, profile: &Profile) -> Result<Vec<PathBuf>, EngineError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        Ok(profile
            .roots
            .iter()
            .map(|root| PathBuf::from(root).join("bar.png"))
            .collect())
    }
}

struct Harness {
    handle: exportwatch::CoordinatorHandle,
    events: broadcast::Receiver<ProfileEvent>,
    collector: Arc<CountingCollector>,
    task: tokio::task::JoinHandle<ChangeCoordinator>,
}

fn start(profiles: Vec<Profile>) -> Harness {
    let config = EngineConfig::default();
    let collector = Arc::new(CountingCollector::default());
    let broadcaster = Arc::new(NotificationBroadcaster::new(config.broadcast_capacity));
    let events = broadcaster.subscribe();

    let coordinator = ChangeCoordinator::builder()
        .collector(collector.clone())
        .broadcaster(broadcaster)
        .quiet_period(config.quiet_period())
        .profiles(profiles)
        .build()
        .unwrap();

    let (service, handle) = CoordinatorService::new(coordinator, &config);
    let task = tokio::spawn(service.run());

    Harness {
        handle,
        events,
        collector,
        task,
    }
}

fn details_changed(ids: &[&str]) -> ProfileEvent {
    ProfileEvent::DetailsChanged {
        profiles: ids.iter().map(|id| ProfileId::from(*id)).collect(),
    }
}

const QUIET: Duration = Duration::from_millis(750);
const TICK: Duration = Duration::from_millis(50);

#[tokio::test(start_paused = true)]
async fn test_change_batch_triggers_one_scan_after_quiet_period() {
    let mut h = start(vec![Profile::new("foo").with_root("Assets/Foo")]);

    h.handle.show("foo").await.unwrap();
    assert_eq!(h.events.recv().await.unwrap(), details_changed(&["foo"]));
    assert_eq!(h.collector.scans.load(Ordering::SeqCst), 1);

    let sent_at = Instant::now();
    h.handle.changes(["Assets/Foo/bar.png"]).await.unwrap();

    assert_eq!(h.events.recv().await.unwrap(), details_changed(&["foo"]));
    let waited = Instant::now() - sent_at;
    assert!(waited >= QUIET, "flushed after {waited:?}");
    assert!(waited <= QUIET + TICK, "flushed after {waited:?}");
    assert_eq!(h.collector.scans.load(Ordering::SeqCst), 2);

    h.handle.shutdown().await.unwrap();
    let coordinator = h.task.await.unwrap();
    assert!(!coordinator.is_dirty(&ProfileId::from("foo")));
    assert!(!coordinator.is_armed());
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_changes_coalesces_into_one_flush() {
    let mut h = start(vec![Profile::new("foo").with_root("Assets/Foo")]);
    h.handle.show("foo").await.unwrap();
    h.events.recv().await.unwrap();

    let mut last_sent = Instant::now();
    for i in 0..5 {
        h.handle
            .changes([format!("Assets/Foo/frame_{i}.png")])
            .await
            .unwrap();
        last_sent = Instant::now();
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    assert_eq!(h.events.recv().await.unwrap(), details_changed(&["foo"]));
    assert!(Instant::now() - last_sent >= QUIET);
    assert_eq!(h.collector.scans.load(Ordering::SeqCst), 2);

    // No second flush follows
    let extra = tokio::time::timeout(Duration::from_secs(10), h.events.recv()).await;
    assert!(extra.is_err());
    assert_eq!(h.collector.scans.load(Ordering::SeqCst), 2);

    h.handle.shutdown().await.unwrap();
    h.task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_spaced_changes_flush_separately() {
    let mut h = start(vec![Profile::new("foo").with_root("Assets/Foo")]);
    h.handle.show("foo").await.unwrap();
    h.events.recv().await.unwrap();

    for _ in 0..3 {
        h.handle.changes(["Assets/Foo/bar.png"]).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    for _ in 0..3 {
        assert_eq!(h.events.try_recv().unwrap(), details_changed(&["foo"]));
    }
    assert_eq!(h.collector.scans.load(Ordering::SeqCst), 4);

    h.handle.shutdown().await.unwrap();
    h.task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reload_window_drops_changes() {
    let mut h = start(vec![Profile::new("foo").with_root("Assets/Foo")]);
    h.handle.show("foo").await.unwrap();
    h.events.recv().await.unwrap();

    h.handle.begin_reload().await.unwrap();
    h.handle.changes(["Assets/Foo/bar.png"]).await.unwrap();
    h.handle.end_reload().await.unwrap();

    let flushed = tokio::time::timeout(Duration::from_secs(5), h.events.recv()).await;
    assert!(flushed.is_err());

    h.handle.shutdown().await.unwrap();
    let coordinator = h.task.await.unwrap();
    assert!(!coordinator.is_dirty(&ProfileId::from("foo")));
    assert_eq!(h.collector.scans.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hidden_profile_rescanned_lazily_on_show() {
    let mut h = start(vec![
        Profile::new("foo").with_root("Assets/Foo"),
        Profile::new("bar").with_root("Assets/Bar"),
    ]);
    h.handle.show("foo").await.unwrap();
    h.events.recv().await.unwrap();

    h.handle.hide("foo").await.unwrap();
    h.handle.changes(["Assets/Foo/a.png", "Assets/Bar/b.png"]).await.unwrap();
    tokio::time::sleep(QUIET * 2).await;

    assert!(h.events.try_recv().is_err());
    assert_eq!(h.collector.scans.load(Ordering::SeqCst), 1);

    h.handle.show("foo").await.unwrap();
    assert_eq!(h.events.recv().await.unwrap(), details_changed(&["foo"]));

    h.handle.shutdown().await.unwrap();
    let coordinator = h.task.await.unwrap();
    assert!(!coordinator.is_dirty(&ProfileId::from("foo")));
    assert!(coordinator.is_dirty(&ProfileId::from("bar")));
}

#[tokio::test(start_paused = true)]
async fn test_service_stops_when_handles_dropped() {
    let h = start(vec![]);
    drop(h.handle);
    let coordinator = h.task.await.unwrap();
    assert!(coordinator.profiles().is_empty());
}
