//! Collaborators injected into the coordinator.

use std::path::PathBuf;

use async_trait::async_trait;

use super::EngineError;
use crate::profile::{Profile, ProfileId};

/// Enumerates the assets a profile's export roots currently contain.
///
/// Implemented by the host; the engine only decides when to call it.
#[async_trait]
pub trait AssetCollector: Send + Sync {
    /// Discover the assets under `profile`'s roots.
    async fn scan(&self, profile: &Profile) -> Result<Vec<PathBuf>, EngineError>;
}

/// Optional side effects of a completed rescan.
pub trait RescanObserver: Send + Sync {
    /// Called after `id` was rescanned and marked clean.
    fn on_rescanned(&self, id: &ProfileId, asset_count: usize);
}

/// Observer that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RescanObserver for NoopObserver {
    fn on_rescanned(&self, _id: &ProfileId, _asset_count: usize) {}
}
