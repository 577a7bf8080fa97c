pub mod config;
pub mod engine;
pub mod logging;
pub mod notifications;
pub mod profile;

pub use config::Settings;
pub use engine::{
    AssetCollector, ChangeCoordinator, CompositeResolver, CoordinatorHandle, CoordinatorService,
    EngineError, PathMatcher, ResolvedGraph,
};
pub use notifications::{NotificationBroadcaster, ProfileEvent};
pub use profile::{Profile, ProfileId, ProfileRegistry};
