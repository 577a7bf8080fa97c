//! Incremental invalidation engine for export profiles.
//!
//! Decides when a profile's discovered-asset list is stale and when to
//! rescan it. The scan itself is delegated to an [`AssetCollector`].
//!
//! # Architecture
//!
//! ```text
//! change batch
//!     |
//! ChangeCoordinator
//!   - PathMatcher        (is the path under a profile root?)
//!   - InvalidationStore  (dirty flag + last snapshot per profile)
//!   - DebounceScheduler  (one flush per quiet period)
//!   - CompositeResolver  (flattened, cycle-safe include graph)
//!     |
//! flush -> AssetCollector::scan -> ProfileEvent::DetailsChanged
//! ```
//!
//! [`CoordinatorService`] drives a coordinator on a tokio task with a
//! [`Ticker`] that only runs while a flush is pending.

mod collector;
mod coordinator;
mod debouncer;
mod error;
mod invalidation;
mod relevance;
mod resolver;
mod service;
mod ticker;

pub use collector::{AssetCollector, NoopObserver, RescanObserver};
pub use coordinator::{ChangeCoordinator, ChangeCoordinatorBuilder, FlushReport};
pub use debouncer::{DebounceScheduler, PendingSet, SchedulerState, Transition};
pub use error::{EngineError, EngineResult};
pub use invalidation::{InvalidationStore, ProfileSnapshot, ScanState};
pub use relevance::PathMatcher;
pub use resolver::{CompositeResolver, ResolvedGraph, resolve_in};
pub use service::{Command, CoordinatorHandle, CoordinatorService};
pub use ticker::Ticker;
