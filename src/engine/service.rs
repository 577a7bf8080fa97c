//! Async driver that owns a [`ChangeCoordinator`].
//!
//! The host talks to the service through a [`CoordinatorHandle`]. Commands
//! and ticks are handled on one task, so the coordinator has exactly one
//! mutator and needs no locking.

use tokio::sync::mpsc;
use tokio::time::Instant;

use super::coordinator::ChangeCoordinator;
use super::error::{EngineError, EngineResult};
use super::ticker::Ticker;
use crate::config::EngineConfig;
use crate::profile::{Profile, ProfileId};

/// Messages from the host to the service.
#[derive(Debug, Clone)]
pub enum Command {
    /// Raw changed paths from the host's asset-change feed.
    Changes(Vec<String>),
    UpsertProfile(Profile),
    RemoveProfile(ProfileId),
    /// A profile entered the detail view.
    Show(ProfileId),
    /// A profile left the detail view.
    Hide(ProfileId),
    /// Force a rescan.
    Rescan(ProfileId),
    /// The host started a bulk reload; drop changes until `EndReload`.
    BeginReload,
    EndReload,
    Shutdown,
}

/// Cloneable sender side for host callbacks.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    pub async fn send(&self, command: Command) -> EngineResult<()> {
        self.sender
            .send(command)
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }

    /// Forward a change batch. Empty batches are not sent.
    pub async fn changes<I, S>(&self, paths: I) -> EngineResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return Ok(());
        }
        self.send(Command::Changes(paths)).await
    }

    pub async fn upsert_profile(&self, profile: Profile) -> EngineResult<()> {
        self.send(Command::UpsertProfile(profile)).await
    }

    pub async fn remove_profile(&self, id: impl Into<ProfileId>) -> EngineResult<()> {
        self.send(Command::RemoveProfile(id.into())).await
    }

    pub async fn show(&self, id: impl Into<ProfileId>) -> EngineResult<()> {
        self.send(Command::Show(id.into())).await
    }

    pub async fn hide(&self, id: impl Into<ProfileId>) -> EngineResult<()> {
        self.send(Command::Hide(id.into())).await
    }

    pub async fn rescan(&self, id: impl Into<ProfileId>) -> EngineResult<()> {
        self.send(Command::Rescan(id.into())).await
    }

    pub async fn begin_reload(&self) -> EngineResult<()> {
        self.send(Command::BeginReload).await
    }

    pub async fn end_reload(&self) -> EngineResult<()> {
        self.send(Command::EndReload).await
    }

    pub async fn shutdown(&self) -> EngineResult<()> {
        self.send(Command::Shutdown).await
    }
}

/// Event loop around a coordinator and its ticker.
pub struct CoordinatorService {
    coordinator: ChangeCoordinator,
    ticker: Ticker,
    commands: mpsc::Receiver<Command>,
}

impl CoordinatorService {
    /// Wrap a coordinator, returning the service and its handle.
    pub fn new(coordinator: ChangeCoordinator, config: &EngineConfig) -> (Self, CoordinatorHandle) {
        let (sender, commands) = mpsc::channel(config.channel_capacity.max(1));
        let service = Self {
            coordinator,
            ticker: Ticker::new(config.tick_interval()),
            commands,
        };
        (service, CoordinatorHandle { sender })
    }

    /// Process commands and ticks until shutdown or until every handle is
    /// dropped. Returns the coordinator for inspection.
    ///
    /// Queued commands are always handled before a tick, so a flush never
    /// overtakes a change batch that arrived before it.
    pub async fn run(mut self) -> ChangeCoordinator {
        crate::log_event!("service", "started");

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => {
                    let Some(command) = command else {
                        crate::debug_event!("service", "all handles dropped");
                        break;
                    };
                    if !self.handle(command).await {
                        break;
                    }
                }

                _ = self.ticker.tick() => {
                    if let Some(report) = self.coordinator.tick(Instant::now()).await {
                        for (id, e) in &report.failed {
                            tracing::warn!("[service] {id} stays dirty: {e}");
                        }
                    }
                }
            }

            self.sync_ticker();
        }

        self.ticker.stop();
        crate::log_event!("service", "stopped");
        self.coordinator
    }

    /// Handle one command. Returns `false` on shutdown.
    async fn handle(&mut self, command: Command) -> bool {
        let now = Instant::now();

        match command {
            Command::Changes(paths) => {
                self.coordinator.on_changes(paths.as_slice(), now);
            }
            Command::UpsertProfile(profile) => {
                self.coordinator.upsert_profile(profile, now);
            }
            Command::RemoveProfile(id) => {
                self.coordinator.remove_profile(&id, now);
            }
            Command::Show(id) => {
                if let Err(e) = self.coordinator.on_displayed(&id).await {
                    tracing::warn!("[service] show {id}: {e}");
                }
            }
            Command::Hide(id) => self.coordinator.on_hidden(&id),
            Command::Rescan(id) => {
                if let Err(e) = self.coordinator.rescan(&id).await {
                    tracing::warn!("[service] rescan {id}: {e}");
                }
            }
            Command::BeginReload => self.coordinator.begin_reload(),
            Command::EndReload => self.coordinator.end_reload(),
            Command::Shutdown => return false,
        }

        true
    }

    /// Tick only while the scheduler is armed.
    fn sync_ticker(&mut self) {
        if self.coordinator.is_armed() {
            self.ticker.start();
        } else {
            self.ticker.stop();
        }
    }
}
