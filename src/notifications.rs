//! Profile change notifications.
//!
//! A broadcast channel that UI panels (or any other subscriber) listen on
//! to refresh after the engine rescans profiles.

use tokio::sync::broadcast;

use crate::profile::ProfileId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileEvent {
    /// Rescanned profiles have fresh details.
    DetailsChanged { profiles: Vec<ProfileId> },
    /// A rescan failed; the profile stays dirty.
    ScanFailed { profile: ProfileId, reason: String },
    /// The profile is no longer tracked.
    Removed { profile: ProfileId },
}

/// Fan-out of [`ProfileEvent`]s to any number of subscribers.
#[derive(Clone)]
pub struct NotificationBroadcaster {
    sender: broadcast::Sender<ProfileEvent>,
}

impl NotificationBroadcaster {
    /// Create a new broadcaster with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send an event to all subscribers
    pub fn send(&self, event: ProfileEvent) {
        match self.sender.send(event) {
            Ok(count) => {
                crate::debug_event!("broadcast", "sent", "to {count} subscribers");
            }
            Err(broadcast::error::SendError(event)) => {
                // No receivers, this is fine
                crate::debug_event!("broadcast", "dropped", "no subscribers for {event:?}");
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProfileEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
