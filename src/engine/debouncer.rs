//! Debouncing of profile rescans.
//!
//! Coalesces bursts of relevant changes into one flush per quiet period.
//! An unbroken stream of changes keeps pushing the deadline out; this is a
//! debounce, not a rate limiter.

use indexmap::IndexSet;
use tokio::time::{Duration, Instant};

use crate::profile::ProfileId;

/// Profiles awaiting rescan, in first-notified order.
pub type PendingSet = IndexSet<ProfileId>;

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed { deadline: Instant },
}

/// Effect of a notification on the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Idle to Armed. The periodic hook must be started.
    Armed,
    /// Deadline pushed out while already armed.
    Extended,
    /// Nothing to schedule.
    Ignored,
}

/// Deadline-based debouncer over a set of pending profiles.
///
/// The caller supplies `now` so the state machine stays independent of the
/// clock driving it.
#[derive(Debug)]
pub struct DebounceScheduler {
    pending: PendingSet,
    quiet_period: Duration,
    state: SchedulerState,
}

impl DebounceScheduler {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            pending: PendingSet::new(),
            quiet_period,
            state: SchedulerState::Idle,
        }
    }

    /// Record profiles needing a rescan and restart the quiet period.
    pub fn notify(&mut self, ids: impl IntoIterator<Item = ProfileId>, now: Instant) -> Transition {
        let before = self.pending.len();
        let mut any = false;
        for id in ids {
            any = true;
            self.pending.insert(id);
        }
        if !any {
            return Transition::Ignored;
        }

        let deadline = now + self.quiet_period;
        let transition = match self.state {
            SchedulerState::Idle => Transition::Armed,
            SchedulerState::Armed { .. } => Transition::Extended,
        };
        self.state = SchedulerState::Armed { deadline };

        crate::debug_event!(
            "debounce",
            if transition == Transition::Armed { "armed" } else { "extended" },
            "{} pending (+{})",
            self.pending.len(),
            self.pending.len() - before
        );
        transition
    }

    /// Take the pending set once the deadline has passed.
    ///
    /// The scheduler is Idle and empty before the set is handed out, so a
    /// failing flush cannot leave it stuck, and notifications made while the
    /// caller drains the returned set start a fresh set.
    pub fn poll(&mut self, now: Instant) -> Option<PendingSet> {
        match self.state {
            SchedulerState::Armed { deadline } if now >= deadline => {
                self.state = SchedulerState::Idle;
                let ready = std::mem::take(&mut self.pending);
                crate::debug_event!("debounce", "flush", "{} profiles", ready.len());
                Some(ready)
            }
            _ => None,
        }
    }

    /// Drop a profile from the pending set. Disarms when the set drains.
    pub fn remove(&mut self, id: &ProfileId) -> bool {
        let removed = self.pending.shift_remove(id);
        if removed && self.pending.is_empty() {
            self.state = SchedulerState::Idle;
            crate::debug_event!("debounce", "drained");
        }
        removed
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, SchedulerState::Armed { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SchedulerState::Armed { deadline } => Some(deadline),
            SchedulerState::Idle => None,
        }
    }

    pub fn pending(&self) -> &PendingSet {
        &self.pending
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }
}
