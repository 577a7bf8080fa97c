//! Explicit periodic hook for the debounce scheduler.
//!
//! The ticker only produces ticks while started. A stopped ticker's
//! [`Ticker::tick`] never completes, so an idle engine has no wakeups.

use tokio::time::{Duration, Instant, Interval, MissedTickBehavior, interval_at};

/// Start/stop periodic tick source.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    interval: Option<Interval>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// Start ticking. The first tick arrives one period from now. No-op
    /// when already running.
    pub fn start(&mut self) {
        if self.interval.is_some() {
            return;
        }
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(ticker);
        crate::debug_event!("ticker", "started", "{:?}", self.period);
    }

    pub fn stop(&mut self) {
        if self.interval.take().is_some() {
            crate::debug_event!("ticker", "stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for the next tick. Pends forever while stopped.
    pub async fn tick(&mut self) -> Instant {
        match self.interval.as_mut() {
            Some(interval) => interval.tick().await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_stopped_ticker_never_fires() {
        let mut ticker = Ticker::new(Duration::from_millis(10));
        assert!(!ticker.is_running());

        let fired = tokio::time::timeout(Duration::from_secs(5), ticker.tick()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_started_ticker_fires_each_period() {
        let mut ticker = Ticker::new(Duration::from_millis(10));
        let start = Instant::now();
        ticker.start();
        ticker.start();

        let first = ticker.tick().await;
        let second = ticker.tick().await;
        assert_eq!(first - start, Duration::from_millis(10));
        assert_eq!(second - first, Duration::from_millis(10));

        ticker.stop();
        assert!(!ticker.is_running());
    }
}
