//! Liveness watchdog for the serial link
//!
//! A resettable countdown. The owner awaits [`Watchdog::expired`] alongside its
//! other work and kicks the watchdog after every device exchange, so a ping is
//! only sent when the link has otherwise been idle for a full interval.

use std::future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, Instant, Sleep};

/// Interval between liveness pings on an idle link
pub const DEFAULT_WATCHDOG_INTERVAL: Duration = Duration::from_secs(30);

/// Resettable countdown that fires once per expiry
#[derive(Debug)]
pub struct Watchdog {
    interval: Duration,
    deadline: Pin<Box<Sleep>>,
    armed: bool,
}

impl Watchdog {
    /// Create an armed watchdog that expires `interval` from now
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: Box::pin(sleep(interval)),
            armed: true,
        }
    }

    /// Configured interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check if the watchdog will fire at its deadline
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Cancel any pending expiry and restart the countdown
    pub fn kick(&mut self) {
        self.deadline.as_mut().reset(Instant::now() + self.interval);
        self.armed = true;
    }

    /// Disable firing until the next kick
    pub fn stop(&mut self) {
        self.armed = false;
    }

    /// Wait for the deadline
    ///
    /// Resolves once per expiry; afterwards the watchdog stays disarmed until
    /// kicked. Cancel safe, so it can be used as a `tokio::select!` branch.
    pub async fn expired(&mut self) {
        if !self.armed {
            future::pending::<()>().await;
        }
        self.deadline.as_mut().await;
        self.armed = false;
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(DEFAULT_WATCHDOG_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    const T: Duration = Duration::from_secs(30);

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_when_not_kicked() {
        let mut wd = Watchdog::new(T);
        let start = Instant::now();

        timeout(T + Duration::from_millis(1), wd.expired())
            .await
            .expect("watchdog should fire within its interval");
        assert!(start.elapsed() >= T);
        assert!(!wd.is_armed());

        // No second expiry without a kick
        assert!(timeout(T * 10, wd.expired()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_fires_while_kicked() {
        let mut wd = Watchdog::new(T);
        for _ in 0..100 {
            assert!(timeout(T / 2, wd.expired()).await.is_err());
            wd.kick();
        }
        assert!(wd.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_kick_rearms_after_firing() {
        let mut wd = Watchdog::new(T);
        wd.expired().await;
        wd.kick();

        let start = Instant::now();
        wd.expired().await;
        assert_eq!(start.elapsed(), T);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_disables_firing() {
        let mut wd = Watchdog::new(T);
        wd.stop();
        assert!(timeout(T * 3, wd.expired()).await.is_err());
    }

    #[tokio::test]
    async fn test_default_interval() {
        assert_eq!(Watchdog::default().interval(), DEFAULT_WATCHDOG_INTERVAL);
    }
}
