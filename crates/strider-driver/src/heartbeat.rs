//! Feedback Monitor - tracks when the robot last answered
//!
//! The robot never acknowledges commands, so the only liveness signal is
//! incoming telemetry (`SONIC` / `POWER` replies to our polls).
//!
//! Timestamps are monotonic microseconds anchored to the first use of this
//! module, so they fit in an `AtomicU64` and ignore wall-clock changes.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Global anchor point for monotonic time
static APP_START: OnceLock<Instant> = OnceLock::new();

/// Sentinel for "no feedback received yet"
const NEVER: u64 = u64::MAX;

/// Monotonic time as microseconds since app start
fn get_monotonic_micros() -> u64 {
    let start = APP_START.get_or_init(Instant::now);
    start.elapsed().as_micros() as u64
}

/// Feedback freshness monitor
///
/// Written by the RX thread for every recognised telemetry frame, read from
/// any thread.
#[derive(Debug)]
pub struct FeedbackMonitor {
    last_feedback: AtomicU64,
    timeout: Duration,
}

impl FeedbackMonitor {
    /// Create a monitor that has not seen any feedback yet
    ///
    /// # Example
    /// ```
    /// # use strider_driver::FeedbackMonitor;
    /// # use std::time::Duration;
    /// let monitor = FeedbackMonitor::new(Duration::from_secs(1));
    /// assert!(!monitor.is_fresh());
    /// ```
    pub fn new(timeout: Duration) -> Self {
        // Anchor APP_START now so the first feedback never reads as 0
        let _ = get_monotonic_micros();
        Self {
            last_feedback: AtomicU64::new(NEVER),
            timeout,
        }
    }

    /// Register that a telemetry frame was just processed
    pub fn register_feedback(&self) {
        let now = get_monotonic_micros();
        self.last_feedback.store(now, Ordering::Relaxed);
    }

    /// Time since the last feedback, `None` if nothing has arrived
    pub fn time_since_last_feedback(&self) -> Option<Duration> {
        let last_us = self.last_feedback.load(Ordering::Relaxed);
        if last_us == NEVER {
            return None;
        }
        let now_us = get_monotonic_micros();
        Some(Duration::from_micros(now_us.saturating_sub(last_us)))
    }

    /// Whether feedback arrived within the timeout window
    pub fn is_fresh(&self) -> bool {
        self.time_since_last_feedback().is_some_and(|elapsed| elapsed < self.timeout)
    }

    /// Freshness window
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_monotonic_time_always_increases() {
        let t1 = get_monotonic_micros();
        thread::sleep(Duration::from_millis(5));
        let t2 = get_monotonic_micros();
        assert!(t2 > t1, "Monotonic time should always increase");
    }

    #[test]
    fn test_monitor_starts_without_feedback() {
        let monitor = FeedbackMonitor::new(Duration::from_secs(1));
        assert_eq!(monitor.time_since_last_feedback(), None);
        assert!(!monitor.is_fresh());
    }

    #[test]
    fn test_monitor_fresh_after_feedback() {
        let monitor = FeedbackMonitor::new(Duration::from_secs(5));
        monitor.register_feedback();
        assert!(monitor.is_fresh());
        assert!(monitor.time_since_last_feedback().unwrap() < Duration::from_secs(5));
    }

    #[test]
    fn test_monitor_goes_stale() {
        let monitor = FeedbackMonitor::new(Duration::from_millis(20));
        monitor.register_feedback();
        thread::sleep(Duration::from_millis(50));
        assert!(!monitor.is_fresh());
        assert!(monitor.time_since_last_feedback().unwrap() >= Duration::from_millis(20));
    }
}
