//! Time provider abstraction
//!
//! This module provides a [`Clock`] trait that abstracts over time sources,
//! allowing the refresh engine to use real system time while tests drive
//! cooldowns, periodic ticks and fetch timeouts with controllable mock time.
//!
//! # Example
//!
//! ```
//! use accountd::{Clock, SystemClock};
//!
//! let clock = SystemClock;
//! let millis = clock.now_millis();
//! let rfc3339 = clock.now_rfc3339();
//! ```

use std::fmt::Debug;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::watch;

/// A time provider for getting current timestamps and waiting on deadlines.
///
/// All deadlines are expressed in the clock's own milliseconds, so that a
/// deadline computed before an `await` stays meaningful after it.
#[async_trait]
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time as milliseconds since Unix epoch.
    fn now_millis(&self) -> u64;

    /// Completes once the clock reads at least `deadline_millis`.
    async fn sleep_until(&self, deadline_millis: u64);

    /// Completes once `duration` has elapsed on this clock.
    async fn sleep(&self, duration: Duration) {
        let deadline = self.now_millis().saturating_add(duration_millis(duration));
        self.sleep_until(deadline).await
    }

    /// Returns the current time as an RFC3339-formatted string.
    fn now_rfc3339(&self) -> String {
        millis_to_rfc3339(self.now_millis())
    }
}

/// Convert a duration to whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Format milliseconds since Unix epoch as RFC3339.
pub fn millis_to_rfc3339(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "1970-01-01T00:00:00+00:00".to_string())
}

/// Production clock using real system time.
///
/// Timestamps come from [`std::time::SystemTime`]; waiting is delegated to
/// [`tokio::time::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    async fn sleep_until(&self, deadline_millis: u64) {
        let remaining = deadline_millis.saturating_sub(self.now_millis());
        if remaining > 0 {
            tokio::time::sleep(Duration::from_millis(remaining)).await;
        }
    }
}

/// Manually driven clock.
///
/// Time only moves when [`FixedClock::advance`] or [`FixedClock::set`] is
/// called. Every pending [`Clock::sleep_until`] whose deadline has been
/// reached wakes up on that call, which lets tests step periodic refresh
/// loops one tick at a time.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use accountd::{Clock, FixedClock};
///
/// let clock = FixedClock::new(1000);
/// assert_eq!(clock.now_millis(), 1000);
/// clock.advance(Duration::from_millis(500));
/// assert_eq!(clock.now_millis(), 1500);
/// ```
pub struct FixedClock {
    millis: watch::Sender<u64>,
}

impl FixedClock {
    /// Create a new fixed clock with the given initial time in milliseconds.
    pub fn new(millis: u64) -> Self {
        let (millis, _) = watch::channel(millis);
        Self { millis }
    }

    /// Advance the clock, waking every sleeper whose deadline has passed.
    pub fn advance(&self, by: Duration) {
        let by = duration_millis(by);
        self.millis.send_modify(|m| *m = m.saturating_add(by));
    }

    /// Set the clock to a specific time in milliseconds.
    pub fn set(&self, ms: u64) {
        self.millis.send_replace(ms);
    }

    /// Get the current time.
    pub fn get(&self) -> u64 {
        *self.millis.borrow()
    }
}

#[async_trait]
impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.get()
    }

    async fn sleep_until(&self, deadline_millis: u64) {
        let mut rx = self.millis.subscribe();
        // The sender lives as long as `self`, so this only ends on the deadline.
        let _ = rx.wait_for(|now| *now >= deadline_millis).await;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        // 2024-01-01 00:00:00 UTC
        Self::new(1704067200000)
    }
}

impl Debug for FixedClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedClock")
            .field("millis", &self.get())
            .finish()
    }
}
