//! Refresh cadence configuration for the account store.

use std::time::Duration;

/// Default interval between unconditional account refreshes.
pub const DEFAULT_ACCOUNT_REFRESH_FREQUENCY: Duration = Duration::from_secs(60);
/// Default minimum gap between on-demand account refreshes.
pub const DEFAULT_ACCOUNT_REFRESH_COOLDOWN: Duration = Duration::from_secs(1);
/// Default interval between unconditional key refreshes.
pub const DEFAULT_KEY_REFRESH_FREQUENCY: Duration = Duration::from_secs(30 * 60);
/// Default minimum gap between on-demand key refreshes for one user.
pub const DEFAULT_KEY_REFRESH_COOLDOWN: Duration = Duration::from_millis(500);
/// Default upper bound on a single remote fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Timing knobs for [`AccountStore`](crate::store::AccountStore).
///
/// Frequencies drive the background loops. Cooldowns bound how often a
/// lookup miss may hit the remote directory; they apply to failed attempts
/// as well as successful ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    pub account_refresh_frequency: Duration,
    pub account_refresh_cooldown: Duration,
    pub key_refresh_frequency: Duration,
    pub key_refresh_cooldown: Duration,
    /// Remote fetches still pending after this long count as failed.
    pub fetch_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            account_refresh_frequency: DEFAULT_ACCOUNT_REFRESH_FREQUENCY,
            account_refresh_cooldown: DEFAULT_ACCOUNT_REFRESH_COOLDOWN,
            key_refresh_frequency: DEFAULT_KEY_REFRESH_FREQUENCY,
            key_refresh_cooldown: DEFAULT_KEY_REFRESH_COOLDOWN,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl StoreConfig {
    pub fn with_account_refresh_frequency(mut self, frequency: Duration) -> Self {
        self.account_refresh_frequency = frequency;
        self
    }

    pub fn with_account_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.account_refresh_cooldown = cooldown;
        self
    }

    pub fn with_key_refresh_frequency(mut self, frequency: Duration) -> Self {
        self.key_refresh_frequency = frequency;
        self
    }

    pub fn with_key_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.key_refresh_cooldown = cooldown;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}
