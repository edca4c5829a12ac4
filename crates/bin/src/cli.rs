//! CLI argument definitions for the accountd binary.

use std::time::Duration;

use accountd::StoreConfig;
use clap::{Parser, Subcommand};

/// Local cache of a remote user, group and SSH key directory
#[derive(Parser, Debug)]
#[command(name = "accountd")]
#[command(about = "accountd: serve directory users, groups and SSH keys from a local cache")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the caching daemon and its lookup API
    Serve(ServeArgs),
    /// Check health of a running accountd daemon
    Health(HealthArgs),
}

/// Arguments for the serve command
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Base URL of the remote directory API
    #[arg(short = 'd', long, env = "ACCOUNTD_DIRECTORY_URL")]
    pub directory_url: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 3080, env = "ACCOUNTD_PORT")]
    pub port: u16,

    /// Bind address. Lookups are unauthenticated, so keep this on loopback.
    #[arg(long, default_value = "127.0.0.1", env = "ACCOUNTD_HOST")]
    pub host: String,

    /// Seconds between periodic account refreshes (0 disables)
    #[arg(long, default_value_t = 60, env = "ACCOUNTD_ACCOUNT_REFRESH_SECS")]
    pub account_refresh_secs: u64,

    /// Minimum milliseconds between on-demand account refreshes
    #[arg(long, default_value_t = 1000, env = "ACCOUNTD_ACCOUNT_COOLDOWN_MS")]
    pub account_cooldown_ms: u64,

    /// Seconds between periodic key refreshes (0 disables)
    #[arg(long, default_value_t = 1800, env = "ACCOUNTD_KEY_REFRESH_SECS")]
    pub key_refresh_secs: u64,

    /// Minimum milliseconds between on-demand key refreshes of one user
    #[arg(long, default_value_t = 500, env = "ACCOUNTD_KEY_COOLDOWN_MS")]
    pub key_cooldown_ms: u64,

    /// Seconds before a directory request is abandoned (0 waits forever)
    #[arg(long, default_value_t = 20, env = "ACCOUNTD_FETCH_TIMEOUT_SECS")]
    pub fetch_timeout_secs: u64,
}

impl ServeArgs {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default()
            .with_account_refresh_frequency(Duration::from_secs(self.account_refresh_secs))
            .with_account_refresh_cooldown(Duration::from_millis(self.account_cooldown_ms))
            .with_key_refresh_frequency(Duration::from_secs(self.key_refresh_secs))
            .with_key_refresh_cooldown(Duration::from_millis(self.key_cooldown_ms))
            .with_fetch_timeout(Duration::from_secs(self.fetch_timeout_secs))
    }
}

/// Arguments for the health command
#[derive(clap::Args, Debug)]
pub struct HealthArgs {
    /// Port of the daemon to check
    #[arg(short, long, default_value_t = 3080, env = "ACCOUNTD_PORT")]
    pub port: u16,

    /// Host of the daemon to check
    #[arg(long, default_value = "127.0.0.1", env = "ACCOUNTD_HOST")]
    pub host: String,

    /// Timeout in seconds
    #[arg(short, long, default_value_t = 5)]
    pub timeout: u64,
}
