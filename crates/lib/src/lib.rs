//!
//! accountd: a local cache of a remote account directory.
//! This library provides the caching and refresh engine behind an NSS/PAM style
//! lookup service: users, groups and SSH authorized keys served from memory,
//! kept fresh from a remote directory, and resilient to that directory failing.
//!
//! ## Core Concepts
//!
//! * **Directory (`directory::DirectoryClient`)**: The remote source of truth. One call returns all users and groups; another returns one user's keys.
//! * **Snapshot (`accounts::AccountSnapshot`)**: Every user and group from one successful fetch, indexed by name and id. Replaced whole, never patched.
//! * **Key cache (`keys::KeyCache`)**: Authorized keys per user name. An empty list is a cached answer; no record is a miss.
//! * **Store (`store::AccountStore`)**: Owns both caches. Populates them at startup, refreshes them on timers, and refreshes on lookup misses subject to a cooldown.
//! * **Provider (`provider::AccountProvider`)**: The read-only lookup surface handed to whatever serves OS lookups.
//! * **Clock (`clock::Clock`)**: Time source for cooldowns, timers and fetch timeouts, swappable for a manual clock in tests.

pub mod accounts;
pub mod clock;
pub mod config;
pub mod directory;
pub mod keys;
pub mod provider;
pub mod store;

pub use accounts::{AccountSnapshot, Group, User};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::StoreConfig;
pub use directory::{DirectoryClient, HttpDirectoryClient};
pub use provider::AccountProvider;
pub use store::{AccountStore, AccountStoreBuilder, StoreStatus};

/// Result type used throughout the accountd library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the accountd library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Structured lookup errors from the store module
    #[error(transparent)]
    Store(store::StoreError),

    /// Structured remote directory errors from the directory module
    #[error(transparent)]
    Directory(directory::DirectoryError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Store(_) => "store",
            Error::Directory(_) => "directory",
        }
    }

    /// Check if this error indicates a lookup key was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_not_found(),
            Error::Directory(_) => false,
        }
    }

    /// Check if this error came from talking to the remote directory.
    pub fn is_directory_error(&self) -> bool {
        matches!(self, Error::Directory(_))
    }

    /// Check if this error is a remote fetch timeout.
    pub fn is_timeout_error(&self) -> bool {
        match self {
            Error::Directory(dir_err) => dir_err.is_timeout(),
            _ => false,
        }
    }
}
