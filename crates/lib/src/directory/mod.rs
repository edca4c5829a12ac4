//! Remote directory abstraction.
//!
//! This module defines the trait the refresh engine uses to pull account and
//! key data from the remote directory, allowing the store to work against
//! any backend (the bundled HTTP client, or an in-process fake in tests).

use async_trait::async_trait;

use crate::{
    Result,
    accounts::{Group, User},
};

pub mod errors;
pub mod http;

pub use errors::DirectoryError;
pub use http::HttpDirectoryClient;

/// Source of truth for users, groups and authorized keys.
///
/// Implementations must be callable concurrently; the store issues account
/// and key fetches from several tasks at once.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Fetch every user and group in one call.
    ///
    /// The two lists must come from the same point in time; the store
    /// indexes them together as one snapshot.
    async fn fetch_accounts(&self) -> Result<(Vec<User>, Vec<Group>)>;

    /// Fetch the authorized keys of one user.
    ///
    /// A user the directory does not know yields an empty list, not an error.
    async fn fetch_authorized_keys(&self, username: &str) -> Result<Vec<String>>;
}
