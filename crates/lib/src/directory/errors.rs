//! Error types for remote directory access.

use thiserror::Error;

/// Errors that can occur while talking to the remote directory.
///
/// Any of these makes a refresh attempt fail. The store logs them and keeps
/// serving whatever it already had cached.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The configured base URL could not be used.
    #[error("Invalid directory URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The request never produced a response.
    #[error("Request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    /// The directory answered with a non-success status.
    #[error("Directory returned HTTP {status} for {url}")]
    UnexpectedStatus { url: String, status: u16 },

    /// The response body did not have the expected shape.
    #[error("Failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// The fetch did not finish within the configured timeout.
    #[error("Fetching {what} timed out after {timeout_ms} ms")]
    Timeout { what: String, timeout_ms: u64 },

    /// Any other failure reported by a directory implementation.
    #[error("Directory error: {0}")]
    Other(String),
}

impl DirectoryError {
    /// Check if this error is a fetch timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DirectoryError::Timeout { .. })
    }

    /// Check if this error came from the network layer.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            DirectoryError::RequestFailed { .. } | DirectoryError::UnexpectedStatus { .. }
        )
    }
}

impl From<DirectoryError> for crate::Error {
    fn from(err: DirectoryError) -> Self {
        crate::Error::Directory(err)
    }
}
