//! Lookup error types for the account store.

use thiserror::Error;

/// Errors returned by account and key lookups.
///
/// A lookup only fails after its on-demand refresh (if one was allowed) has
/// run, so these also cover "absent because the refresh failed".
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// No user with this name.
    #[error("unable to find user with name {name:?}")]
    UserNotFound { name: String },

    /// No user with this UID.
    #[error("unable to find user with UID {uid}")]
    UidNotFound { uid: u32 },

    /// No group with this name.
    #[error("unable to find group with name {name:?}")]
    GroupNotFound { name: String },

    /// No group with this GID.
    #[error("unable to find group with GID {gid}")]
    GidNotFound { gid: u32 },

    /// The user exists but no key record could be obtained.
    #[error("unable to find authorized keys for user {name:?}")]
    KeysNotFound { name: String },

    /// A refresh hook reported a failure. Never returned by lookups.
    #[error("refresh hook failed: {reason}")]
    HookFailed { reason: String },
}

impl StoreError {
    /// Check if this error indicates a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::UserNotFound { .. }
                | StoreError::UidNotFound { .. }
                | StoreError::GroupNotFound { .. }
                | StoreError::GidNotFound { .. }
                | StoreError::KeysNotFound { .. }
        )
    }

    /// Check if the missing record was a user or key lookup.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            StoreError::UserNotFound { .. }
                | StoreError::UidNotFound { .. }
                | StoreError::KeysNotFound { .. }
        )
    }

    /// Check if the missing record was a group lookup.
    pub fn is_group_error(&self) -> bool {
        matches!(
            self,
            StoreError::GroupNotFound { .. } | StoreError::GidNotFound { .. }
        )
    }
}

impl From<StoreError> for crate::Error {
    fn from(err: StoreError) -> Self {
        crate::Error::Store(err)
    }
}
