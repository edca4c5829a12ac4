//! Shared holder for the current [`AccountSnapshot`].

use std::sync::{Arc, RwLock};

use super::AccountSnapshot;

/// The account cache: one snapshot behind a read/write lock.
///
/// Readers clone the `Arc` under the read lock and then work on the
/// snapshot without holding any lock. Writers only ever swap the pointer,
/// so a reader sees either the old snapshot or the new one in full.
#[derive(Debug)]
pub struct AccountCache {
    current: RwLock<Arc<AccountSnapshot>>,
}

impl Default for AccountCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountCache {
    /// Create a cache holding an empty snapshot.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(AccountSnapshot::empty())),
        }
    }

    /// The snapshot readers should use right now.
    pub fn snapshot(&self) -> Arc<AccountSnapshot> {
        self.current.read().unwrap().clone()
    }

    /// Replace the snapshot wholesale.
    pub(crate) fn replace(&self, snapshot: AccountSnapshot) {
        let snapshot = Arc::new(snapshot);
        *self.current.write().unwrap() = snapshot;
    }
}
