//! Per-user authorized key records.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Authorized keys by user name.
///
/// A user with a record is a hit even when the record is an empty list;
/// a user without a record is a miss. Records are replaced whole.
#[derive(Debug, Default)]
pub struct KeyCache {
    records: RwLock<HashMap<String, Arc<[String]>>>,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached keys for `name`, or `None` if nothing has been fetched.
    pub fn keys(&self, name: &str) -> Option<Vec<String>> {
        self.records
            .read()
            .unwrap()
            .get(name)
            .map(|keys| keys.to_vec())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.read().unwrap().contains_key(name)
    }

    /// Number of users with a record.
    pub(crate) fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub(crate) fn store(&self, name: &str, keys: Vec<String>) {
        let keys: Arc<[String]> = keys.into();
        self.records.write().unwrap().insert(name.to_string(), keys);
    }

    /// Drop records for every name `keep` rejects. Returns how many went.
    pub(crate) fn retain(&self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let mut records = self.records.write().unwrap();
        let before = records.len();
        records.retain(|name, _| keep(name));
        before - records.len()
    }
}
