//! The read-only lookup contract served to OS account lookups.

use async_trait::async_trait;

use crate::{
    Result,
    accounts::{Group, User},
};

/// Account and key lookups.
///
/// By-name and by-id lookups may block on a remote refresh when the record
/// is not cached; they fail with a not-found [`StoreError`](crate::store::StoreError)
/// naming the lookup key if the record is still missing afterwards.
/// Listings and [`is_name`](AccountProvider::is_name) only read what is
/// cached and never refresh.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    async fn user_by_name(&self, name: &str) -> Result<User>;

    async fn user_by_uid(&self, uid: u32) -> Result<User>;

    async fn group_by_name(&self, name: &str) -> Result<Group>;

    async fn group_by_gid(&self, gid: u32) -> Result<Group>;

    /// Authorized keys of a user. Fails without any key fetch when `name`
    /// is not a known user.
    async fn authorized_keys(&self, name: &str) -> Result<Vec<String>>;

    /// All cached users, in directory order.
    fn users(&self) -> Vec<User>;

    /// All cached groups, in directory order.
    fn groups(&self) -> Vec<Group>;

    /// Every distinct user and group name. Unordered; sort if you need to.
    fn names(&self) -> Vec<String>;

    /// True if `name` is a cached user or group name.
    fn is_name(&self, name: &str) -> bool;
}
