//! Users, groups and the indexed snapshot they are served from.
//!
//! A snapshot is built once from the lists returned by a single directory
//! fetch and never modified afterwards. Refreshing the account cache means
//! building a new [`AccountSnapshot`] off to the side and swapping it in
//! (see [`cache::AccountCache`]).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod cache;

pub use cache::AccountCache;

/// A POSIX account as published by the remote directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub uid: u32,
    /// Primary group id.
    pub gid: u32,
    /// Comment / display-name field.
    #[serde(default)]
    pub gecos: String,
    pub home_directory: String,
    pub shell: String,
}

/// A POSIX group as published by the remote directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub gid: u32,
    /// Member user names, in directory order.
    #[serde(default)]
    pub members: Vec<String>,
}

/// One complete, internally consistent view of the directory's accounts.
///
/// The lists keep the order the directory returned them in. The indexes
/// point into shared `Arc`s so that lookups hand out cheap clones of the
/// same record. When the source data repeats a name or id, the later record
/// wins in the index while both stay in the lists.
#[derive(Debug, Default)]
pub struct AccountSnapshot {
    users: Vec<Arc<User>>,
    groups: Vec<Arc<Group>>,
    users_by_name: HashMap<String, Arc<User>>,
    users_by_uid: HashMap<u32, Arc<User>>,
    groups_by_name: HashMap<String, Arc<Group>>,
    groups_by_gid: HashMap<u32, Arc<Group>>,
    names: HashSet<String>,
    fetched_at_millis: Option<u64>,
}

impl AccountSnapshot {
    /// An empty snapshot, used before the first successful fetch.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot and all of its indexes from one directory fetch.
    pub fn build(users: Vec<User>, groups: Vec<Group>, fetched_at_millis: u64) -> Self {
        let users: Vec<Arc<User>> = users.into_iter().map(Arc::new).collect();
        let groups: Vec<Arc<Group>> = groups.into_iter().map(Arc::new).collect();

        let mut users_by_name = HashMap::with_capacity(users.len());
        let mut users_by_uid = HashMap::with_capacity(users.len());
        let mut groups_by_name = HashMap::with_capacity(groups.len());
        let mut groups_by_gid = HashMap::with_capacity(groups.len());
        let mut names = HashSet::with_capacity(users.len() + groups.len());

        for user in &users {
            users_by_name.insert(user.name.clone(), user.clone());
            users_by_uid.insert(user.uid, user.clone());
            names.insert(user.name.clone());
        }
        for group in &groups {
            groups_by_name.insert(group.name.clone(), group.clone());
            groups_by_gid.insert(group.gid, group.clone());
            names.insert(group.name.clone());
        }

        Self {
            users,
            groups,
            users_by_name,
            users_by_uid,
            groups_by_name,
            groups_by_gid,
            names,
            fetched_at_millis: Some(fetched_at_millis),
        }
    }

    pub fn user_by_name(&self, name: &str) -> Option<&User> {
        self.users_by_name.get(name).map(|u| u.as_ref())
    }

    pub fn user_by_uid(&self, uid: u32) -> Option<&User> {
        self.users_by_uid.get(&uid).map(|u| u.as_ref())
    }

    pub fn group_by_name(&self, name: &str) -> Option<&Group> {
        self.groups_by_name.get(name).map(|g| g.as_ref())
    }

    pub fn group_by_gid(&self, gid: u32) -> Option<&Group> {
        self.groups_by_gid.get(&gid).map(|g| g.as_ref())
    }

    /// True if `name` is a user name or a group name.
    pub fn is_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// True if `name` is a user name. Group-only names do not count.
    pub fn is_user(&self, name: &str) -> bool {
        self.users_by_name.contains_key(name)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.iter().map(|u| u.as_ref())
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter().map(|g| g.as_ref())
    }

    /// Every distinct user and group name, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Distinct user names, in no particular order.
    pub fn user_names(&self) -> impl Iterator<Item = &str> {
        self.users_by_name.keys().map(String::as_str)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Clock time of the fetch this snapshot came from, `None` if empty.
    pub fn fetched_at_millis(&self) -> Option<u64> {
        self.fetched_at_millis
    }
}
