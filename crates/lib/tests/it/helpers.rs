//! Shared fixtures: a scriptable in-process directory and store factories.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use accountd::{
    AccountStore, DirectoryClient, FixedClock, Group, Result, StoreConfig, User,
    directory::DirectoryError,
    store::{RefreshEvent, RefreshKind, RefreshTrigger, StoreError},
};
use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

/// Real-time bound on waiting for background work, so a broken test fails
/// instead of hanging.
pub const EVENT_WAIT: Duration = Duration::from_secs(5);

pub fn user(name: &str, uid: u32, gid: u32, gecos: &str, shell: &str) -> User {
    User {
        name: name.to_string(),
        uid,
        gid,
        gecos: gecos.to_string(),
        home_directory: format!("/home/{name}"),
        shell: shell.to_string(),
    }
}

pub fn group(name: &str, gid: u32, members: &[&str]) -> Group {
    Group {
        name: name.to_string(),
        gid,
        members: members.iter().map(|m| m.to_string()).collect(),
    }
}

pub fn expected_users() -> Vec<User> {
    vec![
        user("user1", 4001, 4000, "John Doe", "/bin/bash"),
        user("user2", 4002, 4000, "Jane Doe", "/bin/zsh"),
    ]
}

pub fn expected_groups() -> Vec<Group> {
    vec![
        group("group1", 4000, &[]),
        group("group2", 4001, &["user2", "user1"]),
    ]
}

pub fn user1_keys() -> Vec<String> {
    vec!["ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIK1 user1@host".to_string()]
}

#[derive(Default)]
struct MockState {
    users: Vec<User>,
    groups: Vec<Group>,
    keys: HashMap<String, Vec<String>>,
    accounts_error: bool,
    keys_error: bool,
}

/// In-process [`DirectoryClient`] that counts calls and can fail or stall
/// on request.
pub struct MockDirectory {
    state: Mutex<MockState>,
    account_fetches: watch::Sender<usize>,
    key_fetches: watch::Sender<usize>,
    accounts_paused: watch::Sender<bool>,
    keys_paused: watch::Sender<HashSet<String>>,
}

impl MockDirectory {
    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState::default()),
            account_fetches: watch::channel(0).0,
            key_fetches: watch::channel(0).0,
            accounts_paused: watch::channel(false).0,
            keys_paused: watch::channel(HashSet::new()).0,
        })
    }

    /// Two users, two groups; only `user1` has keys.
    pub fn standard() -> Arc<Self> {
        let mock = Self::empty();
        mock.set_accounts(expected_users(), expected_groups());
        mock.set_keys("user1", user1_keys());
        mock
    }

    pub fn set_accounts(&self, users: Vec<User>, groups: Vec<Group>) {
        let mut state = self.state.lock().unwrap();
        state.users = users;
        state.groups = groups;
    }

    pub fn set_keys(&self, name: &str, keys: Vec<String>) {
        self.state
            .lock()
            .unwrap()
            .keys
            .insert(name.to_string(), keys);
    }

    pub fn fail_accounts(&self, fail: bool) {
        self.state.lock().unwrap().accounts_error = fail;
    }

    pub fn fail_keys(&self, fail: bool) {
        self.state.lock().unwrap().keys_error = fail;
    }

    /// Make account fetches hang until [`resume_accounts`](Self::resume_accounts).
    pub fn pause_accounts(&self) {
        self.accounts_paused.send_replace(true);
    }

    pub fn resume_accounts(&self) {
        self.accounts_paused.send_replace(false);
    }

    /// Make key fetches for `name` hang until resumed.
    pub fn pause_keys(&self, name: &str) {
        self.keys_paused.send_modify(|paused| {
            paused.insert(name.to_string());
        });
    }

    pub fn resume_keys(&self, name: &str) {
        self.keys_paused.send_modify(|paused| {
            paused.remove(name);
        });
    }

    /// Wait until at least `count` account fetches have been issued.
    pub async fn wait_for_account_fetches(&self, count: usize) {
        let mut fetches = self.account_fetches.subscribe();
        let wait = fetches.wait_for(|n| *n >= count);
        tokio::time::timeout(EVENT_WAIT, wait)
            .await
            .expect("account fetch was never issued")
            .expect("fetch counter dropped");
    }

    /// Wait until at least `count` key fetches have been issued.
    pub async fn wait_for_key_fetches(&self, count: usize) {
        let mut fetches = self.key_fetches.subscribe();
        let wait = fetches.wait_for(|n| *n >= count);
        tokio::time::timeout(EVENT_WAIT, wait)
            .await
            .expect("key fetch was never issued")
            .expect("fetch counter dropped");
    }

    pub fn account_fetches(&self) -> usize {
        *self.account_fetches.borrow()
    }

    pub fn key_fetches(&self) -> usize {
        *self.key_fetches.borrow()
    }

    /// Assert how many account and key fetches have been issued so far.
    #[track_caller]
    pub fn assert_calls(&self, accounts: usize, keys: usize) {
        assert_eq!(self.account_fetches(), accounts, "account fetch count");
        assert_eq!(self.key_fetches(), keys, "key fetch count");
    }
}

#[async_trait]
impl DirectoryClient for MockDirectory {
    async fn fetch_accounts(&self) -> Result<(Vec<User>, Vec<Group>)> {
        self.account_fetches.send_modify(|n| *n += 1);

        let mut paused = self.accounts_paused.subscribe();
        let _ = paused.wait_for(|paused| !*paused).await;

        let state = self.state.lock().unwrap();
        if state.accounts_error {
            return Err(DirectoryError::Other("accounts API error".to_string()).into());
        }
        Ok((state.users.clone(), state.groups.clone()))
    }

    async fn fetch_authorized_keys(&self, username: &str) -> Result<Vec<String>> {
        self.key_fetches.send_modify(|n| *n += 1);

        let mut paused = self.keys_paused.subscribe();
        let _ = paused.wait_for(|paused| !paused.contains(username)).await;

        let state = self.state.lock().unwrap();
        if state.keys_error {
            return Err(DirectoryError::Other("keys API error".to_string()).into());
        }
        // An unknown user is a remote 404: no keys, not an error.
        Ok(state.keys.get(username).cloned().unwrap_or_default())
    }
}

/// Every frequency and cooldown set to an hour, keys with no cooldown.
pub fn quiet_config() -> StoreConfig {
    StoreConfig::default()
        .with_account_refresh_frequency(Duration::from_secs(3600))
        .with_account_refresh_cooldown(Duration::from_secs(3600))
        .with_key_refresh_frequency(Duration::from_secs(3600))
        .with_key_refresh_cooldown(Duration::ZERO)
}

/// A started store on a manual clock, with every refresh event forwarded to
/// the returned receiver.
pub struct Harness {
    pub store: Arc<AccountStore>,
    pub mock: Arc<MockDirectory>,
    pub clock: Arc<FixedClock>,
    pub events: mpsc::UnboundedReceiver<RefreshEvent>,
}

pub async fn start_store(mock: Arc<MockDirectory>, config: StoreConfig) -> Harness {
    let clock = Arc::new(FixedClock::default());
    let (tx, events) = mpsc::unbounded_channel();
    let store = AccountStore::builder(mock.clone())
        .config(config)
        .clock(clock.clone())
        .hook(Arc::new(move |event: &RefreshEvent| -> Result<()> {
            tx.send(event.clone()).map_err(|e| {
                StoreError::HookFailed {
                    reason: e.to_string(),
                }
                .into()
            })
        }))
        .start()
        .await;
    Harness {
        store: Arc::new(store),
        mock,
        clock,
        events,
    }
}

impl Harness {
    /// Wait for the next refresh event of the given kind and trigger,
    /// skipping any others.
    pub async fn wait_for(&mut self, kind: RefreshKind, trigger: RefreshTrigger) -> RefreshEvent {
        let wait = async {
            loop {
                let event = self
                    .events
                    .recv()
                    .await
                    .expect("refresh hook channel closed");
                if event.kind == kind && event.trigger == trigger {
                    return event;
                }
            }
        };
        tokio::time::timeout(EVENT_WAIT, wait)
            .await
            .unwrap_or_else(|_| panic!("no {kind:?} {trigger:?} refresh within {EVENT_WAIT:?}"))
    }
}

/// Let every other ready task on the test runtime run until it blocks.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
