//! The account store: caches plus the refresh coordinator that owns them.
//!
//! [`AccountStore`] keeps one [`AccountSnapshot`] and a [`KeyCache`] filled
//! from a [`DirectoryClient`], and serves them through [`AccountProvider`].
//!
//! Data reaches the caches in three ways:
//!
//! - **Startup**: [`AccountStoreBuilder::start`] fetches accounts and then
//!   the keys of every user before returning.
//! - **Periodic**: two background tasks refresh accounts and keys at the
//!   configured frequencies (see `background`).
//! - **On demand**: a lookup miss refreshes the missing resource and retries
//!   once, subject to a cooldown.
//!
//! A failed refresh never removes cached data. Only one refresh per resource
//! runs at a time; concurrent misses wait for it instead of fetching again.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, trace, warn};

use crate::{
    Result,
    accounts::{AccountCache, AccountSnapshot, Group, User},
    clock::{Clock, SystemClock, duration_millis, millis_to_rfc3339},
    config::StoreConfig,
    directory::{DirectoryClient, DirectoryError},
    keys::KeyCache,
    provider::AccountProvider,
};

mod background;
pub mod errors;
pub mod hooks;
pub mod refresh;

pub use errors::StoreError;
pub use hooks::{
    RefreshEvent, RefreshHook, RefreshHookCollection, RefreshKind, RefreshResult, RefreshTrigger,
};
pub use refresh::RefreshOutcome;

use refresh::{KeyGates, RefreshGate};

/// Upper bound on key fetches in flight during a bulk key refresh.
const KEY_FETCH_CONCURRENCY: usize = 8;

/// Builder for [`AccountStore`].
pub struct AccountStoreBuilder {
    client: Arc<dyn DirectoryClient>,
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    hooks: RefreshHookCollection,
}

impl AccountStoreBuilder {
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `clock` for cooldowns, timers and fetch timeouts.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register a hook called after every refresh cycle.
    pub fn hook(mut self, hook: Arc<dyn RefreshHook>) -> Self {
        self.hooks.add_hook(hook);
        self
    }

    /// Populate the caches and start the background refresh tasks.
    ///
    /// Returns once the first account fetch and the key prewarm for every
    /// user it produced have finished. A failed initial fetch is logged and
    /// leaves the store empty; lookups will retry on demand.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(self) -> AccountStore {
        let inner = Arc::new(StoreInner {
            client: self.client,
            clock: self.clock,
            config: self.config,
            accounts: AccountCache::new(),
            keys: KeyCache::new(),
            account_gate: RefreshGate::new(),
            key_gates: KeyGates::new(),
            hooks: self.hooks,
        });
        let started_at = inner.clock.now_millis();

        info!("Populating account cache");
        let loaded = inner
            .account_gate
            .unconditional(inner.clock.as_ref(), || {
                inner.load_accounts(RefreshTrigger::Startup)
            })
            .await;
        if loaded {
            let users: Vec<String> = inner
                .accounts
                .snapshot()
                .user_names()
                .map(str::to_string)
                .collect();
            if !users.is_empty() {
                info!("Prewarming authorized keys for {} users", users.len());
                inner.refresh_keys(users, RefreshTrigger::Startup).await;
            }
        }

        let tasks = background::spawn(&inner, started_at);
        AccountStore { inner, tasks }
    }
}

/// Cached view of a remote account directory.
///
/// Dropping the store stops its background refresh tasks.
pub struct AccountStore {
    inner: Arc<StoreInner>,
    tasks: Vec<JoinHandle<()>>,
}

impl AccountStore {
    /// Start building a store that reads from `client`.
    pub fn builder(client: Arc<dyn DirectoryClient>) -> AccountStoreBuilder {
        AccountStoreBuilder {
            client,
            config: StoreConfig::default(),
            clock: Arc::new(SystemClock),
            hooks: RefreshHookCollection::new(),
        }
    }

    /// Build a store with `config` and the system clock.
    pub async fn start(client: Arc<dyn DirectoryClient>, config: StoreConfig) -> Self {
        Self::builder(client).config(config).start().await
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// The current account snapshot.
    pub fn snapshot(&self) -> Arc<AccountSnapshot> {
        self.inner.accounts.snapshot()
    }

    /// Cached keys for `name`, without any refresh.
    pub fn cached_keys(&self, name: &str) -> Option<Vec<String>> {
        self.inner.keys.keys(name)
    }

    /// Counts and timestamps describing the cache contents.
    pub fn status(&self) -> StoreStatus {
        let snapshot = self.inner.accounts.snapshot();
        StoreStatus {
            ready: snapshot.fetched_at_millis().is_some(),
            users: snapshot.user_count(),
            groups: snapshot.group_count(),
            key_records: self.inner.keys.len(),
            accounts_fetched_at: snapshot.fetched_at_millis().map(millis_to_rfc3339),
            last_account_attempt: self
                .inner
                .account_gate
                .last_attempt_millis()
                .map(millis_to_rfc3339),
            last_key_attempt: self
                .inner
                .key_gates
                .last_attempt_millis()
                .map(millis_to_rfc3339),
        }
    }

    /// Stop the background refresh tasks. Lookups keep working on demand.
    pub fn shutdown(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Drop for AccountStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for AccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountStore")
            .field("config", &self.inner.config)
            .field("status", &self.status())
            .finish()
    }
}

/// Snapshot of store health, as reported by [`AccountStore::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    /// True once any account fetch has succeeded.
    pub ready: bool,
    pub users: usize,
    pub groups: usize,
    pub key_records: usize,
    pub accounts_fetched_at: Option<String>,
    pub last_account_attempt: Option<String>,
    pub last_key_attempt: Option<String>,
}

#[async_trait::async_trait]
impl AccountProvider for AccountStore {
    async fn user_by_name(&self, name: &str) -> Result<User> {
        self.inner
            .lookup(|s| s.user_by_name(name).cloned())
            .await
            .ok_or_else(|| {
                StoreError::UserNotFound {
                    name: name.to_string(),
                }
                .into()
            })
    }

    async fn user_by_uid(&self, uid: u32) -> Result<User> {
        self.inner
            .lookup(|s| s.user_by_uid(uid).cloned())
            .await
            .ok_or_else(|| StoreError::UidNotFound { uid }.into())
    }

    async fn group_by_name(&self, name: &str) -> Result<Group> {
        self.inner
            .lookup(|s| s.group_by_name(name).cloned())
            .await
            .ok_or_else(|| {
                StoreError::GroupNotFound {
                    name: name.to_string(),
                }
                .into()
            })
    }

    async fn group_by_gid(&self, gid: u32) -> Result<Group> {
        self.inner
            .lookup(|s| s.group_by_gid(gid).cloned())
            .await
            .ok_or_else(|| StoreError::GidNotFound { gid }.into())
    }

    async fn authorized_keys(&self, name: &str) -> Result<Vec<String>> {
        // Only users get keys; anything else never reaches the key path.
        self.user_by_name(name).await?;
        self.inner.authorized_keys(name).await
    }

    fn users(&self) -> Vec<User> {
        self.inner.accounts.snapshot().users().cloned().collect()
    }

    fn groups(&self) -> Vec<Group> {
        self.inner.accounts.snapshot().groups().cloned().collect()
    }

    fn names(&self) -> Vec<String> {
        self.inner
            .accounts
            .snapshot()
            .names()
            .map(str::to_string)
            .collect()
    }

    fn is_name(&self, name: &str) -> bool {
        self.inner.accounts.snapshot().is_name(name)
    }
}

/// State shared between the store handle and its background tasks.
pub(crate) struct StoreInner {
    client: Arc<dyn DirectoryClient>,
    clock: Arc<dyn Clock>,
    config: StoreConfig,
    accounts: AccountCache,
    keys: KeyCache,
    account_gate: RefreshGate,
    key_gates: KeyGates,
    hooks: RefreshHookCollection,
}

impl StoreInner {
    /// Look something up in the snapshot, refreshing once on a miss.
    async fn lookup<T>(self: &Arc<Self>, find: impl Fn(&AccountSnapshot) -> Option<T>) -> Option<T> {
        let seen = self.account_gate.generation();
        if let Some(found) = find(self.accounts.snapshot().as_ref()) {
            trace!("Account cache hit");
            return Some(found);
        }
        self.refresh_accounts_on_demand(seen).await;
        find(self.accounts.snapshot().as_ref())
    }

    /// Keys for a user already known to exist.
    async fn authorized_keys(self: &Arc<Self>, name: &str) -> Result<Vec<String>> {
        let gate = self.key_gates.gate(name);
        let seen = gate.generation();
        if let Some(keys) = self.keys.keys(name) {
            trace!("Key cache hit for {name}");
            return Ok(keys);
        }

        let outcome = gate
            .on_demand(
                self.clock.as_ref(),
                self.config.key_refresh_cooldown,
                seen,
                || async move {
                    let succeeded = self.load_keys(name).await;
                    self.hooks.execute_hooks(&RefreshEvent {
                        kind: RefreshKind::Keys,
                        trigger: RefreshTrigger::OnDemand,
                        result: RefreshResult::Keys {
                            attempted: 1,
                            failed: usize::from(!succeeded),
                        },
                    });
                    succeeded
                },
            )
            .await;
        match outcome {
            RefreshOutcome::CoolingDown => debug!("Key refresh for {name} suppressed by cooldown"),
            RefreshOutcome::Coalesced => debug!("Key refresh for {name} coalesced"),
            RefreshOutcome::Ran { .. } => {}
        }

        self.keys.keys(name).ok_or_else(|| {
            StoreError::KeysNotFound {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Refresh accounts for a miss observed at account generation `seen`.
    async fn refresh_accounts_on_demand(self: &Arc<Self>, seen: u64) {
        let outcome = self
            .account_gate
            .on_demand(
                self.clock.as_ref(),
                self.config.account_refresh_cooldown,
                seen,
                || self.load_accounts(RefreshTrigger::OnDemand),
            )
            .await;
        match outcome {
            RefreshOutcome::Ran { succeeded: true } => self.spawn_key_warm_up(),
            RefreshOutcome::Ran { succeeded: false } => {}
            RefreshOutcome::CoolingDown => debug!("Account refresh suppressed by cooldown"),
            RefreshOutcome::Coalesced => debug!("Account refresh coalesced"),
        }
    }

    pub(crate) async fn refresh_accounts_periodic(self: &Arc<Self>) {
        let loaded = self
            .account_gate
            .unconditional(self.clock.as_ref(), || {
                self.load_accounts(RefreshTrigger::Periodic)
            })
            .await;
        if loaded {
            self.spawn_key_warm_up();
        }
    }

    /// Refresh the keys of every current user, then forget departed users.
    pub(crate) async fn refresh_keys_periodic(self: &Arc<Self>) {
        let snapshot = self.accounts.snapshot();
        let users: Vec<String> = snapshot.user_names().map(str::to_string).collect();
        self.refresh_keys(users, RefreshTrigger::Periodic).await;

        let snapshot = self.accounts.snapshot();
        let pruned = self.keys.retain(|name| snapshot.is_user(name));
        self.key_gates.retain(|name| snapshot.is_user(name));
        if pruned > 0 {
            info!("Dropped authorized keys of {pruned} departed users");
        }
    }

    /// Fetch keys in the background for users that have no key record yet.
    fn spawn_key_warm_up(self: &Arc<Self>) {
        let missing: Vec<String> = self
            .accounts
            .snapshot()
            .user_names()
            .filter(|name| !self.keys.contains(name))
            .map(str::to_string)
            .collect();
        if missing.is_empty() {
            return;
        }

        debug!("Warming authorized keys for {} new users", missing.len());
        let inner = self.clone();
        tokio::spawn(async move {
            inner.refresh_keys(missing, RefreshTrigger::WarmUp).await;
        });
    }

    /// Refresh the keys of `users`, a few at a time.
    ///
    /// Startup and periodic refreshes always fetch. A warm-up skips users
    /// whose keys arrived by another path once their gate is held.
    async fn refresh_keys(self: &Arc<Self>, users: Vec<String>, trigger: RefreshTrigger) {
        let mut attempted = 0;
        let mut failed = 0;
        let mut pending = users.into_iter();
        let mut tasks = JoinSet::new();

        loop {
            while tasks.len() < KEY_FETCH_CONCURRENCY {
                let Some(name) = pending.next() else { break };
                let inner = self.clone();
                tasks.spawn(async move {
                    let gate = inner.key_gates.gate(&name);
                    let clock = inner.clock.as_ref();
                    if trigger == RefreshTrigger::WarmUp {
                        gate.fill(
                            clock,
                            || inner.keys.contains(&name),
                            || inner.load_keys(&name),
                        )
                        .await
                    } else {
                        Some(gate.unconditional(clock, || inner.load_keys(&name)).await)
                    }
                });
            }
            match tasks.join_next().await {
                Some(Ok(None)) => {}
                Some(Ok(Some(true))) => attempted += 1,
                Some(Ok(Some(false))) => {
                    attempted += 1;
                    failed += 1;
                }
                Some(Err(e)) => {
                    warn!("Key refresh task failed: {e}");
                    attempted += 1;
                    failed += 1;
                }
                None => break,
            }
        }

        if failed == 0 {
            info!(?trigger, "Refreshed authorized keys for {attempted} users");
        } else {
            warn!(?trigger, "Refreshed authorized keys for {attempted} users, {failed} failed");
        }
        self.hooks.execute_hooks(&RefreshEvent {
            kind: RefreshKind::Keys,
            trigger,
            result: RefreshResult::Keys { attempted, failed },
        });
    }

    /// Fetch accounts and swap in the new snapshot. Returns success.
    ///
    /// Callers hold the account gate.
    async fn load_accounts(&self, trigger: RefreshTrigger) -> bool {
        let fetched = self
            .with_timeout("accounts", self.client.fetch_accounts())
            .await;
        let result = match fetched {
            Ok((users, groups)) => {
                let snapshot = AccountSnapshot::build(users, groups, self.clock.now_millis());
                let (users, groups) = (snapshot.user_count(), snapshot.group_count());
                self.accounts.replace(snapshot);
                info!(?trigger, "Refreshed accounts: {users} users, {groups} groups");
                RefreshResult::Accounts { users, groups }
            }
            Err(e) => {
                warn!(?trigger, "Account refresh failed, keeping cached accounts: {e}");
                RefreshResult::Failed {
                    reason: e.to_string(),
                }
            }
        };

        let event = RefreshEvent {
            kind: RefreshKind::Accounts,
            trigger,
            result,
        };
        self.hooks.execute_hooks(&event);
        event.succeeded()
    }

    /// Fetch and store one user's keys. Returns success.
    ///
    /// Callers hold the user's key gate.
    async fn load_keys(&self, name: &str) -> bool {
        let fetched = self
            .with_timeout(
                &format!("authorized keys for {name}"),
                self.client.fetch_authorized_keys(name),
            )
            .await;
        match fetched {
            Ok(keys) => {
                // The user may have left the directory while we fetched.
                if self.accounts.snapshot().is_user(name) {
                    debug!("Fetched {} authorized keys for {name}", keys.len());
                    self.keys.store(name, keys);
                }
                true
            }
            Err(e) => {
                warn!("Key refresh for {name} failed, keeping cached keys: {e}");
                false
            }
        }
    }

    /// Race `fetch` against the configured timeout on the store clock.
    async fn with_timeout<T>(
        &self,
        what: &str,
        fetch: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let timeout = self.config.fetch_timeout;
        if timeout.is_zero() {
            return fetch.await;
        }

        let timeout_ms = duration_millis(timeout);
        let deadline = self.clock.now_millis().saturating_add(timeout_ms);
        tokio::select! {
            result = fetch => result,
            _ = self.clock.sleep_until(deadline) => Err(DirectoryError::Timeout {
                what: what.to_string(),
                timeout_ms,
            }
            .into()),
        }
    }
}
