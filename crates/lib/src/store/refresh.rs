//! Single-flight refresh gate.
//!
//! Each refreshable resource (the account snapshot, or one user's keys) has a
//! [`RefreshGate`]. The gate's mutex is held for the whole remote fetch, so
//! holding it *is* the in-flight state. Callers that arrive while a fetch is
//! running queue on the mutex; when they get it they notice a refresh
//! completed since their miss and return without fetching again. The
//! last-attempt time sits in an atomic so status reads never block.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;

use crate::clock::{Clock, duration_millis};

/// What happened to a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// This caller ran the fetch; `succeeded` tells whether it worked.
    Ran { succeeded: bool },
    /// Another caller's fetch finished while this one waited.
    Coalesced,
    /// The previous attempt is too recent; nothing was fetched.
    CoolingDown,
}

#[derive(Debug, Default)]
pub(crate) struct RefreshGate {
    /// Held for the whole fetch.
    in_flight: Mutex<()>,
    /// Bumped after every finished attempt.
    completed: AtomicU64,
    /// Clock time of the last finished attempt plus one, 0 if none.
    last_attempt: AtomicU64,
}

impl RefreshGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of attempts finished so far.
    ///
    /// Read this before checking the cache and pass it to
    /// [`RefreshGate::on_demand`], so a refresh that finishes between the
    /// miss and the call is recognised.
    pub(crate) fn generation(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    /// Run `refresh` for a lookup miss observed at generation `seen`, unless
    /// a refresh finished since then or the cooldown since the last attempt
    /// has not elapsed.
    ///
    /// `refresh` resolves to whether the fetch succeeded.
    pub(crate) async fn on_demand<F, Fut>(
        &self,
        clock: &dyn Clock,
        cooldown: Duration,
        seen: u64,
        refresh: F,
    ) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        let _in_flight = self.in_flight.lock().await;
        if self.generation() != seen {
            return RefreshOutcome::Coalesced;
        }

        let now = clock.now_millis();
        if let Some(last) = self.last_attempt_millis()
            && now.saturating_sub(last) < duration_millis(cooldown)
        {
            return RefreshOutcome::CoolingDown;
        }

        let succeeded = refresh().await;
        self.finish(clock);
        RefreshOutcome::Ran { succeeded }
    }

    /// Run `refresh` regardless of cooldown, still one at a time.
    pub(crate) async fn unconditional<F, Fut>(&self, clock: &dyn Clock, refresh: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        let _in_flight = self.in_flight.lock().await;
        let succeeded = refresh().await;
        self.finish(clock);
        succeeded
    }

    /// Like [`RefreshGate::unconditional`], but once the gate is held, skip
    /// the fetch if `filled` reports the cache already has what it would
    /// bring. A skip records no attempt. Returns `None` when skipped.
    pub(crate) async fn fill<P, F, Fut>(
        &self,
        clock: &dyn Clock,
        filled: P,
        refresh: F,
    ) -> Option<bool>
    where
        P: FnOnce() -> bool,
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        let _in_flight = self.in_flight.lock().await;
        if filled() {
            return None;
        }
        let succeeded = refresh().await;
        self.finish(clock);
        Some(succeeded)
    }

    /// Time of the last finished attempt, if any. Never waits on a fetch in
    /// flight.
    pub(crate) fn last_attempt_millis(&self) -> Option<u64> {
        match self.last_attempt.load(Ordering::Acquire) {
            0 => None,
            stored => Some(stored - 1),
        }
    }

    /// Record a finished attempt. Callers hold `in_flight`.
    fn finish(&self, clock: &dyn Clock) {
        let stored = clock.now_millis().saturating_add(1);
        self.last_attempt.store(stored, Ordering::Release);
        self.completed.fetch_add(1, Ordering::Release);
    }
}

/// One [`RefreshGate`] per user name, created on first use.
#[derive(Debug, Default)]
pub(crate) struct KeyGates {
    gates: std::sync::Mutex<HashMap<String, Arc<RefreshGate>>>,
}

impl KeyGates {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn gate(&self, name: &str) -> Arc<RefreshGate> {
        self.gates
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    pub(crate) fn retain(&self, mut keep: impl FnMut(&str) -> bool) {
        self.gates.lock().unwrap().retain(|name, _| keep(name));
    }

    /// Most recent finished attempt across all users.
    pub(crate) fn last_attempt_millis(&self) -> Option<u64> {
        self.gates
            .lock()
            .unwrap()
            .values()
            .filter_map(|gate| gate.last_attempt_millis())
            .max()
    }
}
