//! Refresh hooks for observing completed refresh cycles.
//!
//! Hooks are called after every account or key refresh cycle finishes,
//! whichever trigger started it. They are mainly a synchronization point
//! for tests that need to wait on background work.

use std::sync::Arc;

use tracing::warn;

use crate::Result;

/// Which cache a refresh cycle updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    Accounts,
    Keys,
}

/// What started a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// Initial population while the store is being built.
    Startup,
    /// A background timer tick.
    Periodic,
    /// A lookup miss.
    OnDemand,
    /// Key fetches for users that showed up in a new account snapshot.
    WarmUp,
}

/// Result of one refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshResult {
    /// Accounts fetched and swapped in.
    Accounts { users: usize, groups: usize },
    /// Key fetches attempted for `attempted` users, `failed` of which failed.
    Keys { attempted: usize, failed: usize },
    /// The fetch failed; cached data was left as is.
    Failed { reason: String },
}

/// Context passed to hooks when a refresh cycle completes.
#[derive(Debug, Clone)]
pub struct RefreshEvent {
    pub kind: RefreshKind,
    pub trigger: RefreshTrigger,
    pub result: RefreshResult,
}

impl RefreshEvent {
    pub fn succeeded(&self) -> bool {
        !matches!(self.result, RefreshResult::Failed { .. })
    }
}

/// Trait for code that wants to know when a refresh cycle has completed.
pub trait RefreshHook: Send + Sync {
    /// Called after the cycle's cache updates are visible to readers.
    ///
    /// Runs on whichever task performed the refresh; keep it short.
    ///
    /// An error is logged and otherwise ignored: the refresh has already
    /// happened and later hooks still run.
    fn on_refresh(&self, event: &RefreshEvent) -> Result<()>;
}

impl<F> RefreshHook for F
where
    F: Fn(&RefreshEvent) -> Result<()> + Send + Sync,
{
    fn on_refresh(&self, event: &RefreshEvent) -> Result<()> {
        self(event)
    }
}

/// A collection of refresh hooks executed together, in registration order.
#[derive(Default, Clone)]
pub struct RefreshHookCollection {
    hooks: Vec<Arc<dyn RefreshHook>>,
}

impl RefreshHookCollection {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn add_hook(&mut self, hook: Arc<dyn RefreshHook>) {
        self.hooks.push(hook);
    }

    /// Run every hook for `event`. Failures are logged, never propagated.
    pub fn execute_hooks(&self, event: &RefreshEvent) {
        for hook in &self.hooks {
            if let Err(e) = hook.on_refresh(event) {
                warn!(kind = ?event.kind, trigger = ?event.trigger, "Refresh hook failed: {e}");
            }
        }
    }
}

impl std::fmt::Debug for RefreshHookCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshHookCollection")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
