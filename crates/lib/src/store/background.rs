//! Periodic refresh loops.
//!
//! Each refresh class gets one long-lived task that wakes on the store clock
//! every period and refreshes unconditionally. Ticks are scheduled from the
//! store's start time, so the first one fires one full period after startup.
//! A tick that overruns its period skips the ticks it missed instead of
//! firing them back to back.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span};

use super::{RefreshKind, StoreInner};
use crate::clock::duration_millis;

/// Spawn the periodic loops. A zero frequency disables that loop.
pub(super) fn spawn(inner: &Arc<StoreInner>, started_at: u64) -> Vec<JoinHandle<()>> {
    let config = inner.config;
    [
        (RefreshKind::Accounts, config.account_refresh_frequency),
        (RefreshKind::Keys, config.key_refresh_frequency),
    ]
    .into_iter()
    .filter_map(|(kind, period)| {
        if period.is_zero() {
            info!(?kind, "Periodic refresh disabled");
            return None;
        }
        Some(tokio::spawn(run(inner.clone(), kind, period, started_at)))
    })
    .collect()
}

async fn run(inner: Arc<StoreInner>, kind: RefreshKind, period: Duration, started_at: u64) {
    async move {
        info!("Starting periodic refresh every {period:?}");
        let period_ms = duration_millis(period);
        let mut next_tick = started_at.saturating_add(period_ms);

        loop {
            inner.clock.sleep_until(next_tick).await;
            match kind {
                RefreshKind::Accounts => inner.refresh_accounts_periodic().await,
                RefreshKind::Keys => inner.refresh_keys_periodic().await,
            }

            let now = inner.clock.now_millis();
            next_tick = next_tick.saturating_add(period_ms);
            if next_tick <= now {
                debug!("Refresh overran its period, skipping missed ticks");
                next_tick = now.saturating_add(period_ms);
            }
        }
    }
    .instrument(info_span!("periodic_refresh", ?kind))
    .await
}
