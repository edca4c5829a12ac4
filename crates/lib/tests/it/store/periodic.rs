use std::time::Duration;

use accountd::{
    AccountProvider,
    store::{RefreshKind, RefreshResult, RefreshTrigger},
};

use crate::helpers::*;

#[tokio::test]
async fn test_periodic_account_refresh() {
    let config = quiet_config().with_account_refresh_frequency(Duration::from_secs(60));
    let mut h = start_store(MockDirectory::standard(), config).await;

    let mut users = expected_users();
    users.push(user("user3", 4003, 4000, "Jim Doe", "/bin/sh"));
    h.mock.set_accounts(users.clone(), expected_groups());
    h.mock.set_keys("user3", vec!["ssh-rsa AAAA user3@host".to_string()]);

    // Nothing happens before the first tick
    h.clock.advance(Duration::from_secs(59));
    settle().await;
    h.mock.assert_calls(1, 2);

    h.clock.advance(Duration::from_secs(1));
    let event = h.wait_for(RefreshKind::Accounts, RefreshTrigger::Periodic).await;
    assert_eq!(event.result, RefreshResult::Accounts { users: 3, groups: 2 });
    assert_eq!(h.store.users(), users);

    // Only the newcomer's keys are warmed
    let event = h.wait_for(RefreshKind::Keys, RefreshTrigger::WarmUp).await;
    assert_eq!(event.result, RefreshResult::Keys { attempted: 1, failed: 0 });
    h.mock.assert_calls(2, 3);
    assert_eq!(
        h.store.authorized_keys("user3").await.unwrap(),
        vec!["ssh-rsa AAAA user3@host"]
    );
    h.mock.assert_calls(2, 3);
}

#[tokio::test]
async fn test_periodic_refresh_ignores_cooldown() {
    let config = quiet_config()
        .with_account_refresh_frequency(Duration::from_secs(1))
        .with_account_refresh_cooldown(Duration::from_secs(3600));
    let mut h = start_store(MockDirectory::standard(), config).await;

    for expected_fetches in 2..5 {
        h.clock.advance(Duration::from_secs(1));
        h.wait_for(RefreshKind::Accounts, RefreshTrigger::Periodic).await;
        assert_eq!(h.mock.account_fetches(), expected_fetches);
    }
}

#[tokio::test]
async fn test_periodic_refresh_failure_keeps_accounts() {
    let config = quiet_config().with_account_refresh_frequency(Duration::from_secs(60));
    let mut h = start_store(MockDirectory::standard(), config).await;
    h.mock.fail_accounts(true);

    h.clock.advance(Duration::from_secs(60));
    let event = h.wait_for(RefreshKind::Accounts, RefreshTrigger::Periodic).await;
    assert!(matches!(event.result, RefreshResult::Failed { .. }));

    assert_eq!(h.store.users(), expected_users());
    assert_eq!(h.store.groups(), expected_groups());
    assert_eq!(
        h.store.status().accounts_fetched_at.as_deref(),
        Some("2024-01-01T00:00:00+00:00")
    );

    // The loop keeps going after a failure
    h.mock.fail_accounts(false);
    h.clock.advance(Duration::from_secs(60));
    let event = h.wait_for(RefreshKind::Accounts, RefreshTrigger::Periodic).await;
    assert!(event.succeeded());
    h.mock.assert_calls(3, 2);
}

#[tokio::test]
async fn test_missed_ticks_are_skipped() {
    let config = quiet_config().with_account_refresh_frequency(Duration::from_secs(60));
    let mut h = start_store(MockDirectory::standard(), config).await;

    // Ten periods pass at once; only one refresh runs for them
    h.clock.advance(Duration::from_secs(600));
    h.wait_for(RefreshKind::Accounts, RefreshTrigger::Periodic).await;
    settle().await;
    assert_eq!(h.mock.account_fetches(), 2);

    h.clock.advance(Duration::from_secs(60));
    h.wait_for(RefreshKind::Accounts, RefreshTrigger::Periodic).await;
    settle().await;
    assert_eq!(h.mock.account_fetches(), 3);
}

#[tokio::test]
async fn test_zero_frequency_disables_periodic_refresh() {
    let config = quiet_config()
        .with_account_refresh_frequency(Duration::ZERO)
        .with_key_refresh_frequency(Duration::ZERO);
    let h = start_store(MockDirectory::standard(), config).await;

    h.clock.advance(Duration::from_secs(10 * 3600));
    settle().await;
    h.mock.assert_calls(1, 2);
}

#[tokio::test]
async fn test_shutdown_stops_periodic_refresh() {
    let config = quiet_config()
        .with_account_refresh_frequency(Duration::from_secs(60))
        .with_key_refresh_frequency(Duration::from_secs(60));
    let h = start_store(MockDirectory::standard(), config).await;

    h.store.shutdown();
    h.clock.advance(Duration::from_secs(600));
    settle().await;
    h.mock.assert_calls(1, 2);

    // Lookups still work after shutdown
    assert_eq!(h.store.user_by_uid(4001).await.unwrap(), expected_users()[0]);
}
