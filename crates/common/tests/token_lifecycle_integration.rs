//! Integration tests for the token lifecycle
//!
//! Renewal timing runs on tokio's paused clock; `TokioClock` keeps the
//! session's wall clock in step with it.

#![cfg(feature = "platform")]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use spoticizr_common::auth::storage::persist_tokens;
use spoticizr_common::auth::types::datetime_from_millis;
use spoticizr_common::auth::{AuthSession, AuthorizationRedirect, Route, TokenResponse, TokenSet};
use spoticizr_common::testing::{MockRelayClient, MockStorage, RecordingNavigator, TokioClock};
use spoticizr_domain::constants::{ACCESS_TOKEN_KEY, EXPIRES_AT_KEY};
use spoticizr_domain::Config;

struct Fixture {
    session: AuthSession<MockRelayClient, MockStorage>,
    relay: Arc<MockRelayClient>,
    storage: Arc<MockStorage>,
    navigator: Arc<RecordingNavigator>,
    clock: TokioClock,
}

fn anchor() -> DateTime<Utc> {
    datetime_from_millis(1_700_000_000_000).unwrap()
}

fn fixture_with(storage: MockStorage) -> Fixture {
    let relay = Arc::new(MockRelayClient::new());
    let storage = Arc::new(storage);
    let navigator = Arc::new(RecordingNavigator::new());
    let clock = TokioClock::new(anchor());
    let session = AuthSession::new(
        Config::new("client-123", "http://127.0.0.1:8888/callback"),
        relay.clone(),
        storage.clone(),
        navigator.clone(),
        Arc::new(clock),
    );
    Fixture { session, relay, storage, navigator, clock }
}

fn refreshed(access: &str, expires_in: i64) -> TokenResponse {
    TokenResponse {
        access_token: access.to_string(),
        token_type: "Bearer".to_string(),
        expires_in,
        refresh_token: None,
        scope: None,
    }
}

async fn login(f: &Fixture) {
    let request = f.session.begin_login().unwrap();
    let outcome = f.session.handle_redirect(AuthorizationRedirect::new("C1", request.state)).await;
    assert!(outcome.is_success(), "login failed: {outcome:?}");
}

/// Validates that every refresh moves the expiry strictly forward.
///
/// # Test Steps
/// 1. Log in with a one-hour token
/// 2. Refresh three times, a little later each time
/// 3. Verify `expires_at` grows each round and is persisted
#[tokio::test(start_paused = true)]
async fn test_refresh_expiry_is_monotonic() {
    let f = fixture_with(MockStorage::new());
    login(&f).await;
    let manager = f.session.token_manager();

    let mut previous = f.session.token_set().unwrap().expires_at;
    for round in 1..=3 {
        tokio::time::advance(Duration::from_secs(600)).await;
        f.relay.set_refresh_response(refreshed(&format!("AT{round}"), 3600));

        let renewed = manager.refresh().await.unwrap();

        assert!(renewed.expires_at > previous);
        assert_eq!(
            f.storage.value(EXPIRES_AT_KEY),
            Some(renewed.expires_at_millis().to_string())
        );
        previous = renewed.expires_at;
    }
    assert_eq!(f.relay.refresh_calls(), 3);
    f.session.shutdown().await;
}

/// Validates the renewal timer fires one margin before expiry.
///
/// # Test Steps
/// 1. Start the scheduler and log in with `expires_in = 3600`
/// 2. Let paused time run to just past the original expiry
/// 3. Verify exactly one refresh, fired at issuance + 3540s
#[tokio::test(start_paused = true)]
async fn test_renewal_timer_fires_at_expiry_minus_margin() {
    let f = fixture_with(MockStorage::new());
    f.session.start().await.unwrap();
    login(&f).await;
    let issued = f.session.token_set().unwrap();

    tokio::time::sleep(Duration::from_secs(3600)).await;

    let fired = f.relay.refresh_times();
    assert_eq!(fired.len(), 1);
    let expected = f.clock.instant_at(anchor() + chrono::Duration::seconds(3540));
    assert_eq!(fired[0], expected);
    assert!(fired[0] < f.clock.instant_at(issued.expires_at));
    assert_eq!(f.session.current_token().as_deref(), Some("refreshed_access_token"));

    f.session.shutdown().await;
}

/// Validates that a token inside the margin is renewed on load.
///
/// # Test Steps
/// 1. Persist a token that expires in 50s (inside the 60s margin)
/// 2. Start the session
/// 3. Verify the refresh happened during start, with no time passing
#[tokio::test(start_paused = true)]
async fn test_token_inside_margin_refreshes_on_load() {
    let storage = MockStorage::new();
    let stored = TokenSet::new("AT0".to_string(), Some("RT0".to_string()), 50, None, anchor());
    persist_tokens(&storage, &stored).unwrap();
    let f = fixture_with(storage);
    f.relay.set_refresh_response(refreshed("AT1", 3600));

    let started_at = tokio::time::Instant::now();
    assert!(f.session.start().await.unwrap());

    assert_eq!(f.relay.refresh_times(), vec![started_at]);
    assert_eq!(f.relay.last_refresh_token().as_deref(), Some("RT0"));
    assert_eq!(f.session.current_token().as_deref(), Some("AT1"));
    assert_eq!(f.storage.value(ACCESS_TOKEN_KEY).as_deref(), Some("AT1"));
    f.session.shutdown().await;
}

/// Validates the scheduler keeps renewing across several lifetimes.
#[tokio::test(start_paused = true)]
async fn test_scheduler_renews_repeatedly() {
    let f = fixture_with(MockStorage::new());
    f.session.start().await.unwrap();
    login(&f).await;

    tokio::time::sleep(Duration::from_secs(3 * 3540 + 30)).await;

    let fired = f.relay.refresh_times();
    assert_eq!(fired.len(), 3);
    for (i, at) in fired.iter().enumerate() {
        let secs = 3540 * (i as i64 + 1);
        assert_eq!(*at, f.clock.instant_at(anchor() + chrono::Duration::seconds(secs)));
    }
    f.session.shutdown().await;
}

/// Validates that a scheduled refresh failure ends the session.
#[tokio::test(start_paused = true)]
async fn test_scheduled_refresh_failure_logs_out() {
    let f = fixture_with(MockStorage::new());
    f.session.start().await.unwrap();
    login(&f).await;
    f.relay.fail_refresh(400, "invalid_grant");

    tokio::time::sleep(Duration::from_secs(3600)).await;

    assert_eq!(f.relay.refresh_calls(), 1);
    assert!(f.session.current_token().is_none());
    assert!(f.storage.is_empty());
    assert_eq!(f.navigator.last(), Some(Route::Login));
    assert!(f.session.token_manager().armed_deadline().is_none());
    f.session.shutdown().await;
}

/// Validates that logout cancels the pending renewal.
#[tokio::test(start_paused = true)]
async fn test_logout_cancels_renewal() {
    let f = fixture_with(MockStorage::new());
    f.session.start().await.unwrap();
    login(&f).await;

    tokio::time::sleep(Duration::from_secs(60)).await;
    f.session.logout().unwrap();
    tokio::time::sleep(Duration::from_secs(2 * 3600)).await;

    assert_eq!(f.relay.refresh_calls(), 0);
    f.session.shutdown().await;
}

/// Validates that a lifetime shorter than the margin still spaces renewals.
///
/// # Test Steps
/// 1. Log in with `expires_in = 30` (below the 60s margin)
/// 2. Have every refresh return another 30s token
/// 3. Verify renewals fire every 15s instead of back to back
#[tokio::test(start_paused = true)]
async fn test_short_lived_tokens_renew_at_halfway_point() {
    let f = fixture_with(MockStorage::new());
    let mut issued = MockRelayClient::token_response("AT0", Some("RT1"));
    issued.expires_in = 30;
    f.relay.set_exchange_response(issued);
    f.relay.set_refresh_response(refreshed("AT-next", 30));
    f.session.start().await.unwrap();
    login(&f).await;

    tokio::time::sleep(Duration::from_secs(50)).await;

    let fired = f.relay.refresh_times();
    assert_eq!(fired.len(), 3);
    for (i, at) in fired.iter().enumerate() {
        let secs = 15 * (i as i64 + 1);
        assert_eq!(*at, f.clock.instant_at(anchor() + chrono::Duration::seconds(secs)));
    }
    assert_eq!(f.relay.last_refresh_token().as_deref(), Some("RT1"));
    assert_eq!(f.session.current_token().as_deref(), Some("AT-next"));
    f.session.shutdown().await;
}
