//! End-to-end login through the token relay
//!
//! Wires the real pieces together: an `AuthSession` backed by `FileStorage`
//! talks to the relay over HTTP through `RelayClient`, and the relay talks
//! to a wiremock stand-in for the provider token endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use spoticizr_common::auth::{
    derive_challenge, AuthSession, AuthorizationRedirect, CallbackOutcome, CallbackRejection,
    ClientStorage, RelayClient, Route,
};
use spoticizr_common::testing::{MockClock, RecordingNavigator};
use spoticizr_domain::constants::{AUTH_STORAGE_KEYS, CODE_VERIFIER_KEY, REFRESH_TOKEN_KEY};
use spoticizr_domain::Config;
use spoticizr_infra::relay::{router, RelayState, TokenEndpointClient};
use spoticizr_infra::FileStorage;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";
const NOW_MS: i64 = 1_700_000_000_000;

type Session = AuthSession<RelayClient, FileStorage>;

async fn start_relay(provider: &MockServer) -> (SocketAddr, JoinHandle<()>) {
    let endpoint = TokenEndpointClient::with_token_url(
        &format!("{}/api/token", provider.uri()),
        "client-123",
        REDIRECT_URI,
        Duration::from_secs(5),
    )
    .expect("token endpoint client");

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind relay");
    let addr = listener.local_addr().expect("relay addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, router(RelayState::new(endpoint))).await.expect("relay server");
    });
    (addr, handle)
}

fn session(
    relay: SocketAddr,
    storage_path: &std::path::Path,
    clock: Arc<MockClock>,
) -> (Session, Arc<FileStorage>) {
    std::env::set_var("SPOTICIZR_DISABLE_PROXY", "1");
    let relay_client =
        RelayClient::new(&format!("http://{relay}"), Duration::from_secs(5)).expect("relay client");
    let storage = Arc::new(FileStorage::open(storage_path).expect("open storage"));
    let session = AuthSession::new(
        Config::new("client-123", REDIRECT_URI),
        Arc::new(relay_client),
        storage.clone(),
        Arc::new(RecordingNavigator::new()),
        clock,
    );
    (session, storage)
}

async fn mount_token_endpoint(provider: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "AT1",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "RT1",
            "scope": "user-read-email"
        })))
        .mount(provider)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=RT1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "AT2",
            "token_type": "Bearer",
            "expires_in": 3600,
            "scope": "user-read-email"
        })))
        .mount(provider)
        .await;
}

#[tokio::test]
async fn login_refresh_restore_and_logout() {
    let provider = MockServer::start().await;
    mount_token_endpoint(&provider).await;
    let (relay_addr, relay) = start_relay(&provider).await;
    let dir = TempDir::new().expect("temp dir");
    let storage_path = dir.path().join("session.json");

    let clock = Arc::new(MockClock::at_millis(NOW_MS));
    let (session, storage) = session(relay_addr, &storage_path, clock.clone());
    assert!(!session.start().await.expect("start"));

    let request = session.begin_login().expect("begin login");
    let verifier = storage.get(CODE_VERIFIER_KEY).unwrap().expect("pending verifier");
    assert_eq!(derive_challenge(&verifier), request.code_challenge);

    let outcome = session.handle_redirect(AuthorizationRedirect::new("C1", &request.state)).await;
    assert!(outcome.is_success(), "login failed: {outcome:?}");
    assert_eq!(session.current_token().as_deref(), Some("AT1"));
    assert!(storage.get(CODE_VERIFIER_KEY).unwrap().is_none());

    // The provider saw the verifier whose challenge went into the authorize URL
    let exchange = provider
        .received_requests()
        .await
        .expect("recorded requests")
        .into_iter()
        .find(|r| String::from_utf8_lossy(&r.body).contains("authorization_code"))
        .expect("exchange request");
    let form: Vec<(String, String)> = url::form_urlencoded::parse(&exchange.body)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert!(form.contains(&("code_verifier".to_string(), verifier)));
    assert!(form.contains(&("code".to_string(), "C1".to_string())));

    clock.advance(Duration::from_secs(600));
    let renewed = session.token_manager().refresh().await.expect("refresh");
    assert_eq!(renewed.access_token, "AT2");
    assert_eq!(renewed.refresh_token.as_deref(), Some("RT1"));
    session.shutdown().await;
    drop(session);

    // A fresh process restores the renewed session from disk
    let (restored, _storage) = crate::session(relay_addr, &storage_path, clock);
    assert!(restored.start().await.expect("restart"));
    assert_eq!(restored.current_token().as_deref(), Some("AT2"));

    restored.logout().expect("logout");
    restored.shutdown().await;

    let reopened = FileStorage::open(&storage_path).expect("reopen storage");
    for key in AUTH_STORAGE_KEYS {
        assert!(reopened.get(key).unwrap().is_none(), "{key} survived logout");
    }
    relay.abort();
}

#[tokio::test]
async fn provider_rejection_surfaces_as_failed_exchange() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Invalid authorization code"
        })))
        .mount(&provider)
        .await;
    let (relay_addr, relay) = start_relay(&provider).await;
    let dir = TempDir::new().expect("temp dir");

    let (session, storage) =
        session(relay_addr, &dir.path().join("session.json"), Arc::new(MockClock::at_millis(NOW_MS)));
    let request = session.begin_login().expect("begin login");

    let outcome = session.handle_redirect(AuthorizationRedirect::new("C1", &request.state)).await;

    match outcome {
        CallbackOutcome::Failed(CallbackRejection::ExchangeFailed(message)) => {
            assert!(message.contains("Invalid authorization code"), "{message}");
        }
        other => panic!("expected failed exchange, got {other:?}"),
    }
    assert!(session.current_token().is_none());
    assert!(storage.get(REFRESH_TOKEN_KEY).unwrap().is_none());
    relay.abort();
}

#[tokio::test]
async fn rejected_refresh_logs_out_through_relay() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "AT1",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "RT-revoked"
        })))
        .mount(&provider)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({ "error": "invalid_grant" })),
        )
        .mount(&provider)
        .await;
    let (relay_addr, relay) = start_relay(&provider).await;
    let dir = TempDir::new().expect("temp dir");
    let navigator = Arc::new(RecordingNavigator::new());

    std::env::set_var("SPOTICIZR_DISABLE_PROXY", "1");
    let relay_client = RelayClient::new(&format!("http://{relay_addr}"), Duration::from_secs(5))
        .expect("relay client");
    let storage = Arc::new(FileStorage::open(dir.path().join("session.json")).expect("storage"));
    let session = AuthSession::new(
        Config::new("client-123", REDIRECT_URI),
        Arc::new(relay_client),
        storage.clone(),
        navigator.clone(),
        Arc::new(MockClock::at_millis(NOW_MS)),
    );

    let request = session.begin_login().expect("begin login");
    assert!(session
        .handle_redirect(AuthorizationRedirect::new("C1", &request.state))
        .await
        .is_success());

    let result = session.handle_unauthorized("AT1").await;

    assert!(result.is_err());
    assert!(session.current_token().is_none());
    assert!(storage.get(REFRESH_TOKEN_KEY).unwrap().is_none());
    assert_eq!(navigator.last(), Some(Route::Login));
    relay.abort();
}
