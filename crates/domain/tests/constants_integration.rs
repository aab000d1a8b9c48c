//! Integration tests for the shared protocol constants and configuration
//!
//! These values are shared by the login client and the relay; a drift
//! between them breaks logins at runtime, not at compile time.

use std::collections::HashSet;

use spoticizr_domain::constants::{
    ACCESS_TOKEN_KEY, AUTH_STORAGE_KEYS, CODE_VERIFIER_KEY, DEFAULT_RELAY_BIND, DEFAULT_RELAY_URL,
    DEFAULT_SCOPES, EXPIRES_AT_KEY, PKCE_STATE_KEY, REFRESH_TOKEN_KEY, RELAY_EXCHANGE_PATH,
    RELAY_REFRESH_PATH,
};
use spoticizr_domain::{Config, SpoticizrError};

/// Logout clears exactly the five auth keys, so the list must name each one
/// once.
#[test]
fn test_auth_storage_keys_are_complete_and_distinct() {
    let keys: HashSet<&str> = AUTH_STORAGE_KEYS.iter().copied().collect();

    assert_eq!(keys.len(), AUTH_STORAGE_KEYS.len());
    for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, EXPIRES_AT_KEY, PKCE_STATE_KEY, CODE_VERIFIER_KEY]
    {
        assert!(keys.contains(key), "{key} missing from AUTH_STORAGE_KEYS");
    }
}

#[test]
fn test_relay_defaults_agree() {
    assert!(DEFAULT_RELAY_URL.ends_with(DEFAULT_RELAY_BIND));
    assert!(RELAY_EXCHANGE_PATH.starts_with('/'));
    assert!(RELAY_REFRESH_PATH.starts_with('/'));
    assert_ne!(RELAY_EXCHANGE_PATH, RELAY_REFRESH_PATH);
}

#[test]
fn test_default_scopes_are_unique() {
    let scopes: HashSet<&str> = DEFAULT_SCOPES.iter().copied().collect();
    assert_eq!(scopes.len(), DEFAULT_SCOPES.len());
    assert!(scopes.contains("user-read-email"));
}

/// Scenario: a deployment overrides only the relay section
#[test]
fn test_partial_config_keeps_client_defaults() {
    let config: Config = serde_json::from_str(
        r#"{
            "client_id": "abc",
            "redirect_uri": "http://127.0.0.1:8888/callback",
            "relay": { "bind": "0.0.0.0:8080" }
        }"#,
    )
    .expect("config parses");

    assert_eq!(config.relay.bind, "0.0.0.0:8080");
    assert_eq!(config.client, Config::new("abc", "x").client);
    assert!(config.validate().is_ok());
}

#[test]
fn test_empty_scope_list_is_rejected() {
    let mut config = Config::new("abc", "http://127.0.0.1:8888/callback");
    config.client.scopes.clear();

    assert!(matches!(config.validate(), Err(SpoticizrError::Config(_))));
}
