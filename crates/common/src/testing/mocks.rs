//! Mock implementations of the session core's traits
//!
//! Provides mock objects for testing purposes.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::auth::{
    ClientStorage, Navigator, RelayClientError, RelayClientTrait, Route, StorageError,
    TokenResponse,
};

type StorageData = Arc<Mutex<HashMap<String, String>>>;

/// Mock storage for testing
///
/// Counts writes and can be told to fail them.
///
/// # Examples
///
/// ```
/// use spoticizr_common::auth::ClientStorage;
/// use spoticizr_common::testing::mocks::MockStorage;
///
/// let storage = MockStorage::new();
/// storage.set("key1", "value1".to_string()).unwrap();
///
/// assert_eq!(storage.value("key1"), Some("value1".to_string()));
/// assert_eq!(storage.write_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockStorage {
    data: StorageData,
    writes: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl MockStorage {
    /// Create a new mock storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by key
    #[must_use]
    pub fn value(&self, key: &str) -> Option<String> {
        // SAFETY: Mutex poisoning is acceptable in test mocks
        self.data.lock().unwrap().get(key).cloned()
    }

    /// Get all keys
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        // SAFETY: Mutex poisoning is acceptable in test mocks
        self.data.lock().unwrap().keys().cloned().collect()
    }

    /// Check if storage is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        // SAFETY: Mutex poisoning is acceptable in test mocks
        self.data.lock().unwrap().is_empty()
    }

    /// Number of successful `set_many` / `remove_many` calls
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail with an I/O error
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io("mock storage is read-only".to_string()));
        }
        Ok(())
    }
}

impl ClientStorage for MockStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.value(key))
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        self.check_writable()?;
        // SAFETY: Mutex poisoning is acceptable in test mocks
        let mut data = self.data.lock().unwrap();
        for (key, value) in entries {
            data.insert((*key).to_string(), value.clone());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.check_writable()?;
        // SAFETY: Mutex poisoning is acceptable in test mocks
        let mut data = self.data.lock().unwrap();
        for key in keys {
            data.remove(*key);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Navigator that records every requested route
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    routes: Arc<Mutex<Vec<Route>>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// All routes in request order
    #[must_use]
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }

    /// Most recent route
    #[must_use]
    pub fn last(&self) -> Option<Route> {
        self.routes.lock().unwrap().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

type Scripted = Result<TokenResponse, (u16, String)>;

/// Mock relay client that simulates the token relay without network calls
///
/// Exchange and refresh succeed with fixed tokens unless scripted otherwise.
/// Every call is recorded with the tokio instant it was made at.
#[derive(Debug, Clone)]
pub struct MockRelayClient {
    exchange_response: Arc<Mutex<Scripted>>,
    refresh_response: Arc<Mutex<Scripted>>,
    refresh_delay: Arc<Mutex<Duration>>,
    exchanges: Arc<Mutex<Vec<(String, String)>>>,
    refreshes: Arc<Mutex<Vec<(String, tokio::time::Instant)>>>,
}

impl MockRelayClient {
    /// Create a new mock relay client with default responses
    pub fn new() -> Self {
        Self {
            exchange_response: Arc::new(Mutex::new(Ok(Self::token_response(
                "mock_access_token",
                Some("mock_refresh_token"),
            )))),
            refresh_response: Arc::new(Mutex::new(Ok(Self::token_response(
                "refreshed_access_token",
                None,
            )))),
            refresh_delay: Arc::new(Mutex::new(Duration::ZERO)),
            exchanges: Arc::new(Mutex::new(Vec::new())),
            refreshes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A one-hour bearer token response
    #[must_use]
    pub fn token_response(access_token: &str, refresh_token: Option<&str>) -> TokenResponse {
        TokenResponse {
            access_token: access_token.to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            refresh_token: refresh_token.map(str::to_string),
            scope: Some("user-read-private user-read-email".to_string()),
        }
    }

    /// Configure the response returned by `exchange_code`.
    pub fn set_exchange_response(&self, response: TokenResponse) {
        *self.exchange_response.lock().unwrap() = Ok(response);
    }

    /// Force `exchange_code` to fail with a relay rejection.
    pub fn fail_exchange(&self, status: u16, message: &str) {
        *self.exchange_response.lock().unwrap() = Err((status, message.to_string()));
    }

    /// Configure the response returned by `refresh`.
    pub fn set_refresh_response(&self, response: TokenResponse) {
        *self.refresh_response.lock().unwrap() = Ok(response);
    }

    /// Force `refresh` to fail with a relay rejection.
    pub fn fail_refresh(&self, status: u16, message: &str) {
        *self.refresh_response.lock().unwrap() = Err((status, message.to_string()));
    }

    /// Make `refresh` take `delay` (tokio time) before answering.
    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = delay;
    }

    #[must_use]
    pub fn exchange_calls(&self) -> usize {
        self.exchanges.lock().unwrap().len()
    }

    /// Most recent `(code, code_verifier)` pair
    #[must_use]
    pub fn last_exchange(&self) -> Option<(String, String)> {
        self.exchanges.lock().unwrap().last().cloned()
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.refreshes.lock().unwrap().len()
    }

    #[must_use]
    pub fn last_refresh_token(&self) -> Option<String> {
        self.refreshes.lock().unwrap().last().map(|(token, _)| token.clone())
    }

    /// tokio instants at which `refresh` was entered
    #[must_use]
    pub fn refresh_times(&self) -> Vec<tokio::time::Instant> {
        self.refreshes.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }

    fn answer(scripted: &Mutex<Scripted>) -> Result<TokenResponse, RelayClientError> {
        scripted
            .lock()
            .unwrap()
            .clone()
            .map_err(|(status, message)| RelayClientError::Rejected { status, message })
    }
}

impl Default for MockRelayClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelayClientTrait for MockRelayClient {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, RelayClientError> {
        self.exchanges.lock().unwrap().push((code.to_string(), code_verifier.to_string()));
        Self::answer(&self.exchange_response)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, RelayClientError> {
        self.refreshes
            .lock()
            .unwrap()
            .push((refresh_token.to_string(), tokio::time::Instant::now()));

        let delay = *self.refresh_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        Self::answer(&self.refresh_response)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for testing::mocks.
    use super::*;

    /// Validates `MockStorage` behavior for the write failure scenario.
    ///
    /// Assertions:
    /// - Ensures failed writes leave the data untouched and are not counted.
    #[test]
    fn test_mock_storage_fail_writes() {
        let storage = MockStorage::new();
        storage.set("a", "1".to_string()).unwrap();
        storage.fail_writes(true);

        assert!(storage.set("a", "2".to_string()).is_err());
        assert!(storage.remove_many(&["a"]).is_err());
        assert_eq!(storage.value("a").as_deref(), Some("1"));
        assert_eq!(storage.write_count(), 1);
    }

    /// Validates `MockRelayClient` behavior for the scripted failure scenario.
    ///
    /// Assertions:
    /// - Confirms a scripted refresh failure surfaces as `Rejected`.
    /// - Confirms the call was recorded.
    #[tokio::test]
    async fn test_mock_relay_scripted_failure() {
        let relay = MockRelayClient::new();
        relay.fail_refresh(400, "invalid_grant");

        let result = relay.refresh("RT1").await;

        assert!(matches!(result, Err(RelayClientError::Rejected { status: 400, .. })));
        assert_eq!(relay.refresh_calls(), 1);
        assert_eq!(relay.last_refresh_token().as_deref(), Some("RT1"));
    }
}
