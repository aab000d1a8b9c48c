//! Application context - dependency injection container

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use spoticizr_common::auth::{AuthSession, Navigator, RelayClient, Route};
use spoticizr_common::time::{Clock, SystemClock};
use spoticizr_domain::{Config, Result, SpoticizrError};
use spoticizr_infra::errors::map_auth_session_error;
use spoticizr_infra::{FileStorage, InfraError};
use tracing::{debug, info};

/// Session type used by the CLI: relay over HTTP, state in a JSON file
pub type Session = AuthSession<RelayClient, FileStorage>;

/// Navigator for a terminal host
///
/// External routes (the provider's authorize page) are written to the
/// configured sink for the user to open; in-app routes are only recorded.
pub struct TerminalNavigator {
    sink: Mutex<Box<dyn Write + Send>>,
    history: Mutex<Vec<Route>>,
}

impl TerminalNavigator {
    /// Navigator that prints external URLs to stderr
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_sink(Box::new(std::io::stderr()))
    }

    #[must_use]
    pub fn with_sink(sink: Box<dyn Write + Send>) -> Self {
        Self { sink: Mutex::new(sink), history: Mutex::new(Vec::new()) }
    }

    /// Most recent route requested by the session
    #[must_use]
    pub fn last(&self) -> Option<Route> {
        self.history.lock().last().cloned()
    }
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, route: Route) {
        debug!(route = route.as_str(), "Navigating");
        if let Route::External(url) = &route {
            let mut sink = self.sink.lock();
            let written = writeln!(sink, "Open this URL in your browser to sign in:\n\n  {url}\n")
                .and_then(|()| sink.flush());
            if let Err(err) = written {
                tracing::warn!(error = %err, "Failed to print authorization URL");
            }
        }
        self.history.lock().push(route);
    }
}

/// Application context - holds the configuration and the auth session
pub struct AppContext {
    pub config: Config,
    pub storage: Arc<FileStorage>,
    pub navigator: Arc<TerminalNavigator>,
    pub session: Arc<Session>,
}

impl AppContext {
    /// Wire the session from `config` with a stderr navigator and the system
    /// clock
    ///
    /// # Errors
    /// Returns error if the configuration is incomplete, the state file is
    /// unreadable, or the relay URL is invalid.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_parts(config, Arc::new(TerminalNavigator::stderr()), Arc::new(SystemClock))
    }

    /// Wire the session with an explicit navigator and clock
    ///
    /// # Errors
    /// Same as [`AppContext::new`].
    pub fn with_parts(
        config: Config,
        navigator: Arc<TerminalNavigator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let storage = Arc::new(
            FileStorage::open(&config.client.state_path)
                .map_err(|e| SpoticizrError::from(InfraError::from(e)))?,
        );
        let relay = RelayClient::new(&config.client.relay_url, config.client.http_timeout())
            .map_err(|e| SpoticizrError::from(InfraError::from(e)))?;

        let session = Arc::new(AuthSession::new(
            config.clone(),
            Arc::new(relay),
            storage.clone(),
            navigator.clone(),
            clock,
        ));

        info!(
            state_path = %storage.path().display(),
            relay_url = %config.client.relay_url,
            "Application context initialized"
        );
        Ok(Self { config, storage, navigator, session })
    }

    /// Restore the persisted session and start renewal
    ///
    /// # Errors
    /// Returns error if persisted state cannot be read.
    pub async fn start(&self) -> Result<bool> {
        self.session.start().await.map_err(map_auth_session_error)
    }

    /// Stop background renewal
    pub async fn shutdown(&self) {
        self.session.shutdown().await;
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("state_path", &self.storage.path())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
