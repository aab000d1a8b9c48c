//! Session teardown (logout)

use std::sync::Arc;

use spoticizr_domain::constants::AUTH_STORAGE_KEYS;
use tracing::{info, warn};

use super::storage::StorageError;
use super::traits::{ClientStorage, Navigator, Route};

/// Clears persisted auth state and returns the user to the login surface
///
/// Performs no network call. Running it again on an already-cleared store
/// is harmless.
pub struct SessionTeardown<S: ClientStorage + 'static> {
    storage: Arc<S>,
    navigator: Arc<dyn Navigator>,
}

impl<S: ClientStorage + 'static> SessionTeardown<S> {
    #[must_use]
    pub fn new(storage: Arc<S>, navigator: Arc<dyn Navigator>) -> Self {
        Self { storage, navigator }
    }

    /// Remove every auth key in one storage write
    ///
    /// # Errors
    /// Returns error if the backing store cannot be written.
    pub fn clear(&self) -> Result<(), StorageError> {
        let cleared = self.storage.remove_many(&AUTH_STORAGE_KEYS);
        match &cleared {
            Ok(()) => info!("session torn down"),
            Err(e) => warn!(error = %e, "failed to clear persisted auth state"),
        }
        cleared
    }

    /// Send the user back to the login surface
    pub fn redirect(&self) {
        self.navigator.navigate(Route::Login);
    }
}
