//! OS keyring-backed session storage implementation.

use async_trait::async_trait;
use futures::stream::BoxStream;
use keyring::Entry;
use tokio::sync::Mutex;

use super::state::SessionState;
use super::{SessionSnapshot, SessionStore, StoreError};
use crate::model::SessionKey;

/// Keyring user name under which the session entry is stored.
const SESSION_ENTRY: &str = "session";

/// OS keyring-backed session store.
///
/// This store uses the platform's native keyring service:
/// - macOS: Keychain
/// - Linux: Secret Service API (via libsecret)
/// - Windows: Credential Manager
///
/// The whole session is serialized to JSON and kept in a single keyring
/// entry, so a write replaces every field at once.
pub struct KeyringSessionStore {
    service_name: String,
    state: SessionState,
    write_lock: Mutex<()>,
}

impl KeyringSessionStore {
    /// Try to open the keyring store and load any existing session.
    ///
    /// Returns an error if the keyring backend is not available on this platform.
    pub fn try_new(service_name: &str) -> Result<Self, StoreError> {
        let entry = Entry::new(service_name, SESSION_ENTRY).map_err(|e| {
            StoreError::KeyringUnavailable {
                message: format!("keyring backend not available: {}", e),
            }
        })?;

        let snapshot = match entry.get_password() {
            Ok(json) => serde_json::from_str(&json)?,
            Err(keyring::Error::NoEntry) => SessionSnapshot::new(),
            Err(keyring::Error::PlatformFailure(e)) | Err(keyring::Error::NoStorageAccess(e)) => {
                return Err(StoreError::KeyringUnavailable {
                    message: format!("platform keyring failure: {}", e),
                });
            }
            Err(e) => {
                return Err(StoreError::BackendError {
                    message: format!("keyring error: {}", e),
                });
            }
        };

        Ok(Self {
            service_name: service_name.to_string(),
            state: SessionState::new(snapshot),
            write_lock: Mutex::new(()),
        })
    }

    fn entry(&self) -> Result<Entry, StoreError> {
        Entry::new(&self.service_name, SESSION_ENTRY).map_err(|e| StoreError::BackendError {
            message: format!("failed to create keyring entry: {}", e),
        })
    }
}

impl std::fmt::Debug for KeyringSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringSessionStore")
            .field("service_name", &self.service_name)
            .finish()
    }
}

#[async_trait]
impl SessionStore for KeyringSessionStore {
    async fn snapshot(&self) -> Result<SessionSnapshot, StoreError> {
        Ok(self.state.snapshot())
    }

    async fn set_all(&self, entries: Vec<(SessionKey, String)>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let next = self.state.merged(&entries);
        let json = serde_json::to_string(&next)?;

        self.entry()?
            .set_password(&json)
            .map_err(|e| StoreError::BackendError {
                message: format!("failed to set keyring password: {}", e),
            })?;

        self.state.replace(next);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {}
            Err(e) => {
                return Err(StoreError::BackendError {
                    message: format!("failed to delete keyring entry: {}", e),
                });
            }
        }

        self.state.replace(SessionSnapshot::new());
        Ok(())
    }

    fn observe(&self, key: SessionKey) -> BoxStream<'static, Option<String>> {
        self.state.observe(key)
    }
}
