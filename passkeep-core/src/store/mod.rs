//! Session storage abstraction.
//!
//! This module provides:
//! - [`Secret`] - A wrapper for sensitive values that prevents accidental logging
//! - [`SessionStore`] - Trait for persistent session storage backends
//! - [`MemorySessionStore`] - In-memory implementation for tests and development
//! - [`FileSessionStore`] - JSON file in the platform data directory
//! - [`KeyringSessionStore`] - OS keyring implementation (with `keyring-store` feature)
//! - [`create_store`] - Helper to select a backend based on configuration and availability
//!
//! # Atomicity
//!
//! A session is written with a single [`SessionStore::set_all`] call and read
//! back with a single [`SessionStore::snapshot`], so readers never observe a
//! session with only some of its fields present.
//!
//! # Example
//!
//! ```rust,ignore
//! use passkeep_core::{MemorySessionStore, Provider, Session, SessionStore};
//!
//! let store = MemorySessionStore::new();
//! store.save_session(&Session::new(Provider::Google, "T1", "R1", "alice")).await?;
//!
//! let session = store.load_session().await?.unwrap();
//! assert_eq!(session.authorization.expose(), "T1");
//! ```

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::model::{Session, SessionKey};

mod file;
#[cfg(feature = "keyring-store")]
mod keyring;
mod memory;
mod state;

pub use file::FileSessionStore;
#[cfg(feature = "keyring-store")]
pub use keyring::KeyringSessionStore;
pub use memory::MemorySessionStore;

/// Every persisted session field, read or written as one unit.
pub type SessionSnapshot = BTreeMap<SessionKey, String>;

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the value,
/// and the backing memory is zeroed when the secret is dropped.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

/// Error type for session store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend encountered an error.
    #[error("backend error: {message}")]
    BackendError { message: String },

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The keyring backend is not available.
    #[error("keyring not available: {message}")]
    KeyringUnavailable { message: String },

    /// A bounded read did not complete in time.
    #[error("store read timed out after {after:?}")]
    Timeout { after: Duration },

    /// The platform data directory could not be determined.
    #[error("data directory not available")]
    DataDirUnavailable,
}

/// Persistent, asynchronous storage for the current session.
///
/// Implementations must:
/// - apply [`set_all`](SessionStore::set_all) atomically
/// - serialize their own writes
/// - give read-after-write consistency within one process
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read every stored field in one consistent view.
    async fn snapshot(&self) -> Result<SessionSnapshot, StoreError>;

    /// Write several fields as a single atomic update.
    ///
    /// Existing fields not named in `entries` are kept.
    async fn set_all(&self, entries: Vec<(SessionKey, String)>) -> Result<(), StoreError>;

    /// Remove every stored field.
    ///
    /// Returns `Ok(())` even if nothing was stored.
    async fn clear(&self) -> Result<(), StoreError>;

    /// Watch a single field.
    ///
    /// The stream yields the current value first, then the value after each
    /// change to the store.
    fn observe(&self, key: SessionKey) -> BoxStream<'static, Option<String>>;

    /// Retrieve one field.
    ///
    /// Returns `Ok(None)` if the field isn't stored.
    async fn get(&self, key: SessionKey) -> Result<Option<String>, StoreError> {
        Ok(self.snapshot().await?.remove(&key))
    }

    /// Load the stored session, if a complete one exists.
    async fn load_session(&self) -> Result<Option<Session>, StoreError> {
        let snapshot = self.snapshot().await?;
        if snapshot.is_empty() {
            return Ok(None);
        }

        let session = Session::from_lookup(|key| snapshot.get(&key).cloned());
        if session.is_none() {
            tracing::warn!(
                "Ignoring incomplete stored session ({} of {} fields present)",
                snapshot.len(),
                SessionKey::ALL.len()
            );
        }
        Ok(session)
    }

    /// Persist a full session in one atomic write.
    async fn save_session(&self, session: &Session) -> Result<(), StoreError> {
        self.set_all(session.to_entries()).await
    }
}

/// Which session store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local memory; nothing survives a restart.
    Memory,

    /// JSON file in the data directory.
    File,

    /// OS keyring.
    #[default]
    Keyring,
}

/// File name used by the file backend inside the data directory.
pub const SESSION_FILE_NAME: &str = "session.json";

/// Service name used for keyring entries.
pub const KEYRING_SERVICE: &str = "passkeep";

/// Create a session store with automatic backend selection.
///
/// # Backend Selection Logic
///
/// - [`StoreBackend::Keyring`]: attempts a [`KeyringSessionStore`] when the
///   `keyring-store` feature is enabled, otherwise falls back to the file store
/// - [`StoreBackend::File`]: opens `{data_dir}/session.json`
/// - [`StoreBackend::Memory`]: returns a [`MemorySessionStore`]
///
/// Any backend that cannot be opened falls back to [`MemorySessionStore`]
/// with a warning.
///
/// # Example
///
/// ```rust,ignore
/// use passkeep_core::store::{create_store, StoreBackend};
///
/// let store = create_store(StoreBackend::File, &data_dir);
/// ```
pub fn create_store(backend: StoreBackend, data_dir: &Path) -> Arc<dyn SessionStore> {
    match backend {
        StoreBackend::Keyring => {
            #[cfg(feature = "keyring-store")]
            match KeyringSessionStore::try_new(KEYRING_SERVICE) {
                Ok(store) => {
                    tracing::info!("Using OS keyring for session storage");
                    return Arc::new(store);
                }
                Err(e) => {
                    tracing::warn!("Keyring unavailable ({}), falling back to file store", e);
                }
            }

            #[cfg(not(feature = "keyring-store"))]
            tracing::warn!(
                "Keyring storage requested but keyring-store feature not enabled. \
                 Using file store."
            );

            open_file_store(data_dir)
        }
        StoreBackend::File => open_file_store(data_dir),
        StoreBackend::Memory => {
            tracing::debug!("Using in-memory session storage");
            Arc::new(MemorySessionStore::new())
        }
    }
}

fn open_file_store(data_dir: &Path) -> Arc<dyn SessionStore> {
    let path = data_dir.join(SESSION_FILE_NAME);
    match FileSessionStore::open(&path) {
        Ok(store) => {
            tracing::info!("Using session file {:?}", path);
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(
                "Session file {:?} unavailable ({}), falling back to memory store. \
                 The session will not persist across restarts.",
                path,
                e
            );
            Arc::new(MemorySessionStore::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Provider;
    use tempfile::TempDir;

    #[test]
    fn test_secret_debug_redacted() {
        let secret = Secret::new("super-secret");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_secret_display_redacted() {
        let secret = Secret::new("super-secret");
        let display = format!("{}", secret);
        assert!(!display.contains("super-secret"));
        assert!(display.contains("REDACTED"));
    }

    #[tokio::test]
    async fn test_create_store_memory() {
        let dir = TempDir::new().unwrap();
        let store = create_store(StoreBackend::Memory, dir.path());

        store
            .save_session(&Session::new(Provider::Naver, "T1", "R1", "alice"))
            .await
            .unwrap();
        assert!(store.load_session().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_store_file_writes_into_data_dir() {
        let dir = TempDir::new().unwrap();
        let store = create_store(StoreBackend::File, dir.path());

        store
            .save_session(&Session::new(Provider::Google, "T1", "R1", "alice"))
            .await
            .unwrap();
        assert!(dir.path().join(SESSION_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_load_session_ignores_partial_snapshot() {
        let store = MemorySessionStore::new();
        store
            .set_all(vec![(SessionKey::Authorization, "T1".to_string())])
            .await
            .unwrap();

        assert!(store.load_session().await.unwrap().is_none());
        assert_eq!(
            store.get(SessionKey::Authorization).await.unwrap().as_deref(),
            Some("T1")
        );
    }
}
