//! Synchronous bearer-token cache in front of the asynchronous session store.
//!
//! Transport middleware decorates requests without suspending, but the
//! authoritative session lives in an async [`SessionStore`]. [`TokenCache`]
//! bridges the two:
//!
//! - [`get_token`](TokenCache::get_token) answers from memory when warm. When
//!   cold it performs one bounded, blocking load and caches the answer,
//!   including "no session".
//! - [`refresh`](TokenCache::refresh) re-reads the store after the session
//!   changes.
//! - [`invalidate`](TokenCache::invalidate) drops the token without touching
//!   the store.
//!
//! # Cold loads
//!
//! The blocking load runs on its own OS thread with a private current-thread
//! runtime. It never waits on the caller's runtime, so calling `get_token`
//! from inside a single-threaded runtime cannot deadlock. Call
//! [`prewarm`](TokenCache::prewarm) at startup to keep the blocking branch
//! off the hot path.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;

use crate::store::{Secret, SessionStore, StoreError};

/// Default bound on a cold load.
pub const DEFAULT_COLD_LOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// In-memory shadow of the session's authorization token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedToken {
    /// The bearer token, or `None` when no session exists.
    pub value: Option<Secret>,

    /// When the value was read from the store; `None` while cold.
    pub loaded_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn loaded(value: Option<Secret>) -> Self {
        Self {
            value,
            loaded_at: Some(Utc::now()),
        }
    }

    /// Whether the cache has been populated.
    pub fn is_loaded(&self) -> bool {
        self.loaded_at.is_some()
    }
}

/// Thread-safe bearer-token cache.
///
/// Construct one per process next to the transport and share it with
/// `Arc`; there is no global instance.
pub struct TokenCache {
    store: Arc<dyn SessionStore>,
    slot: RwLock<CachedToken>,
    load_gate: Mutex<()>,
    cold_load_timeout: Duration,
}

impl TokenCache {
    /// Create a cold cache over `store`.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self::with_cold_load_timeout(store, DEFAULT_COLD_LOAD_TIMEOUT)
    }

    /// Create a cold cache with a custom bound on the blocking load.
    pub fn with_cold_load_timeout(store: Arc<dyn SessionStore>, timeout: Duration) -> Self {
        Self {
            store,
            slot: RwLock::new(CachedToken::default()),
            load_gate: Mutex::new(()),
            cold_load_timeout: timeout,
        }
    }

    /// Get the current bearer token.
    ///
    /// Returns immediately when warm. When cold, blocks the calling thread
    /// for at most the cold-load timeout while the store is read; the result
    /// is cached even if it is "no token". A failed or timed-out load
    /// returns `None` and leaves the cache cold so the next call retries.
    pub fn get_token(&self) -> Option<Secret> {
        if let Some(value) = self.warm_value() {
            return value;
        }

        let _gate = self.load_gate.lock();
        if let Some(value) = self.warm_value() {
            tracing::trace!("Token cache warmed by a concurrent load");
            return value;
        }

        tracing::debug!("Token cache cold, loading session from store");
        match self.blocking_load() {
            Ok(value) => self.fill_if_cold(value),
            Err(e) => {
                tracing::warn!("Cold token load failed, sending without credentials: {}", e);
                None
            }
        }
    }

    /// Re-read the store and overwrite the cached token.
    ///
    /// Call after every session change so a cached "no token" does not
    /// outlive a login.
    pub async fn refresh(&self) -> Result<(), StoreError> {
        let value = read_token(self.store.as_ref()).await?;
        *self.slot.write() = CachedToken::loaded(value);
        tracing::debug!("Token cache refreshed from store");
        Ok(())
    }

    /// Forget the cached token without touching the store.
    ///
    /// The cache stays warm with "no token", so requests issued after this
    /// call go out unauthenticated even if the store has not been cleared yet.
    pub fn invalidate(&self) {
        *self.slot.write() = CachedToken::loaded(None);
        tracing::debug!("Token cache invalidated");
    }

    /// Populate a cold cache asynchronously.
    ///
    /// Does nothing when the cache is already warm.
    pub async fn prewarm(&self) -> Result<(), StoreError> {
        if self.is_warm() {
            return Ok(());
        }
        let value = read_token(self.store.as_ref()).await?;
        self.fill_if_cold(value);
        Ok(())
    }

    /// Whether a value (possibly "no token") is cached.
    pub fn is_warm(&self) -> bool {
        self.slot.read().is_loaded()
    }

    /// Copy of the cache slot, for diagnostics.
    pub fn snapshot(&self) -> CachedToken {
        self.slot.read().clone()
    }

    fn warm_value(&self) -> Option<Option<Secret>> {
        let slot = self.slot.read();
        slot.is_loaded().then(|| slot.value.clone())
    }

    /// Store a loaded value unless `refresh`/`invalidate` got there first,
    /// and return whatever the slot holds afterwards.
    fn fill_if_cold(&self, value: Option<Secret>) -> Option<Secret> {
        let mut slot = self.slot.write();
        if !slot.is_loaded() {
            *slot = CachedToken::loaded(value);
        }
        slot.value.clone()
    }

    fn blocking_load(&self) -> Result<Option<Secret>, StoreError> {
        let store = Arc::clone(&self.store);
        let timeout = self.cold_load_timeout;

        let handle = std::thread::Builder::new()
            .name("passkeep-cold-load".to_string())
            .spawn(move || -> Result<Option<Secret>, StoreError> {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()?;
                runtime.block_on(async {
                    match tokio::time::timeout(timeout, read_token(store.as_ref())).await {
                        Ok(result) => result,
                        Err(_) => Err(StoreError::Timeout { after: timeout }),
                    }
                })
            })?;

        handle.join().unwrap_or_else(|_| {
            Err(StoreError::BackendError {
                message: "cold-load thread panicked".to_string(),
            })
        })
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("slot", &*self.slot.read())
            .field("cold_load_timeout", &self.cold_load_timeout)
            .finish()
    }
}

async fn read_token(store: &dyn SessionStore) -> Result<Option<Secret>, StoreError> {
    Ok(store.load_session().await?.map(|session| session.authorization))
}
