//! In-memory session storage implementation.

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::sync::Mutex;

use super::state::SessionState;
use super::{SessionSnapshot, SessionStore, StoreError};
use crate::model::{Session, SessionKey};

/// In-memory session store for testing and development.
///
/// This store is not persistent; data is lost when the process exits.
///
/// # Thread Safety
///
/// Writes are serialized by an async mutex and published through a watch
/// channel; the store is safe to share across threads and tasks.
pub struct MemorySessionStore {
    state: SessionState,
    write_lock: Mutex<()>,
}

impl MemorySessionStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::with_snapshot(SessionSnapshot::new())
    }

    /// Create a memory store already holding a session.
    pub fn with_session(session: &Session) -> Self {
        Self::with_snapshot(session.to_entries().into_iter().collect())
    }

    fn with_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            state: SessionState::new(snapshot),
            write_lock: Mutex::new(()),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySessionStore")
            .field("keys_count", &self.state.snapshot().len())
            .finish()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn snapshot(&self) -> Result<SessionSnapshot, StoreError> {
        Ok(self.state.snapshot())
    }

    async fn set_all(&self, entries: Vec<(SessionKey, String)>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.state.replace(self.state.merged(&entries));
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.state.replace(SessionSnapshot::new());
        Ok(())
    }

    fn observe(&self, key: SessionKey) -> BoxStream<'static, Option<String>> {
        self.state.observe(key)
    }
}
