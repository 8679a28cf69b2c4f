//! File-backed session storage.
//!
//! The session is stored as one JSON document. Writes go to a sibling
//! temporary file which is then renamed over the original, so a crash
//! mid-write leaves either the old or the new session on disk.
//!
//! # Storage Location
//!
//! By default the file lives at `{data_dir}/session.json`, where `data_dir`
//! is the platform data directory (`~/.local/share/passkeep` on Linux).

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::state::SessionState;
use super::{SESSION_FILE_NAME, SessionSnapshot, SessionStore, StoreError};
use crate::model::SessionKey;

/// On-disk format of the session file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionFile {
    /// Version of the file format (for future migrations).
    version: u32,

    /// Stored session fields.
    entries: SessionSnapshot,
}

impl SessionFile {
    const VERSION: u32 = 1;

    fn new(entries: SessionSnapshot) -> Self {
        Self {
            version: Self::VERSION,
            entries,
        }
    }
}

/// Session store persisted to a JSON file.
///
/// The file is read once on [`open`](FileSessionStore::open); afterwards the
/// in-process state is authoritative and every write is flushed to disk
/// before it becomes visible to readers.
pub struct FileSessionStore {
    path: PathBuf,
    state: SessionState,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    /// Get the default session file path.
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let dirs = directories::ProjectDirs::from("com", "passkeep", "passkeep")
            .ok_or(StoreError::DataDirUnavailable)?;
        Ok(dirs.data_dir().join(SESSION_FILE_NAME))
    }

    /// Open the session file at `path`.
    ///
    /// Creates parent directories if they don't exist. A missing file is an
    /// empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let file: SessionFile = serde_json::from_str(&contents)?;
            if file.version != SessionFile::VERSION {
                tracing::warn!(
                    "Session file {:?} has version {}, expected {}",
                    path,
                    file.version,
                    SessionFile::VERSION
                );
            }
            file.entries
        } else {
            SessionSnapshot::new()
        };

        Ok(Self {
            path,
            state: SessionState::new(entries),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &SessionSnapshot) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(&SessionFile::new(entries.clone()))?;
        let tmp = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

impl std::fmt::Debug for FileSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSessionStore")
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn snapshot(&self) -> Result<SessionSnapshot, StoreError> {
        Ok(self.state.snapshot())
    }

    async fn set_all(&self, entries: Vec<(SessionKey, String)>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let next = self.state.merged(&entries);
        self.persist(&next).await?;
        self.state.replace(next);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.state.replace(SessionSnapshot::new());
        Ok(())
    }

    fn observe(&self, key: SessionKey) -> BoxStream<'static, Option<String>> {
        self.state.observe(key)
    }
}
