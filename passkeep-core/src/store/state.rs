//! Observable in-process session state shared by every store backend.

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::SessionSnapshot;
use crate::model::SessionKey;

/// Current session fields held in a watch channel.
///
/// Every mutation replaces the snapshot under the channel's lock, so a
/// reader sees either the old or the new snapshot, never a mix.
pub(super) struct SessionState {
    tx: watch::Sender<SessionSnapshot>,
}

impl SessionState {
    pub(super) fn new(initial: SessionSnapshot) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub(super) fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    /// Snapshot as it would look after merging `entries`.
    pub(super) fn merged(&self, entries: &[(SessionKey, String)]) -> SessionSnapshot {
        let mut next = self.snapshot();
        for (key, value) in entries {
            next.insert(*key, value.clone());
        }
        next
    }

    pub(super) fn replace(&self, snapshot: SessionSnapshot) {
        self.tx.send_replace(snapshot);
    }

    pub(super) fn observe(&self, key: SessionKey) -> BoxStream<'static, Option<String>> {
        WatchStream::new(self.tx.subscribe())
            .map(move |snapshot| snapshot.get(&key).cloned())
            .boxed()
    }
}
