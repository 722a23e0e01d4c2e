//! Live album view over one pin's published photos.
//!
//! An [`AlbumView`] keeps a current snapshot of a pin's foreground-visible
//! photos and refreshes it whenever the store commits a change for that pin.
//! Consumers either read the latest snapshot on demand or watch for
//! replacements; they never observe mid-batch staging states, because the
//! snapshot is re-queried only on commit events.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::store::{PhotoRecord, PinKey, Store, StoreError};

/// Point-in-time foreground view of one pin's album, ordered by creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlbumSnapshot {
    pub photos: Vec<PhotoRecord>,
}

impl AlbumSnapshot {
    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}

/// Keeps an up-to-date [`AlbumSnapshot`] for one pin.
#[derive(Debug)]
pub struct AlbumView {
    rx: watch::Receiver<AlbumSnapshot>,
    task: JoinHandle<()>,
}

impl AlbumView {
    /// Open a view for a pin. The initial snapshot is read before this
    /// returns; a background task then follows the store's commit events.
    pub async fn open(store: Arc<Store>, pin: PinKey) -> Result<Self, StoreError> {
        // Subscribe before the initial read: a commit landing between the
        // two would otherwise be missed entirely, since broadcast receivers
        // only see events sent after subscription. An event for state the
        // initial read already saw just triggers a harmless re-query.
        let events = store.events();
        let initial = AlbumSnapshot {
            photos: store.visible_photos(pin).await?,
        };
        let (tx, rx) = watch::channel(initial);
        let task = tokio::spawn(follow(store, pin, events, tx));
        Ok(Self { rx, task })
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> AlbumSnapshot {
        self.rx.borrow().clone()
    }

    /// A receiver that yields each snapshot replacement. Intermediate
    /// snapshots may be skipped under load; the latest one is always
    /// delivered.
    pub fn subscribe(&self) -> watch::Receiver<AlbumSnapshot> {
        self.rx.clone()
    }
}

impl Drop for AlbumView {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn follow(
    store: Arc<Store>,
    pin: PinKey,
    mut events: broadcast::Receiver<crate::store::StoreEvent>,
    tx: watch::Sender<AlbumSnapshot>,
) {
    loop {
        match events.recv().await {
            Ok(event) if event.pin == pin => {}
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Fell behind; the re-query below catches the view up.
                tracing::debug!(pin = %pin, skipped, "album view lagged behind commit events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }

        match store.visible_photos(pin).await {
            Ok(photos) => {
                if tx.send(AlbumSnapshot { photos }).is_err() {
                    break;
                }
            }
            Err(e) => {
                // Keep the previous snapshot; the next commit retries.
                tracing::warn!(pin = %pin, error = %e, "album view refresh failed");
            }
        }
    }
}
