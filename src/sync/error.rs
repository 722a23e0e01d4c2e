//! Error types for the album sync engine.

use thiserror::Error;

use crate::flickr::SearchError;
use crate::store::{PinKey, StoreError};

/// Errors from sync engine operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The location search failed before any record was written.
    #[error("photo search failed: {0}")]
    Search(#[from] SearchError),

    /// A store read or write failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A batch is already running for this pin; at most one may be in
    /// flight per pin at a time.
    #[error("a photo batch is already in flight for pin {pin}")]
    BatchInFlight { pin: PinKey },
}
