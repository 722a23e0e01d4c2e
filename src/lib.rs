//! geoalbum — pin/photo album synchronization engine.
//!
//! A user drops geographic markers ("pins") and each pin owns a persisted
//! photo album sourced from the Flickr search API. The engine fetches a batch
//! of remote photo descriptors for a pin's coordinate, materializes
//! placeholder records immediately, downloads each image concurrently, and
//! persists results through a two-surface store so interactive readers never
//! block on (or tear against) the bulk-write path.
//!
//! The crate exposes four pieces:
//! - [`flickr`]: the photo search client (one remote query per batch),
//! - [`store`]: durable SQLite storage with a background/foreground
//!   visibility split and explicit propagation,
//! - [`sync`]: the per-pin batch orchestrator and its notification feed,
//! - [`album`]: a live, ordered view over one pin's photos.

#![warn(clippy::all)]

pub mod album;
pub mod config;
pub mod flickr;
pub mod store;
pub mod sync;

pub use album::{AlbumSnapshot, AlbumView};
pub use config::EngineConfig;
pub use store::{Coordinate, PhotoKey, PhotoRecord, PinKey, PinRecord, Store, StoreError};
pub use sync::{AlbumNotification, AlbumSyncEngine, BatchOutcome, SyncError};
