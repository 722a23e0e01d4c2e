//! Persistent pin/photo storage.
//!
//! The [`Store`] owns the SQLite database and exposes the two-surface write
//! model the sync engine and interactive views are built on; see
//! [`db`] for the surface semantics.

pub mod db;
pub mod error;
pub mod schema;
pub mod types;

pub use db::Store;
pub use error::StoreError;
pub use types::{
    Coordinate, CoordinateError, NewPhoto, PhotoKey, PhotoRecord, PinKey, PinRecord, StoreEvent,
};
