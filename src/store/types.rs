//! Record types for the pin/photo store.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Store-assigned key of a pin, stable across process restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinKey(pub(crate) i64);

impl PinKey {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for PinKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Store-assigned key of a photo record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhotoKey(pub(crate) i64);

impl PhotoKey {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for PhotoKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A latitude/longitude pair out of range for a pin.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("coordinate out of range: lat {latitude}, lon {longitude}")]
pub struct CoordinateError {
    pub latitude: f64,
    pub longitude: f64,
}

/// A validated geographic coordinate. Constructing one is the only range
/// check the store needs — an out-of-range pin is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Rebuild from persisted values, which were validated at insert time.
    /// Clamps rather than fails so a hand-edited database row cannot poison
    /// reads.
    pub(crate) fn from_stored(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: latitude.clamp(-90.0, 90.0),
            longitude: longitude.clamp(-180.0, 180.0),
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// A saved geographic marker owning an album of photos. The coordinate is
/// immutable after creation; there is no update operation for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PinRecord {
    pub key: PinKey,
    pub coordinate: Coordinate,
    pub created_at: DateTime<Utc>,
}

/// One persisted image record belonging to a pin.
///
/// `image` is non-empty from the moment the record exists: it holds the
/// placeholder until the downloaded bytes are propagated. `remote_url` is
/// only needed while the fetch is outstanding.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRecord {
    pub key: PhotoKey,
    pub pin: PinKey,
    pub title: String,
    pub remote_url: Option<String>,
    pub image: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Input for one placeholder record in a batch insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPhoto {
    pub title: String,
    pub remote_url: String,
}

/// Broadcast on every commit that changes a pin's foreground-visible photo
/// set. Consumers re-query; the event only says *which* pin changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreEvent {
    pub pin: PinKey,
}
