//! Engine configuration.
//!
//! One immutable configuration is threaded through component constructors —
//! the API key is process-wide state, not something each screen re-creates.

use std::time::Duration;

use crate::flickr::Accuracy;

/// A 1x1 transparent PNG used as the "loading" image for every photo record
/// until its real bytes arrive. Readers never observe an empty blob.
pub const PLACEHOLDER_IMAGE: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x62, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Configuration for [`crate::sync::AlbumSyncEngine`].
#[derive(Clone)]
pub struct EngineConfig {
    /// Flickr API key sent with every search request.
    pub api_key: String,
    /// Geographic accuracy for location searches.
    pub accuracy: Accuracy,
    /// Number of photos requested per batch.
    pub per_page: u32,
    /// Ceiling on concurrent image downloads within one batch.
    pub concurrent_downloads: usize,
    /// Bound on the search request so a wedged call cannot stall a batch.
    pub search_timeout: Duration,
    /// Bound on each image download for the same reason.
    pub download_timeout: Duration,
    /// Bytes written into every photo record at creation time.
    pub placeholder: Vec<u8>,
}

impl EngineConfig {
    /// Configuration with defaults matching the interactive album flow:
    /// street-level accuracy, ten photos per batch.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            accuracy: Accuracy::Street,
            per_page: 10,
            concurrent_downloads: 6,
            search_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(60),
            placeholder: PLACEHOLDER_IMAGE.to_vec(),
        }
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("api_key", &"<redacted>")
            .field("accuracy", &self.accuracy)
            .field("per_page", &self.per_page)
            .field("concurrent_downloads", &self.concurrent_downloads)
            .field("search_timeout", &self.search_timeout)
            .field("download_timeout", &self.download_timeout)
            .field("placeholder_len", &self.placeholder.len())
            .finish()
    }
}
