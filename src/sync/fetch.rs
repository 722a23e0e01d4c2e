//! Image download transport.
//!
//! One GET per photo URL, body returned as raw bytes. The [`ImageFetcher`]
//! trait is the seam the engine fans out over, so tests can substitute a
//! fake that never touches the network.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// A single image download failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, DNS, or timeout failure.
    #[error("failed to fetch {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("fetch of {url} returned HTTP {code}")]
    Status { url: String, code: u16 },
}

/// Downloads one image by URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// HTTP-backed [`ImageFetcher`].
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpImageFetcher {
    pub fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                code: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            source: e,
        })?;
        Ok(bytes.to_vec())
    }
}
