//! Flickr photo search client.
//!
//! Issues one `flickr.photos.search` query per call and returns the photo
//! descriptors (title + resolvable URL) or a typed error. Request building
//! and payload decoding are pure functions so the interesting behavior is
//! unit-testable without a transport; the [`PhotoSearch`] trait is the seam
//! the sync engine consumes, so tests substitute an in-process fake.

pub mod error;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;

pub use error::{SearchError, SearchErrorKind};
pub use types::{source_url, Accuracy, PhotoDescriptor};

use types::SearchResponse;

/// REST endpoint shared by all Flickr API methods.
pub const API_ENDPOINT: &str = "https://api.flickr.com/services/rest";

/// Inputs to one location search. A given query always produces the same
/// request URL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchQuery {
    pub accuracy: Accuracy,
    pub latitude: f64,
    pub longitude: f64,
    pub page: u32,
    pub per_page: u32,
}

/// Build the full request URL for a search query. Parameter order is fixed.
pub fn search_url(api_key: &str, query: &SearchQuery) -> String {
    format!(
        "{API_ENDPOINT}?method=flickr.photos.search\
         &api_key={api_key}\
         &accuracy={accuracy}\
         &lat={lat}&lon={lon}\
         &page={page}&per_page={per_page}\
         &format=json&nojsoncallback=1",
        accuracy = query.accuracy.value(),
        lat = query.latitude,
        lon = query.longitude,
        page = query.page,
        per_page = query.per_page,
    )
}

/// Decode a search response body into descriptors.
///
/// An empty `photo` array is a valid success. `stat: "fail"` surfaces the
/// service's own error code and message.
pub fn parse_search_response(body: &str) -> Result<Vec<PhotoDescriptor>, SearchError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| SearchError::Decode(e.to_string()))?;

    if response.stat != "ok" {
        return Err(SearchError::Api {
            code: response.code.unwrap_or(0),
            message: response
                .message
                .unwrap_or_else(|| "unknown service error".to_string()),
        });
    }

    let page = response
        .photos
        .ok_or_else(|| SearchError::Decode("missing photos object in payload".to_string()))?;

    Ok(page.photo.into_iter().map(PhotoDescriptor::from).collect())
}

/// The search contract the sync engine depends on.
#[async_trait]
pub trait PhotoSearch: Send + Sync {
    /// Run one search and return its descriptors, lazily ordered by the
    /// remote service.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<PhotoDescriptor>, SearchError>;
}

/// HTTP-backed [`PhotoSearch`] implementation.
pub struct FlickrClient {
    http: reqwest::Client,
    api_key: String,
    timeout: Duration,
}

impl FlickrClient {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            timeout,
        }
    }
}

impl std::fmt::Debug for FlickrClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlickrClient")
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PhotoSearch for FlickrClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<PhotoDescriptor>, SearchError> {
        let url = search_url(&self.api_key, query);
        tracing::debug!(
            lat = query.latitude,
            lon = query.longitude,
            per_page = query.per_page,
            "searching photos by location"
        );

        let response = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(SearchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status {
                code: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(SearchError::Transport)?;
        parse_search_response(&body)
    }
}
