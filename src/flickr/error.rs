//! Error types for the Flickr search client.

use thiserror::Error;

/// Errors from a single location search.
///
/// Only a successful decode with a results array (possibly empty) is a
/// success; everything else classifies into one of three kinds so callers
/// can distinguish "zero photos found" from "search failed".
#[derive(Debug, Error)]
pub enum SearchError {
    /// No response at all (DNS, connect, timeout).
    #[error("search transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    /// A response arrived with a non-success HTTP status.
    #[error("search returned HTTP status {code}")]
    Status { code: u16 },

    /// HTTP 200, but the service rejected the query (`stat: "fail"`).
    #[error("search rejected by remote service (code {code}): {message}")]
    Api { code: i64, message: String },

    /// The payload did not decode into the expected shape.
    #[error("malformed search payload: {0}")]
    Decode(String),
}

/// Coarse classification carried in notifications, where the full error has
/// already been rendered to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchErrorKind {
    Transport,
    Status,
    Decode,
}

impl SearchError {
    pub fn kind(&self) -> SearchErrorKind {
        match self {
            SearchError::Transport(_) => SearchErrorKind::Transport,
            SearchError::Status { .. } | SearchError::Api { .. } => SearchErrorKind::Status,
            SearchError::Decode(_) => SearchErrorKind::Decode,
        }
    }
}
