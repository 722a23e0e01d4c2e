//! Types for the Flickr search client, including the wire format.

use serde::Deserialize;

/// Geographic accuracy of a location search, as defined by the Flickr API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Accuracy {
    World = 1,
    Country = 3,
    Region = 6,
    City = 11,
    Street = 16,
}

impl Accuracy {
    /// The numeric value sent in the `accuracy` query parameter.
    pub fn value(&self) -> u8 {
        *self as u8
    }
}

/// One remote photo reference: a display title plus a resolvable image URL.
///
/// This is everything the sync engine needs to materialize a placeholder
/// record and later download the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoDescriptor {
    pub title: String,
    pub url: String,
}

/// Derive the static image URL from the four descriptor fields Flickr
/// returns. Pure — unit-testable with no transport.
pub fn source_url(farm: u64, server: &str, id: &str, secret: &str) -> String {
    format!("https://farm{farm}.staticflickr.com/{server}/{id}_{secret}.jpg")
}

/// Top-level search response. Flickr reports API-level failures with HTTP
/// 200 and `stat: "fail"`, in which case `photos` is absent and
/// `code`/`message` describe the rejection.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub photos: Option<PhotoPage>,
    pub stat: String,
    pub code: Option<i64>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PhotoPage {
    pub photo: Vec<RawPhoto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPhoto {
    pub title: String,
    pub farm: u64,
    pub server: String,
    pub id: String,
    pub secret: String,
}

impl From<RawPhoto> for PhotoDescriptor {
    fn from(raw: RawPhoto) -> Self {
        let url = source_url(raw.farm, &raw.server, &raw.id, &raw.secret);
        Self {
            title: raw.title,
            url,
        }
    }
}
