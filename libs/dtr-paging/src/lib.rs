//! Opaque pagination cursor for the unified part-type enumeration.
//!
//! The provider facade walks four disjoint part-type collections as one
//! virtual stream. The cursor records which source is in progress and the
//! created-at watermark of the last emitted row, encoded as a base64url JSON
//! token so callers treat it as opaque.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The part-type collection a cursor was minted against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CursorSource {
    #[serde(rename = "CP")]
    CatalogPart,
    #[serde(rename = "SP")]
    SerializedPart,
    #[serde(rename = "JIS")]
    JisPart,
    #[serde(rename = "BATCH")]
    Batch,
}

/// Fixed enumeration order of the four sources. A source is exhausted before
/// the next one is entered, and a cursor is only valid for the source it was
/// minted against.
pub const SOURCE_PRECEDENCE: [CursorSource; 4] = [
    CursorSource::CatalogPart,
    CursorSource::SerializedPart,
    CursorSource::JisPart,
    CursorSource::Batch,
];

impl CursorSource {
    /// The source following this one in precedence order, if any.
    #[must_use]
    pub fn next(self) -> Option<CursorSource> {
        let idx = SOURCE_PRECEDENCE.iter().position(|s| *s == self)?;
        SOURCE_PRECEDENCE.get(idx + 1).copied()
    }
}

/// Cursor errors. Decoding is strict; callers decide whether a broken cursor
/// is a client error or degrades to an empty result.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid cursor: invalid base64url encoding")]
    InvalidBase64,

    #[error("invalid cursor: malformed JSON")]
    InvalidJson,
}

/// Resume point of a paged enumeration: the in-progress source plus the
/// created-at watermark of the last emitted row (`None` before the first row
/// of a source has been seen).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingCursor {
    #[serde(rename = "type")]
    pub source: CursorSource,
    #[serde(rename = "timestamp")]
    pub watermark: Option<DateTime<Utc>>,
}

impl PagingCursor {
    pub fn new(source: CursorSource, watermark: Option<DateTime<Utc>>) -> Self {
        Self { source, watermark }
    }

    /// Encode to the opaque base64url token handed out to callers.
    ///
    /// # Errors
    /// Returns a JSON serialization error if encoding fails.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_vec(self).map(|bytes| base64_url::encode(&bytes))
    }

    /// Decode an opaque cursor token.
    ///
    /// # Errors
    /// Returns `Error::InvalidBase64` if the token is not base64url and
    /// `Error::InvalidJson` if the payload does not match the wire shape.
    pub fn decode(token: &str) -> Result<Self, Error> {
        let bytes = base64_url::decode(token).map_err(|_| Error::InvalidBase64)?;
        serde_json::from_slice(&bytes).map_err(|_| Error::InvalidJson)
    }
}

/// One page of a cursor-paginated listing.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque token resuming the enumeration; `None` once exhausted.
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }

    /// No items and no cursor, for requests that cannot be answered.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }
}

// base64url helpers (no padding)
mod base64_url {
    use base64::Engine;

    pub fn encode(bytes: &[u8]) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }

    pub fn decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(s)
    }
}
