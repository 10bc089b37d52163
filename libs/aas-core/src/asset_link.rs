//! Asset-link search parameters for shell lookups.
//!
//! On the wire each parameter is itself a base64url token wrapping a
//! `{"name": ..., "value": ...}` JSON object. An unparseable entry is a
//! client error, not something to skip silently.

use serde::{Deserialize, Serialize};

use crate::Error;

/// One `name=value` search key of a lookup-by-asset-link query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLink {
    pub name: String,
    pub value: String,
}

impl AssetLink {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Encode to the base64url token used as a lookup query parameter.
    ///
    /// # Errors
    /// Returns a JSON serialization error if encoding fails.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_vec(self).map(|bytes| crate::base64url::encode(&bytes))
    }

    /// Decode one query parameter token.
    ///
    /// # Errors
    /// Returns `Error::InvalidBase64` for broken base64url input and
    /// `Error::InvalidJson` for payloads that are not a name/value object.
    pub fn decode(token: &str) -> Result<Self, Error> {
        let bytes = crate::base64url::decode(token).map_err(|_| Error::InvalidBase64)?;
        serde_json::from_slice(&bytes).map_err(|_| Error::InvalidJson)
    }

    /// Decode a full parameter list, failing on the first broken entry.
    ///
    /// # Errors
    /// Propagates the first decode failure.
    pub fn decode_all<'a, I>(tokens: I) -> Result<Vec<Self>, Error>
    where
        I: IntoIterator<Item = &'a str>,
    {
        tokens.into_iter().map(Self::decode).collect()
    }
}
