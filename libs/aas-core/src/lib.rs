//! Shared Asset Administration Shell (AAS v3) wire model.
//!
//! The registry provider emits these shapes and the dataspace consumer parses
//! them back, so both sides depend on this crate instead of carrying their
//! own copies.

pub mod asset_link;
pub mod descriptor;

pub use asset_link::AssetLink;
pub use descriptor::{
    AssetKind, Endpoint, ProtocolInformation, Reference, ReferenceKey, SecurityAttribute,
    ShellDescriptor, SpecificAssetId, SubmodelDescriptor, SubprotocolBody, SUBMODEL_INTERFACE,
};

/// Wildcard subject granting read access to every partner.
pub const PUBLIC_READABLE: &str = "PUBLIC_READABLE";

/// Base64url-encode an identifier for use in registry URL paths.
#[must_use]
pub fn encode_id(id: &str) -> String {
    base64url::encode(id.as_bytes())
}

/// Decode errors shared by the token codecs in this crate.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid token: invalid base64url encoding")]
    InvalidBase64,

    #[error("invalid token: malformed JSON")]
    InvalidJson,
}

// base64url helpers (no padding)
pub(crate) mod base64url {
    use base64::Engine;

    pub fn encode(bytes: &[u8]) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }

    pub fn decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(s)
    }
}
