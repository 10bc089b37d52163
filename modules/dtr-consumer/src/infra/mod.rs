//! Infrastructure adapters.

pub mod http;

pub use http::{HttpConnectorClient, HttpConnectorConfig};
