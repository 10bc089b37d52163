//! Consumer-side digital twin registry manager.
//!
//! Discovers remote registries through a partner's dataspace connector,
//! caches the connection facts per business partner, negotiates data-usage
//! contracts, and fans out submodel fetches in parallel while deduplicating
//! redundant negotiations.

pub mod config;
pub mod domain;
pub mod infra;

pub use config::ConsumerConfig;
pub use domain::cache::{InMemoryRegistryCache, RegistryCache, RegistryEntry};
pub use domain::error::ConsumerError;
pub use domain::service::DtrDiscoveryService;
