//! Provider-side digital twin registry facade.
//!
//! Serves paginated shell/submodel-descriptor listings and asset-link
//! lookups by querying four disjoint part-type collections (catalog,
//! serialized, batch, JIS parts) as one unified cursor-paginated stream,
//! enforcing per-partner data visibility while assembling descriptors.
//!
//! The HTTP routes and the storage layer live with the host; this crate
//! exposes the domain service plus the repository trait the host implements.

pub mod config;
pub mod domain;

pub use config::FacadeConfig;
pub use domain::error::DomainError;
pub use domain::service::DtrFacadeService;
