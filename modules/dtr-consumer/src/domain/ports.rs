//! Output ports toward the dataspace connector.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::ConsumerError;
use super::governance::OdrlPolicy;

/// Catalog filter expression, e.g. restricting datasets to registries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogFilter {
    pub key: String,
    pub operator: String,
    pub value: String,
}

/// One dataset offered in a connector catalog.
#[derive(Clone, Debug)]
pub struct Dataset {
    pub asset_id: String,
    /// `dct:type` of the dataset, when declared.
    pub dataset_type: Option<String>,
    /// Usage policies offered for this dataset.
    pub policies: Vec<OdrlPolicy>,
}

/// Result of a successful contract negotiation: where to call and with what.
#[derive(Clone, Debug)]
pub struct EndpointAccess {
    pub data_plane_url: String,
    pub access_token: String,
}

/// Dataspace transport capability consumed by the orchestrator.
///
/// Implementations own the wire protocol (discovery service, catalog
/// requests, contract negotiation, token handling); the orchestrator only
/// sequences these calls. No retries are expected here beyond what the
/// transport itself chooses to do.
#[async_trait]
pub trait ConnectorClient: Send + Sync {
    /// Resolve the partner's connector endpoints via the discovery service.
    async fn discover(&self, partner_bpn: &str) -> Result<Vec<String>, ConsumerError>;

    /// Fetch the connector's catalog, filtered server-side.
    async fn fetch_catalog(
        &self,
        partner_bpn: &str,
        connector_url: &str,
        filter: &CatalogFilter,
    ) -> Result<Vec<Dataset>, ConsumerError>;

    /// Negotiate usage of one asset under the given acceptable policies and
    /// return data-plane access. Policy incompatibility is a failure.
    async fn negotiate(
        &self,
        partner_bpn: &str,
        connector_url: &str,
        asset_id: &str,
        policies: &[OdrlPolicy],
    ) -> Result<EndpointAccess, ConsumerError>;

    /// Fetch a data-plane resource with a previously negotiated token.
    async fn fetch_data(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<serde_json::Value, ConsumerError>;
}
