//! Result shapes of the discovery operations.

use std::collections::HashMap;

use aas_core::ShellDescriptor;
use serde::{Deserialize, Serialize};

/// One requested semantic-id key of a scan-by-semantic-ids call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticIdKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub value: String,
}

impl SemanticIdKey {
    pub fn new(key_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key_type: key_type.into(),
            value: value.into(),
        }
    }
}

/// Which registry answered an operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegistryRef {
    #[serde(rename = "connectorUrl")]
    pub connector_url: String,
    #[serde(rename = "assetId")]
    pub asset_id: String,
}

/// Per-registry outcome of a shell lookup. A failed registry is reported
/// here instead of aborting the others.
#[derive(Clone, Debug, Serialize)]
pub struct RegistryLookup {
    #[serde(flatten)]
    pub registry: RegistryRef,
    #[serde(rename = "shellsFound")]
    pub shells_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Merged result of a shell lookup across all of a partner's registries.
#[derive(Clone, Debug, Serialize)]
pub struct ShellsDiscovery {
    #[serde(rename = "shellDescriptors")]
    pub shells: Vec<ShellDescriptor>,
    pub registries: Vec<RegistryLookup>,
}

/// One shell descriptor with its registry provenance.
#[derive(Clone, Debug, Serialize)]
pub struct ShellDiscovery {
    #[serde(rename = "shellDescriptor")]
    pub shell: ShellDescriptor,
    pub registry: RegistryRef,
}

/// Terminal state of one submodel within a discovery call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmodelStatus {
    /// Data fetched; payload lives in [`SubmodelsDiscovery::data`].
    Success,
    /// The semantic id has no governance entry; never attempted.
    NotRequested,
    /// Negotiation or fetch failed; see the message.
    Error,
}

/// Per-submodel report of a discovery call.
#[derive(Clone, Debug, Serialize)]
pub struct DiscoveredSubmodel {
    #[serde(rename = "submodelId")]
    pub submodel_id: String,
    #[serde(rename = "semanticId", skip_serializing_if = "Option::is_none")]
    pub semantic_id: Option<String>,
    #[serde(rename = "assetId", skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(rename = "connectorUrl", skip_serializing_if = "Option::is_none")]
    pub connector_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    pub status: SubmodelStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Result of a submodel discovery: reports keyed by submodel id, fetched
/// payloads for the successful ones, and the registry that served the shell.
#[derive(Clone, Debug, Serialize)]
pub struct SubmodelsDiscovery {
    #[serde(rename = "submodelDescriptors")]
    pub submodels: HashMap<String, DiscoveredSubmodel>,
    pub data: HashMap<String, serde_json::Value>,
    #[serde(rename = "submodelsFound")]
    pub submodels_found: usize,
    pub registry: RegistryRef,
}
