//! Default [`ConnectorClient`] implementation over the connector's consumer
//! management API.
//!
//! Talks to three endpoints: the central connector discovery service, the
//! local connector's management API (catalog requests and EDR negotiation)
//! and, with negotiated tokens, remote data planes. Contract-negotiation
//! internals stay behind the management API; this client only sequences the
//! calls.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::error::ConsumerError;
use crate::domain::governance::{self, OdrlPolicy};
use crate::domain::ports::{CatalogFilter, ConnectorClient, Dataset, EndpointAccess};

/// Configuration of the HTTP connector client.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConnectorConfig {
    /// Connector discovery service endpoint.
    pub discovery_url: String,
    /// Management API base of the consuming connector.
    pub management_url: String,
    /// API key sent to the management API.
    pub management_api_key: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for HttpConnectorConfig {
    fn default() -> Self {
        Self {
            discovery_url: "http://localhost:8585/api/v1.0/administration/connectors/discovery"
                .to_owned(),
            management_url: "http://localhost:8181/management".to_owned(),
            management_api_key: String::new(),
            timeout_ms: 30_000,
        }
    }
}

pub struct HttpConnectorClient {
    client: reqwest::Client,
    config: HttpConnectorConfig,
}

impl HttpConnectorClient {
    /// Create a client with a pooled HTTP connection.
    ///
    /// # Errors
    /// Fails when the underlying TLS setup cannot be initialized.
    pub fn new(config: HttpConnectorConfig) -> Result<Self, ConsumerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| ConsumerError::connector(format!("http client setup failed: {e}")))?;
        Ok(Self { client, config })
    }

    fn management(&self, path: &str) -> String {
        format!("{}{path}", self.config.management_url.trim_end_matches('/'))
    }

    async fn post_management(&self, path: &str, body: Value) -> Result<Value, ConsumerError> {
        let response = self
            .client
            .post(self.management(path))
            .header("X-Api-Key", self.config.management_api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| ConsumerError::connector(format!("management request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConsumerError::connector(format!(
                "management API answered {status} on {path}"
            )));
        }
        response
            .json()
            .await
            .map_err(|e| ConsumerError::connector(format!("malformed management response: {e}")))
    }

    fn parse_dataset(dataset: &Value) -> Option<Dataset> {
        let asset_id = dataset.get("@id")?.as_str()?.to_owned();
        let dataset_type = dataset
            .get("dct:type")
            .or_else(|| dataset.get("http://purl.org/dc/terms/type"))
            .and_then(|t| t.get("@id").or(Some(t)))
            .and_then(Value::as_str)
            .map(str::to_owned);

        let mut policies = Vec::new();
        if let Some(has_policy) = dataset.get("odrl:hasPolicy") {
            let offers: Vec<&Value> = match has_policy {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            for offer in offers {
                // Offers carry @id/@type noise on top of the policy body.
                if let Ok(policy) = serde_json::from_value::<OdrlPolicy>(offer.clone()) {
                    policies.push(policy);
                }
            }
        }

        Some(Dataset {
            asset_id,
            dataset_type,
            policies,
        })
    }
}

#[async_trait]
impl ConnectorClient for HttpConnectorClient {
    async fn discover(&self, partner_bpn: &str) -> Result<Vec<String>, ConsumerError> {
        let response = self
            .client
            .post(&self.config.discovery_url)
            .json(&json!([partner_bpn]))
            .send()
            .await
            .map_err(|e| ConsumerError::connector(format!("connector discovery failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConsumerError::connector(format!(
                "connector discovery answered {status}"
            )));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| ConsumerError::connector(format!("malformed discovery response: {e}")))?;

        let mut endpoints = Vec::new();
        if let Some(entries) = body.as_array() {
            for entry in entries {
                if entry.get("bpnl").and_then(Value::as_str) != Some(partner_bpn) {
                    continue;
                }
                if let Some(urls) = entry.get("connectorEndpoint").and_then(Value::as_array) {
                    endpoints.extend(urls.iter().filter_map(Value::as_str).map(str::to_owned));
                }
            }
        }
        Ok(endpoints)
    }

    async fn fetch_catalog(
        &self,
        partner_bpn: &str,
        connector_url: &str,
        filter: &CatalogFilter,
    ) -> Result<Vec<Dataset>, ConsumerError> {
        let request = json!({
            "@context": {"@vocab": "https://w3id.org/edc/v0.0.1/ns/"},
            "@type": "CatalogRequest",
            "counterPartyAddress": connector_url,
            "counterPartyId": partner_bpn,
            "protocol": "dataspace-protocol-http",
            "querySpec": {
                "filterExpression": [{
                    "operandLeft": filter.key,
                    "operator": filter.operator,
                    "operandRight": filter.value,
                }]
            }
        });
        let catalog = self.post_management("/v3/catalog/request", request).await?;

        let datasets = match catalog.get("dcat:dataset") {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(single) => vec![single],
            None => Vec::new(),
        };
        Ok(datasets
            .into_iter()
            .filter_map(Self::parse_dataset)
            .collect())
    }

    async fn negotiate(
        &self,
        partner_bpn: &str,
        connector_url: &str,
        asset_id: &str,
        policies: &[OdrlPolicy],
    ) -> Result<EndpointAccess, ConsumerError> {
        // Fetch the asset's offer and keep only one the caller accepts.
        let offer_filter = CatalogFilter {
            key: "https://w3id.org/edc/v0.0.1/ns/id".to_owned(),
            operator: "=".to_owned(),
            value: asset_id.to_owned(),
        };
        let datasets = self
            .fetch_catalog(partner_bpn, connector_url, &offer_filter)
            .await?;
        let offered = datasets
            .iter()
            .find(|d| d.asset_id == asset_id)
            .map(|d| d.policies.as_slice())
            .unwrap_or_default();
        let offer = offered
            .iter()
            .find(|candidate| {
                policies
                    .iter()
                    .any(|accepted| governance::policy_matches(candidate, accepted))
            })
            .ok_or_else(|| {
                ConsumerError::connector(format!(
                    "no compatible usage policy offered for asset {asset_id}"
                ))
            })?;

        let request = json!({
            "@context": {"@vocab": "https://w3id.org/edc/v0.0.1/ns/"},
            "@type": "ContractRequest",
            "counterPartyAddress": connector_url,
            "counterPartyId": partner_bpn,
            "protocol": "dataspace-protocol-http",
            "policy": serde_json::to_value(offer)
                .map_err(|e| ConsumerError::connector(format!("unencodable policy: {e}")))?,
            "assetId": asset_id,
        });
        let edr = self.post_management("/v3/edrs", request).await?;
        let negotiation_id = edr
            .get("@id")
            .and_then(Value::as_str)
            .ok_or_else(|| ConsumerError::connector("negotiation returned no id"))?;

        let address = self
            .client
            .get(self.management(&format!("/v3/edrs/{negotiation_id}/dataaddress")))
            .header("X-Api-Key", self.config.management_api_key.as_str())
            .send()
            .await
            .map_err(|e| ConsumerError::connector(format!("EDR retrieval failed: {e}")))?
            .json::<Value>()
            .await
            .map_err(|e| ConsumerError::connector(format!("malformed EDR response: {e}")))?;

        let data_plane_url = address
            .get("endpoint")
            .and_then(Value::as_str)
            .ok_or_else(|| ConsumerError::connector("EDR carries no endpoint"))?
            .to_owned();
        let access_token = address
            .get("authorization")
            .and_then(Value::as_str)
            .ok_or_else(|| ConsumerError::connector("EDR carries no authorization token"))?
            .to_owned();

        Ok(EndpointAccess {
            data_plane_url,
            access_token,
        })
    }

    async fn fetch_data(&self, url: &str, access_token: &str) -> Result<Value, ConsumerError> {
        let response = self
            .client
            .get(url)
            .header("Authorization", access_token)
            .send()
            .await
            .map_err(|e| ConsumerError::connector(format!("data fetch failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConsumerError::connector(format!(
                "data plane answered {status} for {url}"
            )));
        }
        response
            .json()
            .await
            .map_err(|e| ConsumerError::connector(format!("malformed data response: {e}")))
    }
}
