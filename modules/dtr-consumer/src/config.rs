//! Consumer module configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration of the discovery manager.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsumerConfig {
    /// Minutes a cached registry entry stays valid.
    pub cache_expiration_min: u64,
    /// Upper bound on concurrent asset negotiations within one call.
    pub negotiation_concurrency: usize,
    /// Upper bound on concurrent shell-descriptor fetches per registry.
    pub fetch_concurrency: usize,
    /// Catalog property key identifying the asset type.
    pub registry_type_key: String,
    /// Comparison operator of the registry type filter.
    pub registry_type_operator: String,
    /// Asset type marking a dataset as a digital twin registry.
    pub registry_type: String,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            cache_expiration_min: 60,
            negotiation_concurrency: 10,
            fetch_concurrency: 20,
            registry_type_key: "'http://purl.org/dc/terms/type'.'@id'".to_owned(),
            registry_type_operator: "=".to_owned(),
            registry_type: "https://w3id.org/catenax/taxonomy#DigitalTwinRegistry".to_owned(),
        }
    }
}

impl ConsumerConfig {
    /// Cache expiration window as a duration.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_expiration_min * 60)
    }
}
