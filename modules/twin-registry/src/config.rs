//! Facade module configuration.

use serde::Deserialize;

/// Configuration of the registry facade.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FacadeConfig {
    /// DSP endpoint of the connector control plane, embedded into submodel
    /// endpoint subprotocol bodies.
    pub control_plane_url: String,
    /// Base URL of the connector data plane, embedded into submodel hrefs.
    pub data_plane_url: String,
    /// Page size applied when a request carries no explicit limit.
    pub default_page_size: usize,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            control_plane_url: "https://control.plane.url".to_owned(),
            data_plane_url: "https://data.plane.url".to_owned(),
            default_page_size: 50,
        }
    }
}
