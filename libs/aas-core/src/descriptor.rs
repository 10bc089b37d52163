//! Shell and submodel descriptor types.
//!
//! Field names follow the AAS v3 registry JSON shapes; optional collections
//! are skipped entirely when empty so emitted descriptors stay minimal.

use serde::{Deserialize, Serialize};

/// Endpoint interface tag for submodel access over the dataspace protocol.
pub const SUBMODEL_INTERFACE: &str = "SUBMODEL-3.0";

/// Whether a shell describes a part type or a concrete part instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    #[serde(rename = "Type")]
    Type,
    #[serde(rename = "Instance")]
    Instance,
}

/// Reference to an external identifier, e.g. the subject a specific asset id
/// is visible to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "type")]
    pub reference_type: String,
    pub keys: Vec<ReferenceKey>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub value: String,
}

impl Reference {
    /// An `ExternalReference` carrying one `GlobalReference` key.
    pub fn external(value: impl Into<String>) -> Self {
        Self {
            reference_type: "ExternalReference".to_owned(),
            keys: vec![ReferenceKey {
                key_type: "GlobalReference".to_owned(),
                value: value.into(),
            }],
        }
    }

    /// Value of the first key, if any.
    #[must_use]
    pub fn first_key_value(&self) -> Option<&str> {
        self.keys.first().map(|k| k.value.as_str())
    }
}

/// Discoverable identifier of a shell, optionally scoped to one subject.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificAssetId {
    pub name: String,
    pub value: String,
    #[serde(rename = "externalSubjectId", skip_serializing_if = "Option::is_none")]
    pub external_subject_id: Option<Reference>,
}

impl SpecificAssetId {
    /// An asset id visible only to the given subject (a BPN or the
    /// public-readable wildcard).
    pub fn scoped(
        name: impl Into<String>,
        value: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            external_subject_id: Some(Reference::external(subject)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityAttribute {
    #[serde(rename = "type")]
    pub attribute_type: String,
    pub key: String,
    pub value: String,
}

impl SecurityAttribute {
    /// The placeholder attribute used when no transport security is declared.
    #[must_use]
    pub fn none() -> Self {
        Self {
            attribute_type: "NONE".to_owned(),
            key: "NONE".to_owned(),
            value: "NONE".to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolInformation {
    pub href: String,
    #[serde(rename = "endpointProtocol", skip_serializing_if = "Option::is_none")]
    pub endpoint_protocol: Option<String>,
    #[serde(
        rename = "endpointProtocolVersion",
        skip_serializing_if = "Option::is_none"
    )]
    pub endpoint_protocol_version: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subprotocol: Option<String>,
    #[serde(rename = "subprotocolBody", skip_serializing_if = "Option::is_none")]
    pub subprotocol_body: Option<String>,
    #[serde(
        rename = "subprotocolBodyEncoding",
        skip_serializing_if = "Option::is_none"
    )]
    pub subprotocol_body_encoding: Option<String>,
    #[serde(rename = "securityAttributes", skip_serializing_if = "Option::is_none")]
    pub security_attributes: Option<Vec<SecurityAttribute>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub interface: String,
    #[serde(rename = "protocolInformation")]
    pub protocol_information: ProtocolInformation,
}

/// The `id=<asset>;dspEndpoint=<url>` body carried in a submodel endpoint's
/// subprotocol information.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubprotocolBody {
    pub asset_id: String,
    pub dsp_endpoint: String,
}

impl SubprotocolBody {
    /// Parse a `key=value;key=value` body. Returns `None` when either the
    /// asset id or the DSP endpoint is missing.
    #[must_use]
    pub fn parse(body: &str) -> Option<Self> {
        let mut asset_id = None;
        let mut dsp_endpoint = None;
        for part in body.split(';') {
            if let Some((key, value)) = part.split_once('=') {
                match key {
                    "id" => asset_id = Some(value.to_owned()),
                    "dspEndpoint" => dsp_endpoint = Some(value.to_owned()),
                    _ => {}
                }
            }
        }
        Some(Self {
            asset_id: asset_id?,
            dsp_endpoint: dsp_endpoint?,
        })
    }
}

impl std::fmt::Display for SubprotocolBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "id={};dspEndpoint={}", self.asset_id, self.dsp_endpoint)
    }
}

/// Metadata plus access endpoint for one structured data aspect of a twin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmodelDescriptor {
    pub id: String,
    #[serde(rename = "idShort", skip_serializing_if = "Option::is_none")]
    pub id_short: Option<String>,
    #[serde(rename = "semanticId", skip_serializing_if = "Option::is_none")]
    pub semantic_id: Option<Reference>,
    pub endpoints: Vec<Endpoint>,
}

impl SubmodelDescriptor {
    /// Primary semantic id value (the first key of the semantic reference).
    #[must_use]
    pub fn semantic_id_value(&self) -> Option<&str> {
        self.semantic_id.as_ref().and_then(Reference::first_key_value)
    }

    /// All semantic id keys as `(type, value)` pairs.
    #[must_use]
    pub fn semantic_id_keys(&self) -> Vec<(&str, &str)> {
        self.semantic_id
            .as_ref()
            .map(|r| {
                r.keys
                    .iter()
                    .map(|k| (k.key_type.as_str(), k.value.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Dataspace access coordinates of the `SUBMODEL-3.0` endpoint: the
    /// underlying asset id, the DSP endpoint of the providing connector and
    /// the data-plane href.
    #[must_use]
    pub fn dataspace_endpoint(&self) -> Option<(SubprotocolBody, String)> {
        let endpoint = self
            .endpoints
            .iter()
            .find(|e| e.interface.contains(SUBMODEL_INTERFACE))?;
        let info = &endpoint.protocol_information;
        let body = SubprotocolBody::parse(info.subprotocol_body.as_deref()?)?;
        Some((body, info.href.clone()))
    }
}

/// The externally exposed representation of a twin in registry lookups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellDescriptor {
    pub id: String,
    #[serde(rename = "globalAssetId", skip_serializing_if = "Option::is_none")]
    pub global_asset_id: Option<String>,
    #[serde(rename = "assetKind", skip_serializing_if = "Option::is_none")]
    pub asset_kind: Option<AssetKind>,
    #[serde(rename = "assetType", skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    #[serde(rename = "specificAssetIds", skip_serializing_if = "Option::is_none")]
    pub specific_asset_ids: Option<Vec<SpecificAssetId>>,
    #[serde(
        rename = "submodelDescriptors",
        skip_serializing_if = "Option::is_none"
    )]
    pub submodel_descriptors: Option<Vec<SubmodelDescriptor>>,
}

impl ShellDescriptor {
    /// A bare descriptor carrying only the shell id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            global_asset_id: None,
            asset_kind: None,
            asset_type: None,
            specific_asset_ids: None,
            submodel_descriptors: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subprotocol_body_round_trips() {
        let body = SubprotocolBody {
            asset_id: "urn:uuid:0af5e5d4".to_owned(),
            dsp_endpoint: "https://edc.example.com/api/v1/dsp".to_owned(),
        };
        let parsed = SubprotocolBody::parse(&body.to_string()).unwrap();
        assert_eq!(parsed, body);
    }

    #[test]
    fn subprotocol_body_rejects_missing_fields() {
        assert!(SubprotocolBody::parse("id=only-an-asset").is_none());
        assert!(SubprotocolBody::parse("no separators at all").is_none());
    }

    #[test]
    fn dataspace_endpoint_reads_submodel_interface() {
        let descriptor = SubmodelDescriptor {
            id: "sm-1".to_owned(),
            id_short: Some("partTypeInformation".to_owned()),
            semantic_id: Some(Reference::external("urn:samm:example:1.0.0#PartType")),
            endpoints: vec![Endpoint {
                interface: SUBMODEL_INTERFACE.to_owned(),
                protocol_information: ProtocolInformation {
                    href: "https://data.example.com/submodel".to_owned(),
                    endpoint_protocol: Some("HTTP".to_owned()),
                    endpoint_protocol_version: Some(vec!["1.1".to_owned()]),
                    subprotocol: Some("DSP".to_owned()),
                    subprotocol_body: Some(
                        "id=asset-1;dspEndpoint=https://edc.example.com".to_owned(),
                    ),
                    subprotocol_body_encoding: Some("plain".to_owned()),
                    security_attributes: Some(vec![SecurityAttribute::none()]),
                },
            }],
        };

        let (body, href) = descriptor.dataspace_endpoint().unwrap();
        assert_eq!(body.asset_id, "asset-1");
        assert_eq!(body.dsp_endpoint, "https://edc.example.com");
        assert_eq!(href, "https://data.example.com/submodel");
        assert_eq!(
            descriptor.semantic_id_value(),
            Some("urn:samm:example:1.0.0#PartType")
        );
    }

    #[test]
    fn shell_descriptor_serializes_camel_case() {
        let mut shell = ShellDescriptor::new("urn:uuid:1234");
        shell.asset_kind = Some(AssetKind::Instance);
        shell.specific_asset_ids = Some(vec![SpecificAssetId::scoped(
            "manufacturerPartId",
            "MPI-1",
            crate::PUBLIC_READABLE,
        )]);

        let json = serde_json::to_value(&shell).unwrap();
        assert_eq!(json["assetKind"], "Instance");
        assert_eq!(json["specificAssetIds"][0]["name"], "manufacturerPartId");
        assert_eq!(
            json["specificAssetIds"][0]["externalSubjectId"]["keys"][0]["value"],
            "PUBLIC_READABLE"
        );
        assert!(json.get("submodelDescriptors").is_none());
    }
}
