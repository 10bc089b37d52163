//! Shell descriptor assembly with partner visibility enforcement.

use aas_core::{
    AssetKind, Endpoint, ProtocolInformation, Reference, SecurityAttribute, ShellDescriptor,
    SpecificAssetId, SubmodelDescriptor, SubprotocolBody, PUBLIC_READABLE, SUBMODEL_INTERFACE,
};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::model::{InstancePart, PartVariant, PartnerMapping, StackId, Twin, TwinAspect};

use super::DtrFacadeService;

/// What to include when assembling a descriptor.
#[derive(Clone, Debug, Default)]
pub struct AssembleOptions {
    pub include_specific_asset_ids: bool,
    pub include_submodels: bool,
    /// Include exactly this submodel; absence or missing registration is a
    /// not-found failure instead of an empty list.
    pub explicit_submodel: Option<Uuid>,
}

impl AssembleOptions {
    /// Full descriptor: specific asset ids plus all registered submodels.
    #[must_use]
    pub fn descriptor() -> Self {
        Self {
            include_specific_asset_ids: true,
            include_submodels: true,
            explicit_submodel: None,
        }
    }

    #[must_use]
    pub fn asset_links_only() -> Self {
        Self {
            include_specific_asset_ids: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn submodels_only() -> Self {
        Self {
            include_submodels: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn explicit_submodel(submodel_id: Uuid) -> Self {
        Self {
            explicit_submodel: Some(submodel_id),
            ..Self::default()
        }
    }
}

impl DtrFacadeService {
    /// Assemble the externally visible descriptor of one twin.
    ///
    /// Pure read over the aggregate; visibility rules:
    /// - catalog parts require a partner mapping for the requesting partner,
    /// - instance parts require the owning partner to be the requester,
    /// - submodels appear only when DTR-registered for the stack.
    pub(crate) fn assemble_shell(
        &self,
        twin: &Twin,
        stack_id: StackId,
        partner_bpn: Option<&str>,
        opts: &AssembleOptions,
    ) -> Result<ShellDescriptor, DomainError> {
        let mut shell = ShellDescriptor::new(twin.aas_urn());
        shell.global_asset_id = Some(twin.global_urn());

        let part = twin.part.as_ref().ok_or_else(|| {
            DomainError::validation(format!(
                "shell descriptor {} is not attached to a part",
                twin.aas_id
            ))
        })?;

        match part {
            PartVariant::Catalog(catalog) => {
                shell.asset_kind = Some(AssetKind::Type);

                let mappings: Vec<&PartnerMapping> = match partner_bpn {
                    Some(bpn) => {
                        let mapping = catalog
                            .mapping_for(bpn)
                            .ok_or_else(|| DomainError::not_authorized(twin.aas_id, bpn))?;
                        vec![mapping]
                    }
                    None => catalog.partner_mappings.iter().collect(),
                };

                if opts.include_specific_asset_ids {
                    let mut ids = vec![SpecificAssetId::scoped(
                        "manufacturerPartId",
                        &catalog.manufacturer_part_id,
                        PUBLIC_READABLE,
                    )];
                    for mapping in mappings {
                        ids.push(SpecificAssetId::scoped(
                            "digitalTwinType",
                            "PartType",
                            &mapping.partner_bpn,
                        ));
                        ids.push(SpecificAssetId::scoped(
                            "manufacturerId",
                            &catalog.manufacturer_id,
                            &mapping.partner_bpn,
                        ));
                        ids.push(SpecificAssetId::scoped(
                            "customerPartId",
                            &mapping.customer_part_id,
                            &mapping.partner_bpn,
                        ));
                    }
                    shell.specific_asset_ids = Some(ids);
                }
            }
            PartVariant::Serialized(serialized) => {
                shell.asset_kind = Some(AssetKind::Instance);
                let mut ids =
                    instance_asset_ids(twin, &serialized.base, partner_bpn, opts)?;
                if let Some(ids) = ids.as_mut() {
                    let owner = &serialized.base.partner.partner_bpn;
                    ids.push(SpecificAssetId::scoped(
                        "partInstanceId",
                        &serialized.part_instance_id,
                        owner,
                    ));
                    if let Some(van) = &serialized.van {
                        ids.push(SpecificAssetId::scoped("van", van, owner));
                    }
                }
                shell.specific_asset_ids = ids;
            }
            PartVariant::Batch(batch) => {
                shell.asset_kind = Some(AssetKind::Instance);
                let mut ids = instance_asset_ids(twin, &batch.base, partner_bpn, opts)?;
                if let Some(ids) = ids.as_mut() {
                    ids.push(SpecificAssetId::scoped(
                        "batchId",
                        &batch.batch_id,
                        &batch.base.partner.partner_bpn,
                    ));
                }
                shell.specific_asset_ids = ids;
            }
            PartVariant::Jis(jis) => {
                shell.asset_kind = Some(AssetKind::Instance);
                let mut ids = instance_asset_ids(twin, &jis.base, partner_bpn, opts)?;
                if let Some(ids) = ids.as_mut() {
                    ids.push(SpecificAssetId::scoped(
                        "jisNumber",
                        &jis.jis_number,
                        &jis.base.partner.partner_bpn,
                    ));
                }
                shell.specific_asset_ids = ids;
            }
        }

        let mut submodels = Vec::new();
        if let Some(submodel_id) = opts.explicit_submodel {
            let aspect = twin
                .aspects
                .iter()
                .find(|a| a.submodel_id == submodel_id)
                .filter(|a| a.exposed_for(stack_id))
                .ok_or_else(|| DomainError::submodel_not_found(submodel_id))?;
            submodels.push(self.submodel_descriptor(twin, aspect));
        } else if opts.include_submodels {
            submodels.extend(
                twin.aspects
                    .iter()
                    .filter(|a| a.exposed_for(stack_id))
                    .map(|a| self.submodel_descriptor(twin, a)),
            );
        }
        if !submodels.is_empty() {
            shell.submodel_descriptors = Some(submodels);
        }

        Ok(shell)
    }

    fn submodel_descriptor(&self, twin: &Twin, aspect: &TwinAspect) -> SubmodelDescriptor {
        let config = self.config();
        let body = SubprotocolBody {
            asset_id: submodel_asset_id(twin, aspect),
            dsp_endpoint: config.control_plane_url.clone(),
        };

        let endpoint = Endpoint {
            interface: SUBMODEL_INTERFACE.to_owned(),
            protocol_information: ProtocolInformation {
                href: format!(
                    "{}/api/public/{}/submodel",
                    config.data_plane_url, twin.global_id
                ),
                endpoint_protocol: Some("HTTP".to_owned()),
                endpoint_protocol_version: Some(vec!["1.1".to_owned()]),
                subprotocol: Some("DSP".to_owned()),
                subprotocol_body: Some(body.to_string()),
                subprotocol_body_encoding: Some("plain".to_owned()),
                security_attributes: Some(vec![SecurityAttribute::none()]),
            },
        };

        SubmodelDescriptor {
            id: format!("urn:uuid:{}", aspect.submodel_id),
            id_short: id_short_of(&aspect.semantic_id),
            semantic_id: Some(Reference::external(&aspect.semantic_id)),
            endpoints: vec![endpoint],
        }
    }
}

/// The common specific-asset-id block of the instance-level variants, after
/// the owning-partner visibility check.
fn instance_asset_ids(
    twin: &Twin,
    base: &InstancePart,
    partner_bpn: Option<&str>,
    opts: &AssembleOptions,
) -> Result<Option<Vec<SpecificAssetId>>, DomainError> {
    if let Some(bpn) = partner_bpn {
        if base.partner.partner_bpn != bpn {
            return Err(DomainError::not_authorized(twin.aas_id, bpn));
        }
    }

    if !opts.include_specific_asset_ids {
        return Ok(None);
    }

    let owner = &base.partner.partner_bpn;
    Ok(Some(vec![
        SpecificAssetId::scoped(
            "manufacturerPartId",
            &base.manufacturer_part_id,
            PUBLIC_READABLE,
        ),
        SpecificAssetId::scoped("digitalTwinType", "PartInstance", owner),
        SpecificAssetId::scoped("manufacturerId", &base.manufacturer_id, owner),
        SpecificAssetId::scoped("customerPartId", &base.partner.customer_part_id, owner),
    ]))
}

/// Submodel asset id as registered with the connector, derived from the twin
/// and aspect identities.
fn submodel_asset_id(twin: &Twin, aspect: &TwinAspect) -> String {
    format!("{}-{}", twin.global_id, aspect.submodel_id)
}

/// `idShort` derived from the semantic id fragment, lower-camel-cased.
fn id_short_of(semantic_id: &str) -> Option<String> {
    let fragment = semantic_id.rsplit_once('#')?.1;
    let mut chars = fragment.chars();
    let first = chars.next()?;
    Some(first.to_lowercase().chain(chars).collect())
}
