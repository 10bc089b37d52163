//! Domain service of the registry facade.
//!
//! Single-shell operations live here; the paged listing and asset-link
//! lookup engines are in [`lookup`], descriptor assembly in [`descriptors`].

mod descriptors;
mod lookup;

use std::sync::Arc;

use aas_core::{ShellDescriptor, SpecificAssetId, SubmodelDescriptor};
use dtr_paging::Page;
use tracing::instrument;
use uuid::Uuid;

use crate::config::FacadeConfig;

use super::error::DomainError;
use super::model::{StackId, Twin};
use super::repo::TwinRepository;

pub use descriptors::AssembleOptions;
pub use lookup::ShellListingRequest;

/// The fixed asset type advertised by this registry.
pub const ASSET_TYPE: &str = "AssetType";

/// Facade over the partitioned twin store, presenting it as one registry.
pub struct DtrFacadeService {
    repo: Arc<dyn TwinRepository>,
    config: FacadeConfig,
}

impl DtrFacadeService {
    pub fn new(repo: Arc<dyn TwinRepository>, config: FacadeConfig) -> Self {
        Self { repo, config }
    }

    /// Get the shell descriptor for one AAS id.
    ///
    /// # Errors
    /// `ShellNotFound` when the twin does not exist or is not registered for
    /// the stack; `NotAuthorized` when it is not shared with the partner.
    #[instrument(skip(self), fields(aas_id = %aas_id))]
    pub async fn get_shell_descriptor(
        &self,
        stack_id: StackId,
        aas_id: Uuid,
        partner_bpn: Option<&str>,
    ) -> Result<ShellDescriptor, DomainError> {
        let twin = self.load_registered_twin(stack_id, aas_id).await?;
        let mut shell =
            self.assemble_shell(&twin, stack_id, partner_bpn, &AssembleOptions::descriptor())?;
        shell.asset_type = Some(ASSET_TYPE.to_owned());
        Ok(shell)
    }

    /// Specific asset identifiers of one shell, partner-scoped like the
    /// full descriptor.
    ///
    /// # Errors
    /// Same failure modes as [`Self::get_shell_descriptor`].
    #[instrument(skip(self), fields(aas_id = %aas_id))]
    pub async fn get_asset_links(
        &self,
        stack_id: StackId,
        aas_id: Uuid,
        partner_bpn: Option<&str>,
    ) -> Result<Vec<SpecificAssetId>, DomainError> {
        let twin = self.load_registered_twin(stack_id, aas_id).await?;
        let shell = self.assemble_shell(
            &twin,
            stack_id,
            partner_bpn,
            &AssembleOptions::asset_links_only(),
        )?;
        Ok(shell.specific_asset_ids.unwrap_or_default())
    }

    /// Get one submodel descriptor by its id, without scanning the full
    /// aspect list.
    ///
    /// # Errors
    /// `SubmodelNotFound` when the aspect is absent or not registered for
    /// the stack; shell-level failures as in [`Self::get_shell_descriptor`].
    #[instrument(skip(self), fields(aas_id = %aas_id, submodel_id = %submodel_id))]
    pub async fn get_submodel_descriptor(
        &self,
        stack_id: StackId,
        aas_id: Uuid,
        submodel_id: Uuid,
        partner_bpn: Option<&str>,
    ) -> Result<SubmodelDescriptor, DomainError> {
        let twin = self.load_registered_twin(stack_id, aas_id).await?;
        let shell = self.assemble_shell(
            &twin,
            stack_id,
            partner_bpn,
            &AssembleOptions::explicit_submodel(submodel_id),
        )?;
        shell
            .submodel_descriptors
            .and_then(|mut descriptors| {
                if descriptors.is_empty() {
                    None
                } else {
                    Some(descriptors.remove(0))
                }
            })
            .ok_or_else(|| DomainError::submodel_not_found(submodel_id))
    }

    /// All submodel descriptors of one shell, paged over the assembled list
    /// with a plain integer offset cursor.
    ///
    /// An unparseable or out-of-range cursor yields an empty page rather
    /// than an error.
    ///
    /// # Errors
    /// Shell-level failures as in [`Self::get_shell_descriptor`].
    #[instrument(skip(self), fields(aas_id = %aas_id))]
    pub async fn get_submodel_descriptors(
        &self,
        stack_id: StackId,
        aas_id: Uuid,
        partner_bpn: Option<&str>,
        limit: Option<usize>,
        cursor: Option<&str>,
    ) -> Result<Page<SubmodelDescriptor>, DomainError> {
        let twin = self.load_registered_twin(stack_id, aas_id).await?;
        let shell = self.assemble_shell(
            &twin,
            stack_id,
            partner_bpn,
            &AssembleOptions::submodels_only(),
        )?;

        let descriptors = shell.submodel_descriptors.unwrap_or_default();
        if descriptors.is_empty() {
            return Ok(Page::empty());
        }

        let start = match cursor {
            Some(raw) => match raw.parse::<usize>() {
                Ok(start) if start <= descriptors.len() => start,
                _ => return Ok(Page::empty()),
            },
            None => 0,
        };

        let end = limit.map_or(descriptors.len(), |l| {
            start.saturating_add(l).min(descriptors.len())
        });
        let next_cursor = (end < descriptors.len()).then(|| end.to_string());
        let items = descriptors[start..end].to_vec();
        Ok(Page::new(items, next_cursor))
    }

    fn config(&self) -> &FacadeConfig {
        &self.config
    }

    fn repo(&self) -> &dyn TwinRepository {
        self.repo.as_ref()
    }

    async fn load_registered_twin(
        &self,
        stack_id: StackId,
        aas_id: Uuid,
    ) -> Result<Twin, DomainError> {
        let twin = self.repo.find_by_aas_id(aas_id).await?;
        twin.filter(|t| t.registered_for(stack_id))
            .ok_or_else(|| DomainError::shell_not_found(aas_id))
    }
}
