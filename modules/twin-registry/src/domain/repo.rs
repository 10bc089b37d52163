//! Repository trait implemented by the host's storage layer.
//!
//! The facade treats the four part-type collections as independent,
//! timestamp-indexed sources. Finders return fully populated aggregates
//! (part variant, aspects with registrations, shell registrations) so the
//! assembler never issues secondary loads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dtr_paging::CursorSource;
use uuid::Uuid;

use super::error::DomainError;
use super::model::{StackId, Twin};

/// Filter set applied to one part-type finder call. Fields that do not
/// apply to the queried collection are ignored by the implementation.
#[derive(Clone, Debug, Default)]
pub struct PartTwinFilter {
    /// Restrict to twins registered against this enablement stack.
    pub stack_id: Option<StackId>,
    /// Restrict by shell-level DTR registration state.
    pub dtr_registered: Option<bool>,
    /// Restrict to twins whose part is shared with this partner.
    pub partner_bpn: Option<String>,
    pub global_id: Option<Uuid>,
    pub manufacturer_id: Option<String>,
    pub manufacturer_part_id: Option<String>,
    pub customer_part_id: Option<String>,
    pub part_instance_id: Option<String>,
    pub van: Option<String>,
    pub batch_id: Option<String>,
    pub jis_number: Option<String>,
    pub parent_order_number: Option<String>,
    pub jis_call_date: Option<DateTime<Utc>>,
}

/// One finder call: filters plus the pagination window.
///
/// Contract: results are ordered by creation timestamp descending, contain
/// only rows with `created_at < watermark` when a watermark is set, and
/// never exceed `limit`. `limit == 0` means "none requested" and must
/// return an empty list without querying.
#[derive(Clone, Debug)]
pub struct PartTwinQuery {
    pub filter: PartTwinFilter,
    pub watermark: Option<DateTime<Utc>>,
    pub limit: usize,
}

/// Storage access for twins and their part-type collections.
#[async_trait]
pub trait TwinRepository: Send + Sync {
    /// Load one twin by its registry shell id, fully populated.
    async fn find_by_aas_id(&self, aas_id: Uuid) -> Result<Option<Twin>, DomainError>;

    /// Enumerate catalog-part twins.
    async fn find_catalog_part_twins(&self, query: &PartTwinQuery)
        -> Result<Vec<Twin>, DomainError>;

    /// Enumerate serialized-part twins.
    async fn find_serialized_part_twins(
        &self,
        query: &PartTwinQuery,
    ) -> Result<Vec<Twin>, DomainError>;

    /// Enumerate JIS-part twins.
    async fn find_jis_part_twins(&self, query: &PartTwinQuery) -> Result<Vec<Twin>, DomainError>;

    /// Enumerate batch twins.
    async fn find_batch_twins(&self, query: &PartTwinQuery) -> Result<Vec<Twin>, DomainError>;

    /// Dispatch a finder call by cursor source.
    async fn find_part_twins(
        &self,
        source: CursorSource,
        query: &PartTwinQuery,
    ) -> Result<Vec<Twin>, DomainError> {
        match source {
            CursorSource::CatalogPart => self.find_catalog_part_twins(query).await,
            CursorSource::SerializedPart => self.find_serialized_part_twins(query).await,
            CursorSource::JisPart => self.find_jis_part_twins(query).await,
            CursorSource::Batch => self.find_batch_twins(query).await,
        }
    }
}
