//! Asset-link query parsing and source narrowing.

use aas_core::AssetLink;
use chrono::{DateTime, Utc};
use dtr_paging::CursorSource;
use uuid::Uuid;

use super::error::DomainError;

/// Parsed lookup-by-asset-link query.
///
/// Presence of a type-specific key disables the sources it cannot apply to,
/// so e.g. a `batchId` query only ever touches the batch collection.
#[derive(Clone, Debug, Default)]
pub struct AssetLinkQuery {
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

    search_catalog_parts: bool,
    search_serialized_parts: bool,
    search_batches: bool,
    search_jis_parts: bool,
}

impl AssetLinkQuery {
    /// Build a query from decoded search parameters.
    ///
    /// Returns `Ok(None)` when the parameter list is empty or contains an
    /// unrecognized name; both short-circuit the whole lookup to an empty
    /// result without touching storage.
    ///
    /// # Errors
    /// Returns a validation error for recognized keys carrying structurally
    /// invalid values (malformed UUID or timestamp).
    pub fn from_params(params: &[AssetLink]) -> Result<Option<Self>, DomainError> {
        if params.is_empty() {
            return Ok(None);
        }

        let mut query = Self {
            search_catalog_parts: true,
            search_serialized_parts: true,
            search_batches: true,
            search_jis_parts: true,
            ..Self::default()
        };

        for param in params {
            match param.name.as_str() {
                "globalAssetId" => {
                    let value = param.value.trim_start_matches("urn:uuid:");
                    let id = Uuid::parse_str(value).map_err(|_| {
                        DomainError::validation(format!(
                            "globalAssetId is not a UUID: '{}'",
                            param.value
                        ))
                    })?;
                    query.global_id = Some(id);
                }
                "manufacturerId" => query.manufacturer_id = Some(param.value.clone()),
                "manufacturerPartId" => query.manufacturer_part_id = Some(param.value.clone()),
                "customerPartId" => query.customer_part_id = Some(param.value.clone()),
                "batchId" => {
                    query.search_catalog_parts = false;
                    query.search_serialized_parts = false;
                    query.search_jis_parts = false;
                    query.batch_id = Some(param.value.clone());
                }
                "partInstanceId" => {
                    query.search_catalog_parts = false;
                    query.search_batches = false;
                    query.search_jis_parts = false;
                    query.part_instance_id = Some(param.value.clone());
                }
                "van" => {
                    query.search_catalog_parts = false;
                    query.search_batches = false;
                    query.search_jis_parts = false;
                    query.van = Some(param.value.clone());
                }
                "jisNumber" => {
                    query.search_catalog_parts = false;
                    query.search_serialized_parts = false;
                    query.search_batches = false;
                    query.jis_number = Some(param.value.clone());
                }
                "parentOrderNumber" => {
                    query.search_catalog_parts = false;
                    query.search_serialized_parts = false;
                    query.search_batches = false;
                    query.parent_order_number = Some(param.value.clone());
                }
                "jisCallDate" => {
                    query.search_catalog_parts = false;
                    query.search_serialized_parts = false;
                    query.search_batches = false;
                    let date = DateTime::parse_from_rfc3339(&param.value).map_err(|_| {
                        DomainError::validation(format!(
                            "jisCallDate is not an RFC 3339 timestamp: '{}'",
                            param.value
                        ))
                    })?;
                    query.jis_call_date = Some(date.with_timezone(&Utc));
                }
                unknown => {
                    tracing::debug!(name = unknown, "unknown search parameter, rejecting lookup");
                    return Ok(None);
                }
            }
        }

        Ok(Some(query))
    }

    /// Whether the given source is still searchable under this query.
    #[must_use]
    pub fn searches(&self, source: CursorSource) -> bool {
        match source {
            CursorSource::CatalogPart => self.search_catalog_parts,
            CursorSource::SerializedPart => self.search_serialized_parts,
            CursorSource::Batch => self.search_batches,
            CursorSource::JisPart => self.search_jis_parts,
        }
    }
}
