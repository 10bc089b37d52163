//! Unified pagination over the four part-type sources.
//!
//! The listing and the id lookup walk the same precedence order but page
//! differently on purpose: the listing drains at most one source per call,
//! while the lookup spends its remaining budget on the following sources
//! within the same call. Both behaviors are covered by tests; do not unify
//! them.

use aas_core::{AssetKind, AssetLink, ShellDescriptor};
use dtr_paging::{CursorSource, Page, PagingCursor, SOURCE_PRECEDENCE};
use tracing::instrument;

use crate::domain::error::DomainError;
use crate::domain::model::{StackId, Twin};
use crate::domain::query::AssetLinkQuery;
use crate::domain::repo::{PartTwinFilter, PartTwinQuery};

use super::{AssembleOptions, DtrFacadeService, ASSET_TYPE};

/// Parameters of the shell descriptor listing.
#[derive(Clone, Debug, Default)]
pub struct ShellListingRequest {
    /// Requesting partner; scopes both the query and the assembled output.
    pub partner_bpn: Option<String>,
    /// `Type` restricts to the catalog source, `Instance` to the three
    /// instance-level sources.
    pub asset_kind: Option<AssetKind>,
    /// Anything other than the registry's fixed asset type yields an empty
    /// result.
    pub asset_type: Option<String>,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

impl DtrFacadeService {
    /// List shell descriptors across the part-type sources.
    ///
    /// Each call drains at most one source. When the page fills, a
    /// same-source cursor is handed out; when the active source is
    /// exhausted, the cursor advances to the next source without querying
    /// it in the same call.
    ///
    /// # Errors
    /// Propagates repository failures and descriptor assembly errors. An
    /// unparseable cursor is not an error; it degrades to an empty page.
    #[instrument(skip(self, request), fields(partner = ?request.partner_bpn))]
    pub async fn get_all_shell_descriptors(
        &self,
        stack_id: StackId,
        request: &ShellListingRequest,
    ) -> Result<Page<ShellDescriptor>, DomainError> {
        if request.asset_type.as_deref().is_some_and(|t| t != ASSET_TYPE) {
            return Ok(Page::empty());
        }

        let Ok(cursor) = parse_cursor(request.cursor.as_deref()) else {
            tracing::debug!("unparseable listing cursor, returning empty page");
            return Ok(Page::empty());
        };

        let enabled: Vec<CursorSource> = SOURCE_PRECEDENCE
            .iter()
            .copied()
            .filter(|s| kind_allows(request.asset_kind, *s))
            .collect();

        let (active, watermark) = match &cursor {
            Some(c) => {
                if !enabled.contains(&c.source) {
                    return Ok(Page::empty());
                }
                (c.source, c.watermark)
            }
            None => match enabled.first() {
                Some(first) => (*first, None),
                None => return Ok(Page::empty()),
            },
        };

        let limit = request
            .limit
            .unwrap_or(self.config().default_page_size)
            .max(1);
        let query = PartTwinQuery {
            filter: PartTwinFilter {
                stack_id: Some(stack_id),
                dtr_registered: Some(true),
                partner_bpn: request.partner_bpn.clone(),
                ..PartTwinFilter::default()
            },
            watermark,
            limit,
        };
        let twins = self.repo().find_part_twins(active, &query).await?;

        let mut items = Vec::with_capacity(twins.len());
        for twin in &twins {
            let mut shell = self.assemble_shell(
                twin,
                stack_id,
                request.partner_bpn.as_deref(),
                &AssembleOptions::descriptor(),
            )?;
            shell.asset_type = Some(ASSET_TYPE.to_owned());
            items.push(shell);
        }

        let next_cursor = if twins.len() >= limit {
            let cursor = PagingCursor::new(active, twins.last().map(|t| t.created_at));
            Some(encode_cursor(&cursor)?)
        } else {
            next_enabled(&enabled, active)
                .map(|source| encode_cursor(&PagingCursor::new(source, None)))
                .transpose()?
        };

        tracing::debug!(
            source = ?active,
            emitted = items.len(),
            has_more = next_cursor.is_some(),
            "listed shell descriptors"
        );
        Ok(Page::new(items, next_cursor))
    }

    /// Look up shell ids matching an asset-link query.
    ///
    /// Search parameters arrive as base64url tokens; an unparseable entry
    /// is a validation error. A lookup without recognized parameters, or
    /// with an unknown parameter name, returns an empty result without
    /// touching storage.
    ///
    /// Unlike the listing, the lookup falls through: when a source is
    /// exhausted, the remaining budget is spent on the following sources in
    /// the same call. A one-row lookahead keeps an exactly full final page
    /// from minting a dangling cursor.
    ///
    /// # Errors
    /// `Validation` for broken parameter tokens or malformed values;
    /// repository failures are propagated.
    #[instrument(skip(self, encoded_params), fields(partner = ?partner_bpn))]
    pub async fn lookup_shell_ids(
        &self,
        stack_id: StackId,
        encoded_params: &[String],
        partner_bpn: Option<&str>,
        limit: Option<usize>,
        cursor: Option<&str>,
    ) -> Result<Page<String>, DomainError> {
        let params = AssetLink::decode_all(encoded_params.iter().map(String::as_str))
            .map_err(|e| DomainError::validation(format!("invalid search parameter: {e}")))?;

        let Some(query) = AssetLinkQuery::from_params(&params)? else {
            return Ok(Page::empty());
        };

        let Ok(cursor) = parse_cursor(cursor) else {
            tracing::debug!("unparseable lookup cursor, returning empty page");
            return Ok(Page::empty());
        };

        let sources: Vec<CursorSource> = SOURCE_PRECEDENCE
            .iter()
            .copied()
            .filter(|s| query.searches(*s))
            .collect();

        let start = match &cursor {
            Some(c) => match sources.iter().position(|s| *s == c.source) {
                Some(idx) => idx,
                // Cursor minted against a differently narrowed enumeration.
                None => return Ok(Page::empty()),
            },
            None => 0,
        };

        let limit = limit.unwrap_or(self.config().default_page_size).max(1);
        let mut remaining = limit;
        let mut watermark = cursor.and_then(|c| c.watermark);
        let filter = lookup_filter(stack_id, partner_bpn, &query);
        let mut ids: Vec<String> = Vec::new();

        for source in &sources[start..] {
            let source_query = PartTwinQuery {
                filter: filter.clone(),
                watermark: watermark.take(),
                limit: remaining + 1,
            };
            let twins = self.repo().find_part_twins(*source, &source_query).await?;

            let emit = twins.len().min(remaining);
            ids.extend(twins.iter().take(emit).map(Twin::aas_urn));

            if twins.len() > remaining {
                let resume_at = emit
                    .checked_sub(1)
                    .and_then(|idx| twins.get(idx))
                    .map(|t| t.created_at);
                let cursor = PagingCursor::new(*source, resume_at);
                return Ok(Page::new(ids, Some(encode_cursor(&cursor)?)));
            }
            remaining -= emit;
        }

        tracing::debug!(matches = ids.len(), "asset link lookup complete");
        Ok(Page::new(ids, None))
    }
}

fn lookup_filter(
    stack_id: StackId,
    partner_bpn: Option<&str>,
    query: &AssetLinkQuery,
) -> PartTwinFilter {
    PartTwinFilter {
        stack_id: Some(stack_id),
        dtr_registered: None,
        partner_bpn: partner_bpn.map(str::to_owned),
        global_id: query.global_id,
        manufacturer_id: query.manufacturer_id.clone(),
        manufacturer_part_id: query.manufacturer_part_id.clone(),
        customer_part_id: query.customer_part_id.clone(),
        part_instance_id: query.part_instance_id.clone(),
        van: query.van.clone(),
        batch_id: query.batch_id.clone(),
        jis_number: query.jis_number.clone(),
        parent_order_number: query.parent_order_number.clone(),
        jis_call_date: query.jis_call_date,
    }
}

fn parse_cursor(raw: Option<&str>) -> Result<Option<PagingCursor>, dtr_paging::Error> {
    raw.map(PagingCursor::decode).transpose()
}

fn encode_cursor(cursor: &PagingCursor) -> Result<String, DomainError> {
    cursor
        .encode()
        .map_err(|e| DomainError::Repository(e.into()))
}

fn kind_allows(kind: Option<AssetKind>, source: CursorSource) -> bool {
    match kind {
        None => true,
        Some(AssetKind::Type) => source == CursorSource::CatalogPart,
        Some(AssetKind::Instance) => source != CursorSource::CatalogPart,
    }
}

fn next_enabled(enabled: &[CursorSource], active: CursorSource) -> Option<CursorSource> {
    let idx = enabled.iter().position(|s| *s == active)?;
    enabled.get(idx + 1).copied()
}
