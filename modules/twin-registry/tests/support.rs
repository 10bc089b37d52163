#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

//! Shared fixtures: an in-memory twin repository plus twin builders.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use twin_registry::config::FacadeConfig;
use twin_registry::domain::model::{
    AspectRegistration, BatchPart, CatalogPart, InstancePart, JisPart, PartVariant,
    PartnerMapping, RegistrationStatus, SerializedPart, StackId, Twin, TwinAspect,
    TwinRegistration,
};
use twin_registry::domain::repo::{PartTwinFilter, PartTwinQuery, TwinRepository};
use twin_registry::{DomainError, DtrFacadeService};
use uuid::Uuid;

pub const STACK: StackId = 1;
pub const OTHER_STACK: StackId = 2;
pub const MANUFACTURER: &str = "BPNL000000000MFR";
pub const PARTNER: &str = "BPNL00000000PRT1";
pub const OTHER_PARTNER: &str = "BPNL00000000PRT2";

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap()
}

pub fn minutes(offset: i64) -> DateTime<Utc> {
    base_time() + chrono::Duration::minutes(offset)
}

/// Builder for twin fixtures. Every twin starts DTR-registered for `STACK`
/// and shared with `PARTNER`.
pub struct TwinBuilder {
    twin: Twin,
}

impl TwinBuilder {
    fn base(created_offset: i64, part: PartVariant) -> Self {
        let created = minutes(created_offset);
        Self {
            twin: Twin {
                global_id: Uuid::new_v4(),
                aas_id: Uuid::new_v4(),
                created_at: created,
                modified_at: created,
                asset_class: None,
                additional_context: None,
                part: Some(part),
                aspects: Vec::new(),
                registrations: vec![TwinRegistration {
                    stack_id: STACK,
                    dtr_registered: true,
                }],
            },
        }
    }

    pub fn catalog(created_offset: i64, manufacturer_part_id: &str) -> Self {
        Self::base(
            created_offset,
            PartVariant::Catalog(CatalogPart {
                manufacturer_id: MANUFACTURER.to_owned(),
                manufacturer_part_id: manufacturer_part_id.to_owned(),
                partner_mappings: vec![PartnerMapping {
                    partner_bpn: PARTNER.to_owned(),
                    customer_part_id: format!("C-{manufacturer_part_id}"),
                }],
            }),
        )
    }

    fn instance(manufacturer_part_id: &str) -> InstancePart {
        InstancePart {
            manufacturer_id: MANUFACTURER.to_owned(),
            manufacturer_part_id: manufacturer_part_id.to_owned(),
            partner: PartnerMapping {
                partner_bpn: PARTNER.to_owned(),
                customer_part_id: format!("C-{manufacturer_part_id}"),
            },
        }
    }

    pub fn serialized(created_offset: i64, part_instance_id: &str) -> Self {
        Self::base(
            created_offset,
            PartVariant::Serialized(SerializedPart {
                base: Self::instance("MPI-SER"),
                part_instance_id: part_instance_id.to_owned(),
                van: None,
            }),
        )
    }

    pub fn batch(created_offset: i64, batch_id: &str) -> Self {
        Self::base(
            created_offset,
            PartVariant::Batch(BatchPart {
                base: Self::instance("MPI-BATCH"),
                batch_id: batch_id.to_owned(),
            }),
        )
    }

    pub fn jis(created_offset: i64, jis_number: &str) -> Self {
        Self::base(
            created_offset,
            PartVariant::Jis(JisPart {
                base: Self::instance("MPI-JIS"),
                jis_number: jis_number.to_owned(),
                parent_order_number: None,
                jis_call_date: None,
            }),
        )
    }

    pub fn unregistered(mut self) -> Self {
        for registration in &mut self.twin.registrations {
            registration.dtr_registered = false;
        }
        self
    }

    pub fn without_part(mut self) -> Self {
        self.twin.part = None;
        self
    }

    pub fn owned_by(mut self, bpn: &str) -> Self {
        match self.twin.part.as_mut() {
            Some(PartVariant::Catalog(catalog)) => {
                for mapping in &mut catalog.partner_mappings {
                    mapping.partner_bpn = bpn.to_owned();
                }
            }
            Some(
                PartVariant::Serialized(SerializedPart { base, .. })
                | PartVariant::Batch(BatchPart { base, .. })
                | PartVariant::Jis(JisPart { base, .. }),
            ) => {
                base.partner.partner_bpn = bpn.to_owned();
            }
            None => {}
        }
        self
    }

    pub fn no_mappings(mut self) -> Self {
        if let Some(PartVariant::Catalog(catalog)) = self.twin.part.as_mut() {
            catalog.partner_mappings.clear();
        }
        self
    }

    pub fn with_van(mut self, van: &str) -> Self {
        if let Some(PartVariant::Serialized(serialized)) = self.twin.part.as_mut() {
            serialized.van = Some(van.to_owned());
        }
        self
    }

    pub fn aspect(mut self, semantic_id: &str, status: RegistrationStatus) -> Self {
        self.twin.aspects.push(TwinAspect {
            semantic_id: semantic_id.to_owned(),
            submodel_id: Uuid::new_v4(),
            registrations: vec![AspectRegistration {
                stack_id: STACK,
                status,
            }],
        });
        self
    }

    pub fn build(self) -> Twin {
        self.twin
    }
}

/// In-memory repository honoring the finder contract: newest first,
/// `created_at < watermark`, at most `limit` rows, `limit == 0` skips.
pub struct InMemoryTwinRepository {
    twins: Vec<Twin>,
    pub finder_calls: AtomicUsize,
}

impl InMemoryTwinRepository {
    pub fn new(twins: Vec<Twin>) -> Self {
        Self {
            twins,
            finder_calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.finder_calls.load(Ordering::SeqCst)
    }

    fn find(
        &self,
        query: &PartTwinQuery,
        variant: fn(&PartVariant) -> bool,
    ) -> Result<Vec<Twin>, DomainError> {
        self.finder_calls.fetch_add(1, Ordering::SeqCst);
        if query.limit == 0 {
            return Ok(Vec::new());
        }
        let mut rows: Vec<&Twin> = self
            .twins
            .iter()
            .filter(|t| t.part.as_ref().is_some_and(variant))
            .filter(|t| matches_filter(t, &query.filter))
            .filter(|t| query.watermark.is_none_or(|w| t.created_at < w))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows.into_iter().take(query.limit).cloned().collect())
    }
}

#[async_trait]
impl TwinRepository for InMemoryTwinRepository {
    async fn find_by_aas_id(&self, aas_id: Uuid) -> Result<Option<Twin>, DomainError> {
        Ok(self.twins.iter().find(|t| t.aas_id == aas_id).cloned())
    }

    async fn find_catalog_part_twins(
        &self,
        query: &PartTwinQuery,
    ) -> Result<Vec<Twin>, DomainError> {
        self.find(query, |p| matches!(p, PartVariant::Catalog(_)))
    }

    async fn find_serialized_part_twins(
        &self,
        query: &PartTwinQuery,
    ) -> Result<Vec<Twin>, DomainError> {
        self.find(query, |p| matches!(p, PartVariant::Serialized(_)))
    }

    async fn find_jis_part_twins(&self, query: &PartTwinQuery) -> Result<Vec<Twin>, DomainError> {
        self.find(query, |p| matches!(p, PartVariant::Jis(_)))
    }

    async fn find_batch_twins(&self, query: &PartTwinQuery) -> Result<Vec<Twin>, DomainError> {
        self.find(query, |p| matches!(p, PartVariant::Batch(_)))
    }
}

fn part_manufacturer_id(part: &PartVariant) -> &str {
    match part {
        PartVariant::Catalog(c) => &c.manufacturer_id,
        PartVariant::Serialized(SerializedPart { base, .. })
        | PartVariant::Batch(BatchPart { base, .. })
        | PartVariant::Jis(JisPart { base, .. }) => &base.manufacturer_id,
    }
}

fn part_manufacturer_part_id(part: &PartVariant) -> &str {
    match part {
        PartVariant::Catalog(c) => &c.manufacturer_part_id,
        PartVariant::Serialized(SerializedPart { base, .. })
        | PartVariant::Batch(BatchPart { base, .. })
        | PartVariant::Jis(JisPart { base, .. }) => &base.manufacturer_part_id,
    }
}

fn shared_with(part: &PartVariant, bpn: &str) -> bool {
    match part {
        PartVariant::Catalog(c) => c.mapping_for(bpn).is_some(),
        PartVariant::Serialized(SerializedPart { base, .. })
        | PartVariant::Batch(BatchPart { base, .. })
        | PartVariant::Jis(JisPart { base, .. }) => base.partner.partner_bpn == bpn,
    }
}

fn has_customer_part_id(part: &PartVariant, customer_part_id: &str) -> bool {
    match part {
        PartVariant::Catalog(c) => c
            .partner_mappings
            .iter()
            .any(|m| m.customer_part_id == customer_part_id),
        PartVariant::Serialized(SerializedPart { base, .. })
        | PartVariant::Batch(BatchPart { base, .. })
        | PartVariant::Jis(JisPart { base, .. }) => base.partner.customer_part_id == customer_part_id,
    }
}

fn matches_filter(twin: &Twin, filter: &PartTwinFilter) -> bool {
    let Some(part) = twin.part.as_ref() else {
        return false;
    };

    if filter.stack_id.is_some() || filter.dtr_registered.is_some() {
        let matched = twin.registrations.iter().any(|r| {
            filter.stack_id.is_none_or(|s| r.stack_id == s)
                && filter.dtr_registered.is_none_or(|d| r.dtr_registered == d)
        });
        if !matched {
            return false;
        }
    }

    if let Some(bpn) = &filter.partner_bpn {
        if !shared_with(part, bpn) {
            return false;
        }
    }
    if let Some(global_id) = filter.global_id {
        if twin.global_id != global_id {
            return false;
        }
    }
    if let Some(v) = &filter.manufacturer_id {
        if part_manufacturer_id(part) != v {
            return false;
        }
    }
    if let Some(v) = &filter.manufacturer_part_id {
        if part_manufacturer_part_id(part) != v {
            return false;
        }
    }
    if let Some(v) = &filter.customer_part_id {
        if !has_customer_part_id(part, v) {
            return false;
        }
    }
    if let Some(v) = &filter.part_instance_id {
        let PartVariant::Serialized(s) = part else {
            return false;
        };
        if s.part_instance_id != *v {
            return false;
        }
    }
    if let Some(v) = &filter.van {
        let PartVariant::Serialized(s) = part else {
            return false;
        };
        if s.van.as_deref() != Some(v.as_str()) {
            return false;
        }
    }
    if let Some(v) = &filter.batch_id {
        let PartVariant::Batch(b) = part else {
            return false;
        };
        if b.batch_id != *v {
            return false;
        }
    }
    if let Some(v) = &filter.jis_number {
        let PartVariant::Jis(j) = part else {
            return false;
        };
        if j.jis_number != *v {
            return false;
        }
    }
    if let Some(v) = &filter.parent_order_number {
        let PartVariant::Jis(j) = part else {
            return false;
        };
        if j.parent_order_number.as_deref() != Some(v.as_str()) {
            return false;
        }
    }
    if let Some(v) = filter.jis_call_date {
        let PartVariant::Jis(j) = part else {
            return false;
        };
        if j.jis_call_date != Some(v) {
            return false;
        }
    }

    true
}

/// Facade over an in-memory store, with the repository handle kept around
/// for call-count assertions.
pub fn service_with(twins: Vec<Twin>) -> (DtrFacadeService, Arc<InMemoryTwinRepository>) {
    let repo = Arc::new(InMemoryTwinRepository::new(twins));
    let service = DtrFacadeService::new(repo.clone(), FacadeConfig::default());
    (service, repo)
}

/// Encode asset-link search parameters the way a client would.
pub fn encode_params(params: &[(&str, &str)]) -> Vec<String> {
    params
        .iter()
        .map(|(name, value)| {
            aas_core::AssetLink::new(*name, *value)
                .encode()
                .expect("encode asset link")
        })
        .collect()
}
