//! Twin aggregates as returned by the repository layer.
//!
//! Repositories hand out fully populated aggregates; the facade never
//! triggers secondary loads while assembling a descriptor.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Identifier of one deployed connector+registry pair a twin can be
/// registered against.
pub type StackId = i64;

/// A digital twin with its owned part variant and aspect children.
#[derive(Clone, Debug)]
pub struct Twin {
    /// Global (Catena-X) id.
    pub global_id: Uuid,
    /// Registry shell id.
    pub aas_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// Optional deployment-specific classification.
    pub asset_class: Option<String>,
    /// Optional free-form context attached by the twin owner.
    pub additional_context: Option<String>,
    /// The owned part variant; `None` is a data-integrity violation the
    /// assembler reports as a validation error.
    pub part: Option<PartVariant>,
    pub aspects: Vec<TwinAspect>,
    pub registrations: Vec<TwinRegistration>,
}

impl Twin {
    /// Shell id in URN form, as exposed in registry responses.
    #[must_use]
    pub fn aas_urn(&self) -> String {
        format!("urn:uuid:{}", self.aas_id)
    }

    /// Global id in URN form.
    #[must_use]
    pub fn global_urn(&self) -> String {
        format!("urn:uuid:{}", self.global_id)
    }

    /// Whether this twin is DTR-registered for the given stack.
    #[must_use]
    pub fn registered_for(&self, stack_id: StackId) -> bool {
        self.registrations
            .iter()
            .find(|r| r.stack_id == stack_id)
            .is_some_and(|r| r.dtr_registered)
    }
}

/// Shell-level registration of a twin against one enablement stack.
#[derive(Clone, Debug)]
pub struct TwinRegistration {
    pub stack_id: StackId,
    pub dtr_registered: bool,
}

/// The mutually exclusive part variant a twin represents.
#[derive(Clone, Debug)]
pub enum PartVariant {
    Catalog(CatalogPart),
    Serialized(SerializedPart),
    Batch(BatchPart),
    Jis(JisPart),
}

/// Customer-side mapping of a catalog part to one business partner.
///
/// At most one mapping exists per (catalog part, partner) pair; uniqueness is
/// enforced at write time by the part management layer.
#[derive(Clone, Debug)]
pub struct PartnerMapping {
    pub partner_bpn: String,
    pub customer_part_id: String,
}

/// Type-level part, shareable with many partners.
#[derive(Clone, Debug)]
pub struct CatalogPart {
    /// BPN of the manufacturing legal entity.
    pub manufacturer_id: String,
    pub manufacturer_part_id: String,
    pub partner_mappings: Vec<PartnerMapping>,
}

impl CatalogPart {
    /// The mapping for one partner, if the part is shared with it.
    #[must_use]
    pub fn mapping_for(&self, partner_bpn: &str) -> Option<&PartnerMapping> {
        self.partner_mappings
            .iter()
            .find(|m| m.partner_bpn == partner_bpn)
    }
}

/// Shared attributes of the instance-level variants: the catalog-part
/// lineage plus the single owning partner.
#[derive(Clone, Debug)]
pub struct InstancePart {
    pub manufacturer_id: String,
    pub manufacturer_part_id: String,
    pub partner: PartnerMapping,
}

#[derive(Clone, Debug)]
pub struct SerializedPart {
    pub base: InstancePart,
    pub part_instance_id: String,
    /// Vehicle anonymized number, when the part is built into a vehicle.
    pub van: Option<String>,
}

#[derive(Clone, Debug)]
pub struct BatchPart {
    pub base: InstancePart,
    pub batch_id: String,
}

#[derive(Clone, Debug)]
pub struct JisPart {
    pub base: InstancePart,
    pub jis_number: String,
    pub parent_order_number: Option<String>,
    pub jis_call_date: Option<DateTime<Utc>>,
}

/// One structured data aspect attached to a twin.
#[derive(Clone, Debug)]
pub struct TwinAspect {
    pub semantic_id: String,
    pub submodel_id: Uuid,
    pub registrations: Vec<AspectRegistration>,
}

impl TwinAspect {
    /// Registration state of this aspect for one stack, if tracked.
    #[must_use]
    pub fn registration_for(&self, stack_id: StackId) -> Option<&AspectRegistration> {
        self.registrations.iter().find(|r| r.stack_id == stack_id)
    }

    /// Whether this aspect may be exposed through the given stack.
    #[must_use]
    pub fn exposed_for(&self, stack_id: StackId) -> bool {
        self.registration_for(stack_id)
            .is_some_and(|r| r.status == RegistrationStatus::DtrRegistered)
    }
}

/// Per-stack registration progress of an aspect.
#[derive(Clone, Debug)]
pub struct AspectRegistration {
    pub stack_id: StackId,
    pub status: RegistrationStatus,
}

/// Registration lifecycle of an aspect within one enablement stack.
///
/// Progression is strictly monotonic; there is no backward transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationStatus {
    /// Registration is planned but nothing happened yet.
    Planned,
    /// The aspect document is stored in the submodel service.
    Stored,
    /// Additionally registered as a connector asset.
    EdcRegistered,
    /// Fully registered in the digital twin registry; only now is the
    /// submodel descriptor exposed externally.
    DtrRegistered,
}

/// Rejected attempt to move a registration backwards.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("registration status cannot regress from {from:?} to {to:?}")]
pub struct RegistrationRegression {
    pub from: RegistrationStatus,
    pub to: RegistrationStatus,
}

impl RegistrationStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Planned => 0,
            Self::Stored => 1,
            Self::EdcRegistered => 2,
            Self::DtrRegistered => 3,
        }
    }

    /// Validate a transition to `next`. Forward moves (including skipping
    /// intermediate states) succeed; any regression is rejected.
    ///
    /// # Errors
    /// Returns `RegistrationRegression` when `next` is earlier in the
    /// lifecycle than `self`.
    pub fn advance_to(self, next: Self) -> Result<Self, RegistrationRegression> {
        if next.rank() < self.rank() {
            return Err(RegistrationRegression {
                from: self,
                to: next,
            });
        }
        Ok(next)
    }
}
