//! Domain errors of the registry facade.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors for facade operations.
///
/// `NotAuthorized` deliberately carries no more detail than the fact of
/// denial; callers must not be able to probe for existence through it.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Shell does not exist, or is not registered for the requesting stack.
    #[error("shell descriptor {aas_id} not found")]
    ShellNotFound { aas_id: Uuid },

    /// Submodel does not exist, or is not registered for the requesting stack.
    #[error("submodel descriptor {submodel_id} not found")]
    SubmodelNotFound { submodel_id: Uuid },

    /// The part exists but is not shared with the requesting partner.
    #[error("shell descriptor {aas_id} is not shared with business partner {partner}")]
    NotAuthorized { aas_id: Uuid, partner: String },

    /// Structurally invalid input.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// Storage-layer failure.
    #[error("repository error: {0}")]
    Repository(#[from] anyhow::Error),
}

impl DomainError {
    pub fn shell_not_found(aas_id: Uuid) -> Self {
        Self::ShellNotFound { aas_id }
    }

    pub fn submodel_not_found(submodel_id: Uuid) -> Self {
        Self::SubmodelNotFound { submodel_id }
    }

    pub fn not_authorized(aas_id: Uuid, partner: impl Into<String>) -> Self {
        Self::NotAuthorized {
            aas_id,
            partner: partner.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
