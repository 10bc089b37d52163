//! Domain errors of the discovery manager.

use thiserror::Error;

/// Errors surfaced by consumer-side discovery.
///
/// Per-submodel negotiation and fetch failures are NOT errors at this level;
/// they are recorded inline in the result set so one failing submodel never
/// aborts its siblings.
#[derive(Error, Debug)]
pub enum ConsumerError {
    /// No registry could be discovered for the partner.
    #[error("no digital twin registries found for business partner {partner}")]
    NoRegistries { partner: String },

    /// The shell was not found in any registry of the partner.
    #[error("shell {shell_id} not found in any registry of business partner {partner}")]
    ShellNotFound { partner: String, shell_id: String },

    /// The submodel was not found in any registry of the partner.
    #[error("submodel {submodel_id} not found in any registry of business partner {partner}")]
    SubmodelNotFound {
        partner: String,
        submodel_id: String,
    },

    /// Structurally invalid input.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// Transport-level connector failure.
    #[error("connector error: {0}")]
    Connector(#[from] anyhow::Error),
}

impl ConsumerError {
    pub fn no_registries(partner: impl Into<String>) -> Self {
        Self::NoRegistries {
            partner: partner.into(),
        }
    }

    pub fn shell_not_found(partner: impl Into<String>, shell_id: impl Into<String>) -> Self {
        Self::ShellNotFound {
            partner: partner.into(),
            shell_id: shell_id.into(),
        }
    }

    pub fn submodel_not_found(partner: impl Into<String>, submodel_id: impl Into<String>) -> Self {
        Self::SubmodelNotFound {
            partner: partner.into(),
            submodel_id: submodel_id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn connector(message: impl Into<String>) -> Self {
        Self::Connector(anyhow::anyhow!(message.into()))
    }
}
