//! Typed error types for the pim-core stores and service layer.

use thiserror::Error;

use crate::model::{BlockType, ProjectId, TemplateId};
use crate::validate::FieldErrors;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the stores and the service layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// One or more fields failed validation; the caller can correct them.
    #[error("Validation failed: {fields}")]
    Validation { fields: FieldErrors },

    /// A project was not found.
    #[error("Project not found: {project_id}")]
    ProjectNotFound { project_id: ProjectId },

    /// A template was not found.
    #[error("Template not found: {template_id}")]
    TemplateNotFound { template_id: TemplateId },

    /// A block references a template that does not exist.
    #[error("Invalid block type '{block_type}': no such template")]
    InvalidTemplate { block_type: BlockType },

    /// No valid credentials accompanied the request.
    #[error("Authentication required: {reason}")]
    Unauthenticated { reason: String },

    /// The caller is authenticated but lacks the required capability.
    #[error("You do not have permission to {action}")]
    Forbidden { action: String },

    /// No pim configuration was found under the given root.
    #[error("pim is not initialized at {path} (run `pim init`)")]
    NotInitialized { path: String },

    /// An internal storage or database error.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    /// Build a validation error for a single field.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field, message);
        Self::Validation { fields }
    }

    /// True for the not-found family of errors.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ProjectNotFound { .. } | Self::TemplateNotFound { .. }
        )
    }
}

impl From<FieldErrors> for CoreError {
    fn from(fields: FieldErrors) -> Self {
        Self::Validation { fields }
    }
}
