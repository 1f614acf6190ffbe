//! # Admin Errors
//!
//! Error types for the dispatch gate.

use thiserror::Error;

use super::identity::Uid;
use super::workflow::WorkflowStage;
use crate::services::ServiceError;

/// Result type for admin calls
pub type AdminResult<T> = Result<T, AdminError>;

/// Admin call errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminError {
    // ==================
    // Caller Errors
    // ==================
    /// Caller lacks the privileges for this method
    #[error("No privileges to call {method}")]
    Unauthorized { method: String, uid: Uid },

    /// Method name addresses nothing on the surface
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Arguments could not be decoded for the method
    #[error("Invalid arguments for {method}: {reason}")]
    InvalidArguments { method: String, reason: String },

    // ==================
    // Workflow Errors
    // ==================
    /// Rebuild failed before anything was recorded
    #[error("Build failed: {0}")]
    BuildFailure(#[source] ServiceError),

    /// A required audit write failed; restart was not triggered
    #[error("Audit write failed while {stage}: {source}")]
    AuditFailure {
        stage: WorkflowStage,
        #[source]
        source: ServiceError,
    },

    // ==================
    // Collaborator Errors
    // ==================
    /// Passed through from a collaborator untouched
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl AdminError {
    /// Stable kind tag sent to callers
    pub fn code(&self) -> &'static str {
        match self {
            AdminError::Unauthorized { .. } => "ADMIN_UNAUTHORIZED",
            AdminError::MethodNotFound(_) => "ADMIN_METHOD_NOT_FOUND",
            AdminError::InvalidArguments { .. } => "ADMIN_INVALID_ARGUMENTS",
            AdminError::BuildFailure(_) => "ADMIN_BUILD_FAILURE",
            AdminError::AuditFailure { .. } => "ADMIN_AUDIT_FAILURE",
            AdminError::Service(_) => "ADMIN_SERVICE_ERROR",
        }
    }

    /// Whether the caller caused this error
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AdminError::Unauthorized { .. }
                | AdminError::MethodNotFound(_)
                | AdminError::InvalidArguments { .. }
        )
    }

    pub(crate) fn invalid_arguments(method: &str, reason: impl ToString) -> Self {
        AdminError::InvalidArguments {
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }
}
