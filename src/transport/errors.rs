//! # Transport Errors

use thiserror::Error;

use crate::services::ServiceError;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors raised by the socket layer itself, before or around dispatch
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    // ==================
    // Connection Errors
    // ==================
    /// Listener could not be bound
    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    /// WebSocket handshake failed
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Frame could not be parsed
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    /// Binary frames are not part of the protocol
    #[error("Binary messages not supported")]
    Unsupported,

    // ==================
    // Session Errors
    // ==================
    /// Call sent before `auth`
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Token did not resolve to a user
    #[error("Invalid session token")]
    AuthenticationFailed,

    /// Session store failed
    #[error("Session lookup failed: {0}")]
    Session(#[from] ServiceError),

    // ==================
    // Workflow Errors
    // ==================
    /// restart/reload already running in this process
    #[error("A restart or reload is already in progress")]
    WorkflowInProgress,
}

impl TransportError {
    /// Stable code sent to the client
    pub fn code(&self) -> &'static str {
        match self {
            TransportError::Bind { .. } => "TRANSPORT_BIND_FAILED",
            TransportError::Handshake(_) => "TRANSPORT_HANDSHAKE_FAILED",
            TransportError::InvalidMessage(_) => "TRANSPORT_INVALID_MESSAGE",
            TransportError::Unsupported => "TRANSPORT_UNSUPPORTED",
            TransportError::AuthenticationRequired => "TRANSPORT_AUTH_REQUIRED",
            TransportError::AuthenticationFailed => "TRANSPORT_AUTH_FAILED",
            TransportError::Session(_) => "TRANSPORT_SESSION_ERROR",
            TransportError::WorkflowInProgress => "TRANSPORT_WORKFLOW_IN_PROGRESS",
        }
    }
}
