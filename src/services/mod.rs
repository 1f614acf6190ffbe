//! # Host Services
//!
//! Collaborators the gate calls into but does not implement: privilege
//! registry, identity store, event log, state store, broadcast fan-out,
//! build pipeline, search index, process control and session lookup.
//!
//! `memory` provides in-process implementations for the dev server and
//! tests. `build` provides the command-backed build pipeline.

pub mod build;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::admin::identity::Uid;
use crate::admin::privileges::{Privilege, PrivilegeRequirement};
use crate::admin::workflow::EventDescriptor;
use crate::observability::AuditLog;

/// Result type for collaborator calls
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure reported by a collaborator. Surfaced to callers verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{service}: {message}")]
pub struct ServiceError {
    /// Which collaborator failed
    pub service: &'static str,
    /// Collaborator's own description
    pub message: String,
}

impl ServiceError {
    pub fn new(service: &'static str, message: impl Into<String>) -> Self {
        Self {
            service,
            message: message.into(),
        }
    }
}

/// Privilege definitions and grants
#[async_trait]
pub trait PrivilegeRegistry: Send + Sync {
    /// Requirement for `method`, or `None` when the method is not in the
    /// protection map
    fn requirement(&self, method: &str) -> Option<PrivilegeRequirement>;

    /// Whether `uid` holds `privilege`
    async fn holds(&self, privilege: &Privilege, uid: Uid) -> ServiceResult<bool>;
}

/// User and session store
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn is_administrator(&self, uid: Uid) -> ServiceResult<bool>;

    /// The user's interface language, if they set one
    async fn locale_setting(&self, uid: Uid) -> ServiceResult<Option<String>>;

    /// Invalidate every login session on the site. `requested_by` is the
    /// acting administrator.
    async fn delete_all_sessions(&self, requested_by: Uid) -> ServiceResult<()>;
}

/// Append-only admin event log
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn record(&self, event: &EventDescriptor) -> ServiceResult<()>;

    async fn delete_by_ids(&self, ids: &[i64]) -> ServiceResult<()>;

    async fn delete_all(&self) -> ServiceResult<()>;
}

/// Durable key/object store
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn put(&self, key: &str, record: Value) -> ServiceResult<()>;
}

/// Fan-out to connected sessions. Delivery problems are the transport's.
pub trait Broadcaster: Send + Sync {
    /// Emit to every connection
    fn emit_all(&self, event: &str, payload: Value);

    /// Emit to every connection in `group`
    fn emit_to_group(&self, group: &str, event: &str, payload: Value);
}

/// Asset build pipeline
#[async_trait]
pub trait BuildPipeline: Send + Sync {
    async fn rebuild_all(&self) -> ServiceResult<()>;
}

/// Admin search dictionaries
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn dictionary(&self, locale: &str) -> ServiceResult<Value>;
}

/// Hands the running process over to its supervisor for a restart
pub trait ProcessControl: Send + Sync {
    fn trigger_restart(&self);
}

/// Resolves connection tokens to users
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn resolve(&self, token: &str) -> ServiceResult<Option<Uid>>;
}

/// All collaborators the gate needs, as shared handles
#[derive(Clone)]
pub struct Services {
    pub privileges: Arc<dyn PrivilegeRegistry>,
    pub identity: Arc<dyn IdentityService>,
    pub event_log: Arc<dyn EventLog>,
    pub state: Arc<dyn StateStore>,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub build: Arc<dyn BuildPipeline>,
    pub search: Arc<dyn SearchIndex>,
    pub process: Arc<dyn ProcessControl>,
    pub audit: Arc<dyn AuditLog>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_display_is_verbatim() {
        let err = ServiceError::new("event log", "disk full");
        assert_eq!(err.to_string(), "event log: disk full");
    }
}
