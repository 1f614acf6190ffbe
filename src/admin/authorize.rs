//! # Authorization Check
//!
//! Decides whether a caller may run an admin method.
//!
//! 1. Administrators may call anything.
//! 2. Methods outside the protection map are open to every caller.
//! 3. Protected methods need any one of their privileges; an empty
//!    requirement admits nobody.
//!
//! Allowing is side-effect free. Denying logs one warning and appends one
//! audit record.

use std::sync::Arc;

use futures_util::future::join_all;

use super::errors::{AdminError, AdminResult};
use super::identity::CallerIdentity;
use super::privileges::PrivilegeRequirement;
use crate::observability::{append_audit, AuditAction, AuditLog, AuditOutcome, AuditRecord, Event, Logger};
use crate::services::{IdentityService, PrivilegeRegistry};

/// Why a call was allowed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    Administrator,
    Unprotected,
    Privileged,
}

/// Gate in front of every admin method
#[derive(Clone)]
pub struct Authorizer {
    identity: Arc<dyn IdentityService>,
    privileges: Arc<dyn PrivilegeRegistry>,
    audit: Arc<dyn AuditLog>,
}

impl Authorizer {
    pub fn new(
        identity: Arc<dyn IdentityService>,
        privileges: Arc<dyn PrivilegeRegistry>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            identity,
            privileges,
            audit,
        }
    }

    /// Whether `method` is gated by the protection map. Methods that are
    /// not are open to any authenticated caller.
    pub fn is_explicitly_protected(&self, method: &str) -> bool {
        self.protection(method).is_some()
    }

    fn protection(&self, method: &str) -> Option<PrivilegeRequirement> {
        self.privileges.requirement(method)
    }

    /// Decide without side effects. `Ok(None)` means denied.
    pub async fn decide(&self, caller: &CallerIdentity, method: &str) -> AdminResult<Option<Grant>> {
        if self.identity.is_administrator(caller.uid).await? {
            return Ok(Some(Grant::Administrator));
        }

        let requirement = match self.protection(method) {
            // Not explicitly protected: open to every caller
            None => return Ok(Some(Grant::Unprotected)),
            Some(requirement) if requirement.is_empty() => return Ok(None),
            Some(requirement) => requirement,
        };

        // Every check is awaited; no short-circuit on the first grant
        let checks = requirement
            .privileges()
            .iter()
            .map(|privilege| self.privileges.holds(privilege, caller.uid));
        let held = join_all(checks)
            .await
            .into_iter()
            .collect::<Result<Vec<bool>, _>>()?;

        Ok(held.into_iter().any(|h| h).then_some(Grant::Privileged))
    }

    /// Allow or fail with `Unauthorized`, recording the denial
    pub async fn authorize(&self, caller: &CallerIdentity, method: &str) -> AdminResult<Grant> {
        match self.decide(caller, method).await? {
            Some(grant) => Ok(grant),
            None => {
                self.report_denial(caller, method);
                Err(AdminError::Unauthorized {
                    method: method.to_string(),
                    uid: caller.uid,
                })
            }
        }
    }

    fn report_denial(&self, caller: &CallerIdentity, method: &str) {
        let uid = caller.uid.to_string();
        Logger::warn(
            Event::AdminCallBlocked,
            &[("method", method), ("uid", &uid), ("ip", &caller.ip)],
        );
        append_audit(
            self.audit.as_ref(),
            AuditRecord::new(AuditAction::CallBlocked, AuditOutcome::Rejected)
                .with_method(method)
                .with_caller(caller),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::identity::Uid;
    use crate::admin::privileges::ProtectionMap;
    use crate::observability::MemoryAuditLog;
    use crate::services::memory::{MemoryIdentityService, MemoryPrivilegeRegistry};

    fn protection() -> ProtectionMap {
        ProtectionMap::from_specs([
            ("config.set", "admin:settings"),
            ("user.makeAdmins", "admin:admins-mods;admin:users"),
            ("restart", ""),
        ])
    }

    fn authorizer(
        identity: MemoryIdentityService,
        registry: MemoryPrivilegeRegistry,
    ) -> (Authorizer, Arc<MemoryPrivilegeRegistry>, MemoryAuditLog) {
        let registry = Arc::new(registry);
        let audit = MemoryAuditLog::new();
        let auth = Authorizer::new(Arc::new(identity), registry.clone(), Arc::new(audit.clone()));
        (auth, registry, audit)
    }

    #[tokio::test]
    async fn test_admin_bypasses_everything() {
        let (auth, registry, audit) = authorizer(
            MemoryIdentityService::new().with_admin(1),
            MemoryPrivilegeRegistry::new(protection()),
        );
        let admin = CallerIdentity::new(1, "::1");

        for method in ["config.set", "restart", "never.mapped", "deleteEvents"] {
            assert_eq!(auth.authorize(&admin, method).await.unwrap(), Grant::Administrator);
        }
        assert!(registry.checks().is_empty());
        assert!(audit.is_empty());
    }

    #[tokio::test]
    async fn test_unmapped_method_is_allowed() {
        let (auth, _, audit) = authorizer(
            MemoryIdentityService::new(),
            MemoryPrivilegeRegistry::new(protection()),
        );
        let caller = CallerIdentity::new(7, "::1");

        assert!(!auth.is_explicitly_protected("deleteEvents"));
        assert_eq!(
            auth.authorize(&caller, "deleteEvents").await.unwrap(),
            Grant::Unprotected
        );
        assert!(audit.is_empty());
    }

    #[tokio::test]
    async fn test_empty_requirement_denies() {
        let (auth, registry, audit) = authorizer(
            MemoryIdentityService::new(),
            MemoryPrivilegeRegistry::new(protection()).with_grant(7, "admin:settings"),
        );
        let caller = CallerIdentity::new(7, "::1");

        assert!(auth.is_explicitly_protected("restart"));
        let err = auth.authorize(&caller, "restart").await.unwrap_err();
        assert!(matches!(err, AdminError::Unauthorized { .. }));
        assert!(registry.checks().is_empty());
        assert_eq!(audit.len(), 1);
    }

    #[tokio::test]
    async fn test_any_privilege_is_enough() {
        let (auth, registry, _) = authorizer(
            MemoryIdentityService::new(),
            MemoryPrivilegeRegistry::new(protection()).with_grant(4, "admin:users"),
        );
        let caller = CallerIdentity::new(4, "::1");

        assert_eq!(
            auth.authorize(&caller, "user.makeAdmins").await.unwrap(),
            Grant::Privileged
        );
        // Both privileges were evaluated
        assert_eq!(registry.checks().len(), 2);
    }

    #[tokio::test]
    async fn test_every_privilege_checked_when_first_is_held() {
        let (auth, registry, _) = authorizer(
            MemoryIdentityService::new(),
            MemoryPrivilegeRegistry::new(protection()).with_grant(4, "admin:admins-mods"),
        );
        let caller = CallerIdentity::new(4, "::1");

        assert_eq!(
            auth.authorize(&caller, "user.makeAdmins").await.unwrap(),
            Grant::Privileged
        );
        // The held first privilege does not stop the second check
        let checks = registry.checks();
        let checked: Vec<&str> = checks.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(checked, vec!["admin:admins-mods", "admin:users"]);
    }

    #[tokio::test]
    async fn test_denial_is_recorded_once() {
        let (auth, _, audit) = authorizer(
            MemoryIdentityService::new(),
            MemoryPrivilegeRegistry::new(protection()),
        );
        let caller = CallerIdentity::new(9, "10.0.0.9");

        let err = auth.authorize(&caller, "config.set").await.unwrap_err();
        assert_eq!(
            err,
            AdminError::Unauthorized {
                method: "config.set".into(),
                uid: Uid(9)
            }
        );

        let records = audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].method.as_deref(), Some("config.set"));
        assert_eq!(records[0].uid, Some(Uid(9)));
    }

    #[tokio::test]
    async fn test_collaborator_failure_propagates() {
        let registry = MemoryPrivilegeRegistry::new(protection());
        registry.fail_with("privilege store down");
        let (auth, _, audit) = authorizer(MemoryIdentityService::new(), registry);
        let caller = CallerIdentity::new(9, "::1");

        let err = auth.authorize(&caller, "config.set").await.unwrap_err();
        assert_eq!(err.code(), "ADMIN_SERVICE_ERROR");
        assert!(audit.is_empty());
    }
}
