//! Authorization Invariant Tests
//!
//! The gate in front of every admin method:
//! 1. Administrators bypass all checks
//! 2. Unmapped methods are open to every caller
//! 3. Mapped methods need any one listed privilege; an empty list denies
//! 4. Each denial leaves exactly one audit record and never reaches the handler

mod harness;

use admin_gate::admin::{AdminError, CallerIdentity, Grant, ProtectionMap, Uid};
use admin_gate::observability::{AuditAction, AuditOutcome};
use admin_gate::services::memory::MemoryIdentityService;
use serde_json::{json, Value};

use harness::HostBuilder;

fn protection() -> ProtectionMap {
    ProtectionMap::from_specs([
        ("config.set", "admin:settings"),
        ("config.get", "admin:settings;admin:dashboard"),
        ("restart", ""),
        ("deleteAllSessions", "admin:users"),
    ])
}

// =============================================================================
// ADMINISTRATOR BYPASS
// =============================================================================

/// Administrators are allowed on mapped, unmapped and empty-requirement methods.
#[tokio::test]
async fn test_administrator_allowed_everywhere() {
    let host = HostBuilder::new(protection())
        .identity(MemoryIdentityService::new().with_admin(1))
        .build();
    let admin = CallerIdentity::new(1, "10.0.0.1");

    for method in ["config.set", "config.get", "restart", "deleteEvents", "unknown.method"] {
        let grant = host.gate.authorizer().authorize(&admin, method).await.unwrap();
        assert_eq!(grant, Grant::Administrator, "method {method}");
    }

    assert!(host.privileges.checks().is_empty());
    assert!(host.audit.is_empty());
}

// =============================================================================
// ALLOW IF UNMAPPED
// =============================================================================

/// Non-administrators may call anything the protection map does not name.
#[tokio::test]
async fn test_unmapped_methods_open_to_non_admins() {
    let host = HostBuilder::new(protection()).build();
    let caller = CallerIdentity::new(7, "10.0.0.7");

    for method in ["deleteEvents", "getServerTime", "reloadAllSessions", "settings.get"] {
        assert!(!host.gate.authorizer().is_explicitly_protected(method));
        let grant = host.gate.authorizer().authorize(&caller, method).await.unwrap();
        assert_eq!(grant, Grant::Unprotected);
    }
    assert!(host.audit.is_empty());
}

// =============================================================================
// ANY-OF PRIVILEGES
// =============================================================================

/// Allowed iff holds(p1) OR holds(p2), over all four combinations.
#[tokio::test]
async fn test_any_of_truth_table() {
    let cases: [(&[&str], bool); 4] = [
        (&[], false),
        (&["admin:settings"], true),
        (&["admin:dashboard"], true),
        (&["admin:settings", "admin:dashboard"], true),
    ];

    for (held, allowed) in cases {
        let host = HostBuilder::new(protection())
            .privileges(|reg| held.iter().fold(reg, |r, p| r.with_grant(4, *p)))
            .build();
        let caller = CallerIdentity::new(4, "10.0.0.4");

        let result = host.gate.authorizer().authorize(&caller, "config.get").await;
        assert_eq!(result.is_ok(), allowed, "held {held:?}");
        assert_eq!(host.audit.len(), usize::from(!allowed));
        // Both privileges are checked even when the first is held
        assert_eq!(host.privileges.checks().len(), 2, "held {held:?}");
    }
}

/// A mapped method with an empty requirement list admits no non-administrator.
#[tokio::test]
async fn test_empty_requirement_denies() {
    let host = HostBuilder::new(protection())
        .privileges(|reg| reg.with_grant(3, "admin:settings").with_grant(3, "admin:users"))
        .build();
    let caller = CallerIdentity::new(3, "10.0.0.3");

    let err = host.gate.dispatch(&caller, "restart", Value::Null).await.unwrap_err();
    assert!(matches!(err, AdminError::Unauthorized { .. }));
    assert_eq!(host.process.restart_count(), 0);
    assert!(host.event_log.recorded().is_empty());
}

// =============================================================================
// DENIAL REPORTING
// =============================================================================

/// uid 9 calling config.set without admin:settings fails Unauthorized with
/// exactly one record naming the method and the caller.
#[tokio::test]
async fn test_config_set_denial_scenario() {
    let host = HostBuilder::new(protection()).build();
    let caller = CallerIdentity::new(9, "10.0.0.9");

    let err = host
        .gate
        .dispatch(&caller, "config.set", json!({"key": "title", "value": "x"}))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AdminError::Unauthorized {
            method: "config.set".into(),
            uid: Uid(9)
        }
    );

    let records = host.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, AuditAction::CallBlocked);
    assert_eq!(records[0].outcome, AuditOutcome::Rejected);
    assert_eq!(records[0].method.as_deref(), Some("config.set"));
    assert_eq!(records[0].uid, Some(Uid(9)));

    // The handler never ran
    assert!(host.config_ns.calls().is_empty());
}

/// Denied core methods produce no side effects.
#[tokio::test]
async fn test_denied_core_method_has_no_effect() {
    let host = HostBuilder::new(protection()).build();
    let caller = CallerIdentity::new(5, "10.0.0.5");

    let err = host
        .gate
        .dispatch(&caller, "deleteAllSessions", Value::Null)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ADMIN_UNAUTHORIZED");
    assert!(host.identity.session_wipes().is_empty());
}

/// Allowing writes nothing to the audit log.
#[tokio::test]
async fn test_allowed_call_is_not_audited() {
    let host = HostBuilder::new(protection())
        .privileges(|reg| reg.with_grant(2, "admin:settings"))
        .build();
    let caller = CallerIdentity::new(2, "10.0.0.2");

    host.gate
        .dispatch(&caller, "config.set", json!({"key": "title"}))
        .await
        .unwrap();
    assert!(host.audit.is_empty());
    assert_eq!(host.config_ns.calls().len(), 1);
}

/// A failing privilege store is a service error, not a denial.
#[tokio::test]
async fn test_privilege_store_failure_is_not_a_denial() {
    let host = HostBuilder::new(protection()).build();
    host.privileges.fail_with("privilege store unavailable");
    let caller = CallerIdentity::new(9, "10.0.0.9");

    let err = host.gate.dispatch(&caller, "config.set", Value::Null).await.unwrap_err();
    assert_eq!(err.code(), "ADMIN_SERVICE_ERROR");
    assert!(host.audit.is_empty());
    assert!(host.config_ns.calls().is_empty());
}
