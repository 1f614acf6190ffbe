//! Restart/Reload Workflow Tests
//!
//! Ordering through the dispatch gate:
//! - restart: event → lastrestart record → restart trigger
//! - reload: rebuild → build event → restart sequence
//!
//! A failure at any step stops every later step.

mod harness;

use admin_gate::admin::{
    AdminError, CallerIdentity, EventKind, RestartAuditRecord, Uid, WorkflowStage, LAST_RESTART_KEY,
};
use admin_gate::observability::{AuditAction, AuditOutcome};
use serde_json::Value;

use harness::host;

fn admin() -> CallerIdentity {
    CallerIdentity::new(1, "192.168.1.10")
}

// =============================================================================
// RESTART
// =============================================================================

/// Admin uid 1 restarts: one restart event, one record for uid 1, one trigger.
#[tokio::test]
async fn test_admin_restart_scenario() {
    let host = host();

    let out = host.gate.dispatch(&admin(), "restart", Value::Null).await.unwrap();
    assert_eq!(out, Value::Null);

    let events = host.event_log.recorded();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Restart);
    assert_eq!(events[0].uid, Uid(1));
    assert_eq!(events[0].ip, "192.168.1.10");

    let record: RestartAuditRecord =
        serde_json::from_value(host.state.get(LAST_RESTART_KEY).unwrap()).unwrap();
    assert_eq!(record.uid, Uid(1));
    assert_eq!(record.ip, "192.168.1.10");
    assert!(record.timestamp > 0);

    assert_eq!(host.process.restart_count(), 1);
    assert_eq!(host.audit.with_action(AuditAction::RestartTriggered).len(), 1);
}

/// Event log failure: no record persisted, no restart.
#[tokio::test]
async fn test_restart_stops_when_event_log_fails() {
    let host = host();
    host.event_log.fail_writes("events table locked");

    let err = host.gate.dispatch(&admin(), "restart", Value::Null).await.unwrap_err();
    match err {
        AdminError::AuditFailure { stage, .. } => assert_eq!(stage, WorkflowStage::LoggingEvent),
        other => panic!("unexpected error: {other}"),
    }

    assert!(host.state.get(LAST_RESTART_KEY).is_none());
    assert_eq!(host.process.restart_count(), 0);

    let failures = host.audit.with_action(AuditAction::WorkflowFailed);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].outcome, AuditOutcome::Failed);
}

/// State store failure: the event stays logged but nothing restarts.
#[tokio::test]
async fn test_restart_stops_when_record_cannot_persist() {
    let host = host();
    host.state.fail_writes("disk full");

    let err = host.gate.dispatch(&admin(), "restart", Value::Null).await.unwrap_err();
    assert_eq!(err.code(), "ADMIN_AUDIT_FAILURE");
    assert!(matches!(
        err,
        AdminError::AuditFailure {
            stage: WorkflowStage::PersistingAuditRecord,
            ..
        }
    ));

    assert_eq!(host.event_log.recorded().len(), 1);
    assert_eq!(host.process.restart_count(), 0);
}

// =============================================================================
// RELOAD
// =============================================================================

/// Reload records the build event before the restart event.
#[tokio::test]
async fn test_reload_order() {
    let host = host();

    host.gate.dispatch(&admin(), "reload", Value::Null).await.unwrap();

    assert_eq!(host.build.runs(), 1);
    let kinds: Vec<EventKind> = host.event_log.recorded().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::Build, EventKind::Restart]);
    assert!(host.state.get(LAST_RESTART_KEY).is_some());
    assert_eq!(host.process.restart_count(), 1);
    assert_eq!(host.audit.with_action(AuditAction::ReloadTriggered).len(), 1);
}

/// Build failure: no build event, no restart event, no trigger.
#[tokio::test]
async fn test_reload_build_failure_records_nothing() {
    let host = host();
    host.build.fail_with("asset compilation failed");

    let err = host.gate.dispatch(&admin(), "reload", Value::Null).await.unwrap_err();
    assert_eq!(err.code(), "ADMIN_BUILD_FAILURE");
    assert!(err.to_string().contains("asset compilation failed"));

    assert!(host.event_log.recorded().is_empty());
    assert!(host.state.get(LAST_RESTART_KEY).is_none());
    assert_eq!(host.process.restart_count(), 0);
}

/// Event log failure after a good build: nothing persisted, no restart.
#[tokio::test]
async fn test_reload_stops_when_event_log_fails() {
    let host = host();
    host.event_log.fail_writes("events table locked");

    let err = host.gate.dispatch(&admin(), "reload", Value::Null).await.unwrap_err();
    assert!(matches!(
        err,
        AdminError::AuditFailure {
            stage: WorkflowStage::LoggingEvent,
            ..
        }
    ));
    assert_eq!(host.build.runs(), 1);
    assert!(host.state.get(LAST_RESTART_KEY).is_none());
    assert_eq!(host.process.restart_count(), 0);
}

/// Each successful workflow triggers exactly one restart.
#[tokio::test]
async fn test_one_trigger_per_workflow() {
    let host = host();

    host.gate.dispatch(&admin(), "restart", Value::Null).await.unwrap();
    host.gate.dispatch(&admin(), "reload", Value::Null).await.unwrap();

    assert_eq!(host.process.restart_count(), 2);
    assert_eq!(host.event_log.recorded().len(), 3);
}
