//! # Restart/Reload Workflow
//!
//! `restart`: log event → persist audit record → restart.
//! `reload`:  rebuild → log build event → log event → persist audit record → restart.
//!
//! ## Invariants
//! - Both audit writes succeed before the restart is triggered
//! - A failed rebuild records nothing
//! - The workflow holds no lock; the transport serializes restart/reload

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::{AdminError, AdminResult};
use super::identity::{CallerIdentity, Uid};
use crate::observability::{append_audit, AuditAction, AuditLog, AuditOutcome, AuditRecord, Event, Logger};
use crate::services::{BuildPipeline, EventLog, ProcessControl, ServiceError, StateStore};

/// State-store key the last restart is recorded under
pub const LAST_RESTART_KEY: &str = "lastrestart";

/// Where a workflow currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStage {
    Idle,
    Rebuilding,
    LoggingEvent,
    PersistingAuditRecord,
    Restarting,
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowStage::Idle => "idle",
            WorkflowStage::Rebuilding => "rebuilding",
            WorkflowStage::LoggingEvent => "logging event",
            WorkflowStage::PersistingAuditRecord => "persisting audit record",
            WorkflowStage::Restarting => "restarting",
        };
        f.write_str(s)
    }
}

/// Kind of admin event written to the event log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Restart,
    Build,
}

/// Event-log entry written by the workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescriptor {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub uid: Uid,
    pub ip: String,
}

impl EventDescriptor {
    pub fn new(kind: EventKind, caller: &CallerIdentity) -> Self {
        Self {
            kind,
            uid: caller.uid,
            ip: caller.ip.clone(),
        }
    }
}

/// Who restarted the process last, and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartAuditRecord {
    pub uid: Uid,
    pub ip: String,
    /// Unix epoch milliseconds
    pub timestamp: i64,
}

impl RestartAuditRecord {
    pub fn now(caller: &CallerIdentity) -> Self {
        Self {
            uid: caller.uid,
            ip: caller.ip.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Orchestrates restart and reload against the host collaborators
#[derive(Clone)]
pub struct RestartWorkflow {
    event_log: Arc<dyn EventLog>,
    state: Arc<dyn StateStore>,
    build: Arc<dyn BuildPipeline>,
    process: Arc<dyn ProcessControl>,
    audit: Arc<dyn AuditLog>,
}

impl RestartWorkflow {
    pub fn new(
        event_log: Arc<dyn EventLog>,
        state: Arc<dyn StateStore>,
        build: Arc<dyn BuildPipeline>,
        process: Arc<dyn ProcessControl>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            event_log,
            state,
            build,
            process,
            audit,
        }
    }

    /// Log, persist, then restart
    pub async fn restart(&self, caller: &CallerIdentity) -> AdminResult<()> {
        let outcome = self.log_restart(caller).await;
        self.finish(caller, "restart", AuditAction::RestartTriggered, outcome)
    }

    /// Rebuild, log the build, then run the restart sequence
    pub async fn reload(&self, caller: &CallerIdentity) -> AdminResult<()> {
        let outcome = self.rebuild_and_log(caller).await;
        self.finish(caller, "reload", AuditAction::ReloadTriggered, outcome)
    }

    async fn rebuild_and_log(&self, caller: &CallerIdentity) -> AdminResult<()> {
        let uid = caller.uid.to_string();
        Logger::event(Event::RebuildBegin, &[("uid", &uid)]);

        if let Err(e) = self.build.rebuild_all().await {
            let detail = e.to_string();
            Logger::event(Event::RebuildFailed, &[("uid", &uid), ("error", &detail)]);
            return Err(AdminError::BuildFailure(e));
        }

        self.record_event(EventKind::Build, caller).await?;
        self.log_restart(caller).await
    }

    async fn log_restart(&self, caller: &CallerIdentity) -> AdminResult<()> {
        self.record_event(EventKind::Restart, caller).await?;

        let record = RestartAuditRecord::now(caller);
        let value = serde_json::to_value(&record).map_err(|e| AdminError::AuditFailure {
            stage: WorkflowStage::PersistingAuditRecord,
            source: ServiceError::new("state store", e.to_string()),
        })?;
        self.state
            .put(LAST_RESTART_KEY, value)
            .await
            .map_err(|e| audit_failure(WorkflowStage::PersistingAuditRecord, e))?;

        Logger::event(
            Event::RestartRecordPersisted,
            &[("uid", &caller.uid.to_string()), ("ip", &caller.ip)],
        );
        Ok(())
    }

    async fn record_event(&self, kind: EventKind, caller: &CallerIdentity) -> AdminResult<()> {
        let descriptor = EventDescriptor::new(kind, caller);
        self.event_log
            .record(&descriptor)
            .await
            .map_err(|e| audit_failure(WorkflowStage::LoggingEvent, e))?;

        let kind = match kind {
            EventKind::Restart => "restart",
            EventKind::Build => "build",
        };
        Logger::event(
            Event::WorkflowEventLogged,
            &[("type", kind), ("uid", &caller.uid.to_string())],
        );
        Ok(())
    }

    /// Trigger the restart on success; audit either way
    fn finish(
        &self,
        caller: &CallerIdentity,
        method: &str,
        action: AuditAction,
        outcome: AdminResult<()>,
    ) -> AdminResult<()> {
        match outcome {
            Ok(()) => {
                append_audit(
                    self.audit.as_ref(),
                    AuditRecord::new(action, AuditOutcome::Success)
                        .with_method(method)
                        .with_caller(caller),
                );
                Logger::event(
                    Event::RestartTriggered,
                    &[("method", method), ("uid", &caller.uid.to_string())],
                );
                self.process.trigger_restart();
                Ok(())
            }
            Err(e) => {
                append_audit(
                    self.audit.as_ref(),
                    AuditRecord::new(AuditAction::WorkflowFailed, AuditOutcome::Failed)
                        .with_method(method)
                        .with_caller(caller)
                        .with_detail(e.to_string()),
                );
                Err(e)
            }
        }
    }
}

fn audit_failure(stage: WorkflowStage, source: ServiceError) -> AdminError {
    let detail = source.to_string();
    let stage_name = stage.to_string();
    Logger::event(
        Event::WorkflowAuditFailed,
        &[("stage", &stage_name), ("error", &detail)],
    );
    AdminError::AuditFailure { stage, source }
}
