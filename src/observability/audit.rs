//! Admin audit trail
//!
//! - Every blocked admin call is recorded
//! - Every restart/reload outcome is recorded
//! - Append-only; the file log syncs each record before returning

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::admin::identity::{CallerIdentity, Uid};

/// Audit action type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Authorization check denied a call
    CallBlocked,
    /// Restart handed to process control
    RestartTriggered,
    /// Rebuild succeeded and restart handed to process control
    ReloadTriggered,
    /// Restart/reload stopped before restarting
    WorkflowFailed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CallBlocked => "CALL_BLOCKED",
            AuditAction::RestartTriggered => "RESTART_TRIGGERED",
            AuditAction::ReloadTriggered => "RELOAD_TRIGGERED",
            AuditAction::WorkflowFailed => "WORKFLOW_FAILED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit record outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOutcome {
    Success,
    Rejected,
    Failed,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditOutcome::Success => "SUCCESS",
            AuditOutcome::Rejected => "REJECTED",
            AuditOutcome::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// A single audit record
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub outcome: AuditOutcome,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    /// Error text for failed outcomes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditRecord {
    pub fn new(action: AuditAction, outcome: AuditOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            outcome,
            method: None,
            uid: None,
            ip: None,
            detail: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Attach the caller's uid and address
    pub fn with_caller(mut self, caller: &CallerIdentity) -> Self {
        self.uid = Some(caller.uid);
        self.ip = Some(caller.ip.clone());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// One JSON line
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!(r#"{{"id":"{}"}}"#, self.id))
    }
}

/// Append-only audit sink
pub trait AuditLog: Send + Sync {
    /// Append a record. The record is durable once this returns.
    fn append(&self, record: &AuditRecord) -> io::Result<()>;
}

fn poisoned() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "audit log lock poisoned")
}

/// File-backed audit log, one JSON record per line
pub struct FileAuditLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileAuditLog {
    /// Open or create an audit log file in append mode
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditLog for FileAuditLog {
    fn append(&self, record: &AuditRecord) -> io::Result<()> {
        let mut writer = self.writer.lock().map_err(|_| poisoned())?;
        writeln!(writer, "{}", record.to_json())?;
        writer.flush()?;
        writer.get_ref().sync_all()
    }
}

/// In-memory audit log
#[derive(Debug, Default, Clone)]
pub struct MemoryAuditLog {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<AuditRecord>> {
        // A panic mid-push cannot leave the Vec inconsistent
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.guard().clone()
    }

    /// Records with the given action
    pub fn with_action(&self, action: AuditAction) -> Vec<AuditRecord> {
        self.guard()
            .iter()
            .filter(|r| r.action == action)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&self, record: &AuditRecord) -> io::Result<()> {
        self.guard().push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_record_builder() {
        let caller = CallerIdentity::new(9, "10.0.0.9");
        let record = AuditRecord::new(AuditAction::CallBlocked, AuditOutcome::Rejected)
            .with_method("config.set")
            .with_caller(&caller);

        assert_eq!(record.method.as_deref(), Some("config.set"));
        assert_eq!(record.uid, Some(Uid(9)));
        assert_eq!(record.ip.as_deref(), Some("10.0.0.9"));
    }

    #[test]
    fn test_record_json() {
        let record = AuditRecord::new(AuditAction::RestartTriggered, AuditOutcome::Success)
            .with_method("restart");

        let parsed: serde_json::Value = serde_json::from_str(&record.to_json()).unwrap();
        assert_eq!(parsed["action"], "RESTART_TRIGGERED");
        assert_eq!(parsed["outcome"], "SUCCESS");
        assert_eq!(parsed["method"], "restart");
        assert!(parsed.get("detail").is_none());
    }

    #[test]
    fn test_memory_audit_log() {
        let log = MemoryAuditLog::new();
        log.append(&AuditRecord::new(AuditAction::CallBlocked, AuditOutcome::Rejected))
            .unwrap();
        log.append(&AuditRecord::new(AuditAction::WorkflowFailed, AuditOutcome::Failed))
            .unwrap();

        assert_eq!(log.len(), 2);
        assert_eq!(log.with_action(AuditAction::CallBlocked).len(), 1);
    }

    #[test]
    fn test_memory_audit_log_clones_share_records() {
        let log = MemoryAuditLog::new();
        let handle = log.clone();
        handle
            .append(&AuditRecord::new(AuditAction::CallBlocked, AuditOutcome::Rejected))
            .unwrap();
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_file_audit_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.log");

        let log = FileAuditLog::open(&path).unwrap();
        log.append(
            &AuditRecord::new(AuditAction::CallBlocked, AuditOutcome::Rejected)
                .with_method("config.set"),
        )
        .unwrap();
        log.append(
            &AuditRecord::new(AuditAction::RestartTriggered, AuditOutcome::Success)
                .with_method("restart"),
        )
        .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("CALL_BLOCKED"));
        assert!(contents.contains("config.set"));
    }
}
