//! Observable events emitted by the admin gate and its transport.
//!
//! Events are explicit and typed; each maps to one stable log name.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Configuration loaded and validated
    ConfigLoaded,
    /// Server bound and accepting connections
    Serving,
    /// Server loop stopped
    ShutdownComplete,
    /// Listener could not be bound
    BindFailed,

    // Connections
    /// Connection accepted
    ConnectionOpened,
    /// Connection authenticated as a user
    ConnectionAuthenticated,
    /// Connection closed and cleaned up
    ConnectionClosed,
    /// Frame could not be read or written
    ConnectionError,

    // Authorization
    /// Admin call rejected by the authorization check
    AdminCallBlocked,
    /// Denial could not be written to the audit log
    AuditAppendFailed,

    // Restart/reload workflow
    /// Rebuild started
    RebuildBegin,
    /// Rebuild failed; nothing recorded
    RebuildFailed,
    /// Workflow event written to the event log
    WorkflowEventLogged,
    /// Restart audit record persisted
    RestartRecordPersisted,
    /// Required audit write failed; restart withheld
    WorkflowAuditFailed,
    /// Process restart handed to process control
    RestartTriggered,
    /// Second workflow rejected while one is in flight
    WorkflowBusy,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::Serving => "ADMIN_GATE_SERVING",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",
            Event::BindFailed => "BIND_FAILED",

            Event::ConnectionOpened => "CONNECTION_OPENED",
            Event::ConnectionAuthenticated => "CONNECTION_AUTHENTICATED",
            Event::ConnectionClosed => "CONNECTION_CLOSED",
            Event::ConnectionError => "CONNECTION_ERROR",

            Event::AdminCallBlocked => "ADMIN_CALL_BLOCKED",
            Event::AuditAppendFailed => "AUDIT_APPEND_FAILED",

            Event::RebuildBegin => "REBUILD_BEGIN",
            Event::RebuildFailed => "REBUILD_FAILED",
            Event::WorkflowEventLogged => "WORKFLOW_EVENT_LOGGED",
            Event::RestartRecordPersisted => "RESTART_RECORD_PERSISTED",
            Event::WorkflowAuditFailed => "WORKFLOW_AUDIT_FAILED",
            Event::RestartTriggered => "RESTART_TRIGGERED",
            Event::WorkflowBusy => "WORKFLOW_BUSY",
        }
    }

    /// Severity the event is normally logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::BindFailed => Severity::Fatal,
            Event::AuditAppendFailed
            | Event::RebuildFailed
            | Event::WorkflowAuditFailed
            | Event::ConnectionError => Severity::Error,
            Event::AdminCallBlocked | Event::WorkflowBusy => Severity::Warn,
            Event::ConnectionOpened | Event::ConnectionClosed => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
