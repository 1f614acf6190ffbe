//! Observability for the admin gate
//!
//! - Structured JSON logging with a typed event vocabulary
//! - Append-only audit trail for denials and restart/reload outcomes
//!
//! # Principles
//!
//! 1. Observability never changes the outcome of a call
//! 2. A failing sink is reported, never propagated
//!
//! # Usage
//!
//! ```ignore
//! use admin_gate::observability::{Event, Logger};
//!
//! Logger::warn(Event::AdminCallBlocked, &[("method", "config.set"), ("uid", "9")]);
//! ```

mod events;
mod logger;
pub mod audit;

pub use audit::{AuditAction, AuditLog, AuditOutcome, AuditRecord, FileAuditLog, MemoryAuditLog};
pub use events::Event;
pub use logger::{Logger, Severity};

/// Append to `log`, reporting a failed write instead of returning it
pub fn append_audit(log: &dyn AuditLog, record: AuditRecord) {
    if let Err(e) = log.append(&record) {
        let detail = e.to_string();
        Logger::event(
            Event::AuditAppendFailed,
            &[("action", record.action.as_str()), ("error", &detail)],
        );
    }
}
