//! admin-gate - privilege-gated admin RPC dispatch
//!
//! - `admin`: authorization, dispatch gate, restart/reload workflow
//! - `services`: collaborator traits and in-memory implementations
//! - `observability`: structured logging and audit trail
//! - `transport`: WebSocket server over the gate
//! - `cli`: configuration and commands

pub mod admin;
pub mod cli;
pub mod observability;
pub mod services;
pub mod transport;
