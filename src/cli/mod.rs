//! CLI module for admin-gate
//!
//! Provides command-line interface for:
//! - check: Validate configuration and composition
//! - serve: Run the WebSocket admin server
//! - methods: List the admin method surface

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{assemble, check, methods, run, run_command, serve, Assembly};
pub use config::AdminConfig;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::write_response;
