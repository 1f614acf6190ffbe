//! CLI argument definitions using clap
//!
//! Commands:
//! - admin-gate check --config <path>
//! - admin-gate serve --config <path>
//! - admin-gate methods --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// admin-gate - privilege-gated admin RPC server
#[derive(Parser, Debug)]
#[command(name = "admin-gate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the configuration and composed method surface
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./admin-gate.json")]
        config: PathBuf,
    },

    /// Run the WebSocket admin server
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./admin-gate.json")]
        config: PathBuf,
    },

    /// Print every admin method with its required privileges
    Methods {
        /// Path to configuration file
        #[arg(long, default_value = "./admin-gate.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
