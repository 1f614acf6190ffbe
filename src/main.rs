//! admin-gate entry point
//!
//! Parses arguments, runs the command, and exits with its code. After a
//! restart request that is the configured restart code, so a supervisor
//! can start a fresh process.

use admin_gate::cli;

#[tokio::main]
async fn main() {
    match cli::run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
