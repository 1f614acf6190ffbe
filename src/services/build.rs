//! # Build Pipelines
//!
//! A build is an external command; a non-zero exit fails the build.

use async_trait::async_trait;
use tokio::process::Command;

use super::{BuildPipeline, ServiceError, ServiceResult};

/// Runs `program args..` and waits for it to exit
#[derive(Debug, Clone)]
pub struct CommandBuildPipeline {
    program: String,
    args: Vec<String>,
}

impl CommandBuildPipeline {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a `[program, arg, ...]` list. Empty lists yield `None`.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

#[async_trait]
impl BuildPipeline for CommandBuildPipeline {
    async fn rebuild_all(&self) -> ServiceResult<()> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| ServiceError::new("build", format!("failed to spawn {}: {}", self.program, e)))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        let message = if stderr.is_empty() {
            format!("{} exited with {}", self.program, output.status)
        } else {
            format!("{} exited with {}: {}", self.program, output.status, stderr)
        };
        Err(ServiceError::new("build", message))
    }
}

/// Used when no build command is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBuildPipeline;

#[async_trait]
impl BuildPipeline for NoopBuildPipeline {
    async fn rebuild_all(&self) -> ServiceResult<()> {
        Ok(())
    }
}
