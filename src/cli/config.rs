//! Configuration file
//!
//! JSON, every key optional. The collaborator tables (administrators,
//! grants, sessions, dictionaries, namespace methods) seed the in-memory
//! services the server runs on.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{CliError, CliResult};
use crate::admin::{MethodName, Namespace, ProtectionMap};
use crate::observability::Severity;
use crate::transport::SocketConfig;

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Socket bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Minimum log severity
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Site default locale for the search dictionary
    #[serde(default)]
    pub default_locale: Option<String>,

    /// Append-only audit file; in-memory when absent
    #[serde(default)]
    pub audit_log_path: Option<String>,

    /// `[program, arg, ...]` run by reload; no-op when empty
    #[serde(default)]
    pub build_command: Vec<String>,

    /// Exit code after a restart, for the supervisor
    #[serde(default = "default_restart_exit_code")]
    pub restart_exit_code: i32,

    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,

    /// Method name to `"priv1;priv2"`
    #[serde(default)]
    pub privileges: BTreeMap<String, String>,

    #[serde(default)]
    pub administrators: Vec<u64>,

    /// uid to privileges held
    #[serde(default)]
    pub grants: BTreeMap<u64, Vec<String>>,

    /// Session token to uid
    #[serde(default)]
    pub sessions: BTreeMap<String, u64>,

    /// uid to locale setting
    #[serde(default)]
    pub user_locales: BTreeMap<u64, String>,

    /// Locale to search dictionary
    #[serde(default)]
    pub dictionaries: BTreeMap<String, Value>,

    /// Namespace to method name to canned response
    #[serde(default)]
    pub namespace_methods: BTreeMap<String, BTreeMap<String, Value>>,
}

fn default_bind_addr() -> String {
    "127.0.0.1:4567".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_restart_exit_code() -> i32 {
    75
} // EX_TEMPFAIL
fn default_heartbeat_interval() -> u64 {
    25
}
fn default_shutdown_grace() -> u64 {
    5
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            log_level: default_log_level(),
            default_locale: None,
            audit_log_path: None,
            build_command: Vec::new(),
            restart_exit_code: default_restart_exit_code(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            shutdown_grace_secs: default_shutdown_grace(),
            privileges: BTreeMap::new(),
            administrators: Vec::new(),
            grants: BTreeMap::new(),
            sessions: BTreeMap::new(),
            user_locales: BTreeMap::new(),
            dictionaries: BTreeMap::new(),
            namespace_methods: BTreeMap::new(),
        }
    }
}

impl AdminConfig {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> CliResult<Self> {
        let config: AdminConfig = serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.bind_addr.trim().is_empty() {
            return Err(CliError::config_error("bind_addr must not be empty"));
        }

        self.min_severity()?;

        if !(1..=255).contains(&self.restart_exit_code) {
            return Err(CliError::config_error(format!(
                "restart_exit_code must be in 1..=255, got {}",
                self.restart_exit_code
            )));
        }

        if self.heartbeat_interval_secs == 0 {
            return Err(CliError::config_error("heartbeat_interval_secs must be > 0"));
        }

        if let Some(program) = self.build_command.first() {
            if program.trim().is_empty() {
                return Err(CliError::config_error("build_command program must not be blank"));
            }
        }

        let mut seen: BTreeMap<String, &str> = BTreeMap::new();
        for method in self.privileges.keys() {
            let canonical = MethodName::parse(method).ok_or_else(|| {
                CliError::config_error(format!("privileges: '{}' is not an admin method", method))
            })?;
            if let Some(first) = seen.insert(canonical.to_string(), method) {
                return Err(CliError::config_error(format!(
                    "privileges: '{}' and '{}' name the same method",
                    first, method
                )));
            }
        }

        for namespace in self.namespace_methods.keys() {
            if Namespace::from_name(namespace).is_none() {
                return Err(CliError::config_error(format!(
                    "namespace_methods: unknown namespace '{}'",
                    namespace
                )));
            }
        }

        Ok(())
    }

    pub fn min_severity(&self) -> CliResult<Severity> {
        Severity::from_name(&self.log_level).ok_or_else(|| {
            CliError::config_error(format!("Invalid log_level: '{}'", self.log_level))
        })
    }

    /// Protection map keyed by canonical method names, so an alias key
    /// protects the method the authorizer actually looks up
    pub fn protection_map(&self) -> ProtectionMap {
        ProtectionMap::from_specs(self.privileges.iter().filter_map(|(method, spec)| {
            MethodName::parse(method).map(|name| (name.to_string(), spec))
        }))
    }

    pub fn socket_config(&self) -> SocketConfig {
        SocketConfig {
            bind_addr: self.bind_addr.clone(),
            heartbeat_interval_secs: self.heartbeat_interval_secs,
            shutdown_grace_secs: self.shutdown_grace_secs,
        }
    }
}
