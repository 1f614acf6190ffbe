//! CLI command implementations
//!
//! Every command loads the config and composes the same gate; only
//! `serve` puts it behind a socket.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::admin::{DispatchGate, GateSettings, Namespace, NamespaceRegistry, ProtectionMap, Uid};
use crate::observability::{AuditLog, Event, FileAuditLog, Logger, MemoryAuditLog};
use crate::services::build::{CommandBuildPipeline, NoopBuildPipeline};
use crate::services::memory::{
    MemoryEventLog, MemoryIdentityService, MemoryPrivilegeRegistry, MemorySearchIndex,
    MemorySessionStore, MemoryStateStore, ScriptedNamespace,
};
use crate::services::{Broadcaster, BuildPipeline, ProcessControl, Services, SessionStore};
use crate::transport::{AdminSocketServer, ConnectionHub, Shutdown, ShutdownHandle};

use super::args::{Cli, Command};
use super::config::AdminConfig;
use super::errors::{CliError, CliResult};
use super::io::write_response;

/// A composed gate plus what the transport needs next to it
pub struct Assembly {
    pub gate: DispatchGate,
    pub sessions: Arc<dyn SessionStore>,
    pub protection: ProtectionMap,
}

/// Parse arguments and run; returns the process exit code
pub async fn run() -> CliResult<i32> {
    let cli = Cli::parse_args();
    run_command(cli.command).await
}

pub async fn run_command(cmd: Command) -> CliResult<i32> {
    match cmd {
        Command::Check { config } => check(&config),
        Command::Serve { config } => serve(&config).await,
        Command::Methods { config } => methods(&config),
    }
}

/// Compose the gate from configuration
pub fn assemble(
    config: &AdminConfig,
    broadcaster: Arc<dyn Broadcaster>,
    process: Arc<dyn ProcessControl>,
) -> CliResult<Assembly> {
    let protection = config.protection_map();

    let privileges = config
        .grants
        .iter()
        .flat_map(|(uid, privs)| privs.iter().map(move |p| (*uid, p.clone())))
        .fold(MemoryPrivilegeRegistry::new(protection.clone()), |reg, (uid, p)| {
            reg.with_grant(uid, p)
        });

    let identity = config.user_locales.iter().fold(
        MemoryIdentityService::new().with_admins(config.administrators.iter().copied().map(Uid)),
        |id, (uid, locale)| id.with_locale(*uid, locale.clone()),
    );

    let search = config
        .dictionaries
        .iter()
        .fold(MemorySearchIndex::new(), |idx, (locale, dict)| {
            idx.with_dictionary(locale.clone(), dict.clone())
        });

    let sessions = config
        .sessions
        .iter()
        .fold(MemorySessionStore::new(), |store, (token, uid)| {
            store.with_session(token.clone(), *uid)
        });

    let build: Arc<dyn BuildPipeline> = match CommandBuildPipeline::from_argv(&config.build_command) {
        Some(pipeline) => Arc::new(pipeline),
        None => Arc::new(NoopBuildPipeline),
    };

    let audit: Arc<dyn AuditLog> = match &config.audit_log_path {
        Some(path) => Arc::new(FileAuditLog::open(path).map_err(|e| {
            CliError::io_error(format!("Failed to open audit log {}: {}", path, e))
        })?),
        None => Arc::new(MemoryAuditLog::new()),
    };

    let services = Services {
        privileges: Arc::new(privileges),
        identity: Arc::new(identity),
        event_log: Arc::new(MemoryEventLog::new()),
        state: Arc::new(MemoryStateStore::new()),
        broadcaster,
        build,
        search: Arc::new(search),
        process,
        audit,
    };

    let gate = DispatchGate::new(
        services,
        namespace_registry(config)?,
        GateSettings {
            default_locale: config.default_locale.clone(),
        },
    );

    Ok(Assembly {
        gate,
        sessions: Arc::new(sessions),
        protection,
    })
}

fn namespace_registry(config: &AdminConfig) -> CliResult<NamespaceRegistry> {
    let builder = Namespace::ALL.iter().fold(NamespaceRegistry::builder(), |builder, ns| {
        let module = config
            .namespace_methods
            .get(ns.as_str())
            .into_iter()
            .flatten()
            .fold(ScriptedNamespace::new(*ns), |module, (method, response)| {
                module.with_method(method.clone(), response.clone())
            });
        builder.register(Arc::new(module))
    });
    Ok(builder.build()?)
}

/// Compose without a live socket
fn assemble_offline(config: &AdminConfig) -> CliResult<Assembly> {
    assemble(
        config,
        Arc::new(ConnectionHub::new()),
        Arc::new(ShutdownHandle::new()),
    )
}

/// Validate config and composition, then report a summary
pub fn check(config_path: &Path) -> CliResult<i32> {
    let config = AdminConfig::load(config_path)?;
    let assembly = assemble_offline(&config)?;

    write_response(json!({
        "methods": assembly.gate.methods().len(),
        "protected": assembly.protection.len(),
        "namespaces": Namespace::ALL.len(),
    }))?;
    Ok(0)
}

/// Print every method with the privileges that gate it
pub fn methods(config_path: &Path) -> CliResult<i32> {
    let config = AdminConfig::load(config_path)?;
    let assembly = assemble_offline(&config)?;

    let listing: Vec<Value> = assembly
        .gate
        .methods()
        .into_iter()
        .map(|method| {
            let privileges = assembly.protection.get(&method).map(|req| {
                req.privileges()
                    .iter()
                    .map(|p| p.as_str().to_string())
                    .collect::<Vec<_>>()
            });
            json!({ "method": method, "privileges": privileges })
        })
        .collect();

    write_response(Value::Array(listing))?;
    Ok(0)
}

/// Run the socket server until stopped or restarted
pub async fn serve(config_path: &Path) -> CliResult<i32> {
    let config = AdminConfig::load(config_path)?;
    Logger::set_min_severity(config.min_severity()?);
    Logger::info(
        Event::ConfigLoaded,
        &[("path", &config_path.display().to_string())],
    );

    let hub = Arc::new(ConnectionHub::new());
    let shutdown = ShutdownHandle::new();
    let assembly = assemble(&config, hub.clone(), Arc::new(shutdown.clone()))?;

    let server = AdminSocketServer::new(
        config.socket_config(),
        assembly.gate,
        hub,
        assembly.sessions,
        shutdown.clone(),
    );

    let stopper = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.stop();
        }
    });

    match server.run().await? {
        Shutdown::Restart => Ok(config.restart_exit_code),
        Shutdown::Stop => Ok(0),
    }
}
