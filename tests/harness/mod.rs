//! Shared host for integration tests
//!
//! A dispatch gate wired to in-memory collaborators, with handles kept
//! to every collaborator so tests can inject failures and inspect what
//! happened.

#![allow(dead_code)]

use std::sync::Arc;

use admin_gate::admin::{DispatchGate, GateSettings, Namespace, NamespaceRegistry, ProtectionMap};
use admin_gate::observability::MemoryAuditLog;
use admin_gate::services::memory::{
    MemoryEventLog, MemoryIdentityService, MemoryPrivilegeRegistry, MemorySearchIndex,
    MemoryStateStore, RecordingBroadcaster, RecordingProcessControl, ScriptedBuildPipeline,
    ScriptedNamespace,
};
use admin_gate::services::Services;
use serde_json::json;

pub struct Host {
    pub gate: DispatchGate,
    pub identity: Arc<MemoryIdentityService>,
    pub privileges: Arc<MemoryPrivilegeRegistry>,
    pub event_log: Arc<MemoryEventLog>,
    pub state: Arc<MemoryStateStore>,
    pub broadcaster: Arc<RecordingBroadcaster>,
    pub build: Arc<ScriptedBuildPipeline>,
    pub search: Arc<MemorySearchIndex>,
    pub process: Arc<RecordingProcessControl>,
    pub audit: MemoryAuditLog,
    pub config_ns: Arc<ScriptedNamespace>,
}

pub struct HostBuilder {
    identity: MemoryIdentityService,
    privileges: MemoryPrivilegeRegistry,
    search: MemorySearchIndex,
    default_locale: Option<String>,
}

impl HostBuilder {
    pub fn new(protection: ProtectionMap) -> Self {
        Self {
            identity: MemoryIdentityService::new(),
            privileges: MemoryPrivilegeRegistry::new(protection),
            search: MemorySearchIndex::new(),
            default_locale: None,
        }
    }

    pub fn identity(mut self, identity: MemoryIdentityService) -> Self {
        self.identity = identity;
        self
    }

    pub fn privileges(mut self, f: impl FnOnce(MemoryPrivilegeRegistry) -> MemoryPrivilegeRegistry) -> Self {
        self.privileges = f(self.privileges);
        self
    }

    pub fn search(mut self, search: MemorySearchIndex) -> Self {
        self.search = search;
        self
    }

    pub fn default_locale(mut self, locale: &str) -> Self {
        self.default_locale = Some(locale.to_string());
        self
    }

    pub fn build(self) -> Host {
        let identity = Arc::new(self.identity);
        let privileges = Arc::new(self.privileges);
        let event_log = Arc::new(MemoryEventLog::new());
        let state = Arc::new(MemoryStateStore::new());
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let build = Arc::new(ScriptedBuildPipeline::new());
        let search = Arc::new(self.search);
        let process = Arc::new(RecordingProcessControl::new());
        let audit = MemoryAuditLog::new();

        let services = Services {
            privileges: privileges.clone(),
            identity: identity.clone(),
            event_log: event_log.clone(),
            state: state.clone(),
            broadcaster: broadcaster.clone(),
            build: build.clone(),
            search: search.clone(),
            process: process.clone(),
            audit: Arc::new(audit.clone()),
        };

        let config_ns = Arc::new(
            ScriptedNamespace::new(Namespace::Config)
                .with_method("set", json!(null))
                .with_method("get", json!({"title": "Forum"})),
        );
        let namespaces = Namespace::ALL
            .iter()
            .filter(|ns| **ns != Namespace::Config)
            .fold(NamespaceRegistry::builder(), |b, ns| {
                b.register(Arc::new(ScriptedNamespace::new(*ns)))
            })
            .register(config_ns.clone())
            .build()
            .expect("every namespace registered");

        let gate = DispatchGate::new(
            services,
            namespaces,
            GateSettings {
                default_locale: self.default_locale,
            },
        );

        Host {
            gate,
            identity,
            privileges,
            event_log,
            state,
            broadcaster,
            build,
            search,
            process,
            audit,
            config_ns,
        }
    }
}

/// Host with admin uid 1 and no protected methods
pub fn host() -> Host {
    HostBuilder::new(ProtectionMap::new())
        .identity(MemoryIdentityService::new().with_admin(1))
        .build()
}
