//! # In-Memory Services
//!
//! Process-local collaborators. The dev server runs on them; tests use
//! their recording and failure-injection hooks.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    Broadcaster, BuildPipeline, EventLog, IdentityService, PrivilegeRegistry, ProcessControl,
    SearchIndex, ServiceError, ServiceResult, SessionStore, StateStore,
};
use crate::admin::identity::{CallerIdentity, Uid};
use crate::admin::method::Namespace;
use crate::admin::namespace::AdminNamespace;
use crate::admin::privileges::{Privilege, PrivilegeRequirement, ProtectionMap};
use crate::admin::workflow::EventDescriptor;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Injected failure, if armed
#[derive(Debug, Default)]
struct FailSwitch(Mutex<Option<String>>);

impl FailSwitch {
    fn arm(&self, message: &str) {
        *lock(&self.0) = Some(message.to_string());
    }

    fn check(&self, service: &'static str) -> ServiceResult<()> {
        match lock(&self.0).as_ref() {
            Some(message) => Err(ServiceError::new(service, message.clone())),
            None => Ok(()),
        }
    }
}

// ==================
// Event Log
// ==================

#[derive(Debug, Default)]
struct EventLogState {
    next_id: i64,
    entries: Vec<(i64, EventDescriptor)>,
    delete_batches: Vec<Vec<i64>>,
    cleared: usize,
}

/// Event log keyed by sequential ids starting at 1
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    state: Mutex<EventLogState>,
    failure: FailSwitch,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `message`
    pub fn fail_writes(&self, message: &str) {
        self.failure.arm(message);
    }

    /// Recorded events, oldest first
    pub fn recorded(&self) -> Vec<EventDescriptor> {
        lock(&self.state).entries.iter().map(|(_, e)| e.clone()).collect()
    }

    /// Ids of the events still present
    pub fn ids(&self) -> Vec<i64> {
        lock(&self.state).entries.iter().map(|(id, _)| *id).collect()
    }

    /// Every id list passed to `delete_by_ids`
    pub fn delete_batches(&self) -> Vec<Vec<i64>> {
        lock(&self.state).delete_batches.clone()
    }

    /// Number of `delete_all` calls
    pub fn clear_count(&self) -> usize {
        lock(&self.state).cleared
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn record(&self, event: &EventDescriptor) -> ServiceResult<()> {
        self.failure.check("event log")?;
        let mut state = lock(&self.state);
        state.next_id += 1;
        let id = state.next_id;
        state.entries.push((id, event.clone()));
        Ok(())
    }

    async fn delete_by_ids(&self, ids: &[i64]) -> ServiceResult<()> {
        self.failure.check("event log")?;
        let mut state = lock(&self.state);
        state.delete_batches.push(ids.to_vec());
        state.entries.retain(|(id, _)| !ids.contains(id));
        Ok(())
    }

    async fn delete_all(&self) -> ServiceResult<()> {
        self.failure.check("event log")?;
        let mut state = lock(&self.state);
        state.entries.clear();
        state.cleared += 1;
        Ok(())
    }
}

// ==================
// State Store
// ==================

#[derive(Debug, Default)]
pub struct MemoryStateStore {
    objects: Mutex<HashMap<String, Value>>,
    failure: FailSwitch,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, message: &str) {
        self.failure.arm(message);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        lock(&self.objects).get(key).cloned()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn put(&self, key: &str, record: Value) -> ServiceResult<()> {
        self.failure.check("state store")?;
        lock(&self.objects).insert(key.to_string(), record);
        Ok(())
    }
}

// ==================
// Identity Service
// ==================

#[derive(Debug, Default)]
pub struct MemoryIdentityService {
    administrators: HashSet<Uid>,
    locales: HashMap<Uid, String>,
    session_wipes: Mutex<Vec<Uid>>,
    failure: FailSwitch,
}

impl MemoryIdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_admin(mut self, uid: impl Into<Uid>) -> Self {
        self.administrators.insert(uid.into());
        self
    }

    pub fn with_admins<I: IntoIterator<Item = Uid>>(mut self, uids: I) -> Self {
        self.administrators.extend(uids);
        self
    }

    pub fn with_locale(mut self, uid: impl Into<Uid>, locale: impl Into<String>) -> Self {
        self.locales.insert(uid.into(), locale.into());
        self
    }

    /// Make every subsequent call fail with `message`
    pub fn fail_with(&self, message: &str) {
        self.failure.arm(message);
    }

    /// Who requested each session wipe
    pub fn session_wipes(&self) -> Vec<Uid> {
        lock(&self.session_wipes).clone()
    }
}

#[async_trait]
impl IdentityService for MemoryIdentityService {
    async fn is_administrator(&self, uid: Uid) -> ServiceResult<bool> {
        self.failure.check("identity")?;
        Ok(self.administrators.contains(&uid))
    }

    async fn locale_setting(&self, uid: Uid) -> ServiceResult<Option<String>> {
        self.failure.check("identity")?;
        Ok(self.locales.get(&uid).cloned())
    }

    async fn delete_all_sessions(&self, requested_by: Uid) -> ServiceResult<()> {
        self.failure.check("identity")?;
        lock(&self.session_wipes).push(requested_by);
        Ok(())
    }
}

// ==================
// Privilege Registry
// ==================

#[derive(Debug, Default)]
pub struct MemoryPrivilegeRegistry {
    protection: ProtectionMap,
    grants: HashMap<Uid, HashSet<Privilege>>,
    checks: Mutex<Vec<(Privilege, Uid)>>,
    failure: FailSwitch,
}

impl MemoryPrivilegeRegistry {
    pub fn new(protection: ProtectionMap) -> Self {
        Self {
            protection,
            ..Self::default()
        }
    }

    pub fn with_grant(mut self, uid: impl Into<Uid>, privilege: impl Into<String>) -> Self {
        self.grants
            .entry(uid.into())
            .or_default()
            .insert(Privilege::new(privilege));
        self
    }

    /// Make every subsequent `holds` fail with `message`
    pub fn fail_with(&self, message: &str) {
        self.failure.arm(message);
    }

    /// Every `holds` evaluation, in call order
    pub fn checks(&self) -> Vec<(Privilege, Uid)> {
        lock(&self.checks).clone()
    }
}

#[async_trait]
impl PrivilegeRegistry for MemoryPrivilegeRegistry {
    fn requirement(&self, method: &str) -> Option<PrivilegeRequirement> {
        self.protection.get(method).cloned()
    }

    async fn holds(&self, privilege: &Privilege, uid: Uid) -> ServiceResult<bool> {
        lock(&self.checks).push((privilege.clone(), uid));
        self.failure.check("privileges")?;
        Ok(self
            .grants
            .get(&uid)
            .map(|held| held.contains(privilege))
            .unwrap_or(false))
    }
}

// ==================
// Search Index
// ==================

#[derive(Debug, Default)]
pub struct MemorySearchIndex {
    dictionaries: HashMap<String, Value>,
    requested: Mutex<Vec<String>>,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dictionary(mut self, locale: impl Into<String>, dictionary: Value) -> Self {
        self.dictionaries.insert(locale.into(), dictionary);
        self
    }

    /// Locales requested so far
    pub fn requested(&self) -> Vec<String> {
        lock(&self.requested).clone()
    }
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn dictionary(&self, locale: &str) -> ServiceResult<Value> {
        lock(&self.requested).push(locale.to_string());
        Ok(self
            .dictionaries
            .get(locale)
            .cloned()
            .unwrap_or_else(|| json!([])))
    }
}

// ==================
// Build Pipeline
// ==================

#[derive(Debug, Default)]
pub struct ScriptedBuildPipeline {
    runs: AtomicUsize,
    failure: FailSwitch,
}

impl ScriptedBuildPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, message: &str) {
        self.failure.arm(message);
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BuildPipeline for ScriptedBuildPipeline {
    async fn rebuild_all(&self) -> ServiceResult<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.failure.check("build")
    }
}

// ==================
// Process Control
// ==================

/// Counts restart requests instead of restarting
#[derive(Debug, Default)]
pub struct RecordingProcessControl {
    restarts: AtomicUsize,
}

impl RecordingProcessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restart_count(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }
}

impl ProcessControl for RecordingProcessControl {
    fn trigger_restart(&self) {
        self.restarts.fetch_add(1, Ordering::SeqCst);
    }
}

// ==================
// Broadcaster
// ==================

/// Recipient set of one emission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitTarget {
    All,
    Group(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub target: EmitTarget,
    pub event: String,
    pub payload: Value,
}

/// Records emissions instead of delivering them
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    emissions: Mutex<Vec<Emission>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emissions(&self) -> Vec<Emission> {
        lock(&self.emissions).clone()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn emit_all(&self, event: &str, payload: Value) {
        lock(&self.emissions).push(Emission {
            target: EmitTarget::All,
            event: event.to_string(),
            payload,
        });
    }

    fn emit_to_group(&self, group: &str, event: &str, payload: Value) {
        lock(&self.emissions).push(Emission {
            target: EmitTarget::Group(group.to_string()),
            event: event.to_string(),
            payload,
        });
    }
}

// ==================
// Session Store
// ==================

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    tokens: HashMap<String, Uid>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, token: impl Into<String>, uid: impl Into<Uid>) -> Self {
        self.tokens.insert(token.into(), uid.into());
        self
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn resolve(&self, token: &str) -> ServiceResult<Option<Uid>> {
        Ok(self.tokens.get(token).copied())
    }
}

// ==================
// Scripted Namespace
// ==================

/// Namespace whose methods return canned values and record their calls
#[derive(Debug)]
pub struct ScriptedNamespace {
    namespace: Namespace,
    responses: HashMap<String, Value>,
    calls: Mutex<Vec<(String, Uid, Value)>>,
}

impl ScriptedNamespace {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_method(mut self, method: impl Into<String>, response: Value) -> Self {
        self.responses.insert(method.into(), response);
        self
    }

    /// `(method, caller uid, args)` for every call, in order
    pub fn calls(&self) -> Vec<(String, Uid, Value)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl AdminNamespace for ScriptedNamespace {
    fn namespace(&self) -> Namespace {
        self.namespace
    }

    fn has_method(&self, method: &str) -> bool {
        self.responses.contains_key(method)
    }

    fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.responses.keys().cloned().collect();
        names.sort();
        names
    }

    async fn call(&self, caller: &CallerIdentity, method: &str, args: Value) -> ServiceResult<Value> {
        lock(&self.calls).push((method.to_string(), caller.uid, args));
        self.responses
            .get(method)
            .cloned()
            .ok_or_else(|| ServiceError::new("namespace", format!("unknown method {}", method)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::workflow::EventKind;

    #[tokio::test]
    async fn test_event_log_ids_and_deletion() {
        let log = MemoryEventLog::new();
        let caller = CallerIdentity::new(1, "::1");
        for _ in 0..3 {
            log.record(&EventDescriptor::new(EventKind::Restart, &caller))
                .await
                .unwrap();
        }
        assert_eq!(log.ids(), vec![1, 2, 3]);

        log.delete_by_ids(&[1, 3]).await.unwrap();
        assert_eq!(log.ids(), vec![2]);
        assert_eq!(log.delete_batches(), vec![vec![1, 3]]);

        log.delete_all().await.unwrap();
        assert!(log.ids().is_empty());
        assert_eq!(log.clear_count(), 1);
    }

    #[tokio::test]
    async fn test_fail_switch() {
        let store = MemoryStateStore::new();
        store.fail_writes("read-only");
        let err = store.put("k", json!({})).await.unwrap_err();
        assert_eq!(err, ServiceError::new("state store", "read-only"));
        assert!(store.get("k").is_none());
    }

    #[tokio::test]
    async fn test_privilege_grants() {
        let registry = MemoryPrivilegeRegistry::new(ProtectionMap::new())
            .with_grant(5, "admin:settings");

        assert!(registry.holds(&Privilege::new("admin:settings"), Uid(5)).await.unwrap());
        assert!(!registry.holds(&Privilege::new("admin:settings"), Uid(6)).await.unwrap());
        assert_eq!(registry.checks().len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_namespace() {
        let ns = ScriptedNamespace::new(Namespace::Tags).with_method("list", json!(["rust"]));
        let caller = CallerIdentity::new(2, "::1");

        assert!(ns.has_method("list"));
        assert!(!ns.has_method("create"));
        let out = ns.call(&caller, "list", Value::Null).await.unwrap();
        assert_eq!(out, json!(["rust"]));
        assert_eq!(ns.calls().len(), 1);
    }
}
