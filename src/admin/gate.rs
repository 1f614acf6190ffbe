//! # Dispatch Gate
//!
//! One flat method surface: the core methods plus every namespace's
//! methods as `<namespace>.<method>`.
//!
//! ## Order of a call
//! 1. Resolve the name (`MethodNotFound` otherwise)
//! 2. Authorize (`Unauthorized` otherwise, handler never runs)
//! 3. Decode arguments
//! 4. Run the handler
//!
//! Steps 1-2 (`authorize_call`) and 3-4 (`execute`) are separate so the
//! transport can take its workflow lock only after a grant.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::authorize::{Authorizer, Grant};
use super::errors::{AdminError, AdminResult};
use super::identity::CallerIdentity;
use super::method::{CoreMethod, MethodName};
use super::namespace::{AdminNamespace, NamespaceRegistry};
use super::passthrough::{CoreMethods, FireEventArgs};
use super::workflow::RestartWorkflow;
use crate::services::Services;

/// Gate-level settings
#[derive(Debug, Clone, Default)]
pub struct GateSettings {
    /// Site default locale for the search dictionary
    pub default_locale: Option<String>,
}

/// What a method name resolved to
enum Target<'a> {
    Core(CoreMethod),
    Namespace(&'a Arc<dyn AdminNamespace>, String),
}

/// A resolved call that passed authorization
pub struct AuthorizedCall<'a> {
    name: String,
    target: Target<'a>,
    grant: Grant,
}

impl AuthorizedCall<'_> {
    /// Canonical method name
    pub fn method(&self) -> &str {
        &self.name
    }

    pub fn grant(&self) -> &Grant {
        &self.grant
    }

    /// restart or reload
    pub fn is_workflow(&self) -> bool {
        matches!(self.target, Target::Core(core) if core.is_workflow())
    }
}

/// The composed admin surface
#[derive(Clone)]
pub struct DispatchGate {
    authorizer: Authorizer,
    namespaces: NamespaceRegistry,
    core: CoreMethods,
    workflow: RestartWorkflow,
}

impl DispatchGate {
    pub fn new(services: Services, namespaces: NamespaceRegistry, settings: GateSettings) -> Self {
        let authorizer = Authorizer::new(
            services.identity.clone(),
            services.privileges.clone(),
            services.audit.clone(),
        );
        let core = CoreMethods::new(
            services.identity.clone(),
            services.event_log.clone(),
            services.broadcaster.clone(),
            services.search.clone(),
            settings.default_locale,
        );
        let workflow = RestartWorkflow::new(
            services.event_log,
            services.state,
            services.build,
            services.process,
            services.audit,
        );

        Self {
            authorizer,
            namespaces,
            core,
            workflow,
        }
    }

    pub fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }

    /// Run `method` for `caller`
    pub async fn dispatch(&self, caller: &CallerIdentity, method: &str, args: Value) -> AdminResult<Value> {
        let call = self.authorize_call(caller, method).await?;
        self.execute(caller, call, args).await
    }

    /// Resolve `method` and authorize `caller` for it
    pub async fn authorize_call(&self, caller: &CallerIdentity, method: &str) -> AdminResult<AuthorizedCall<'_>> {
        let (name, target) = self.resolve(method)?;
        let grant = self.authorizer.authorize(caller, &name).await?;
        Ok(AuthorizedCall { name, target, grant })
    }

    /// Decode arguments and run an authorized call
    pub async fn execute(&self, caller: &CallerIdentity, call: AuthorizedCall<'_>, args: Value) -> AdminResult<Value> {
        match call.target {
            Target::Core(core) => self.run_core(caller, core, &call.name, args).await,
            Target::Namespace(module, leaf) => Ok(module.call(caller, &leaf, args).await?),
        }
    }

    fn resolve(&self, raw: &str) -> AdminResult<(String, Target<'_>)> {
        let not_found = || AdminError::MethodNotFound(raw.to_string());
        let parsed = MethodName::parse(raw).ok_or_else(not_found)?;
        let name = parsed.to_string();

        let target = match parsed {
            MethodName::Core(core) => Target::Core(core),
            MethodName::Namespaced { namespace, method } => {
                let module = self
                    .namespaces
                    .resolve(namespace, &method)
                    .ok_or_else(not_found)?;
                Target::Namespace(module, method)
            }
        };
        Ok((name, target))
    }

    async fn run_core(
        &self,
        caller: &CallerIdentity,
        method: CoreMethod,
        name: &str,
        args: Value,
    ) -> AdminResult<Value> {
        match method {
            CoreMethod::Restart => {
                self.workflow.restart(caller).await?;
                Ok(Value::Null)
            }
            CoreMethod::Reload => {
                self.workflow.reload(caller).await?;
                Ok(Value::Null)
            }
            CoreMethod::FireEvent => {
                let args: FireEventArgs = decode(name, args)?;
                self.core.fire_event(args);
                Ok(Value::Null)
            }
            CoreMethod::DeleteEvents => {
                let ids: Vec<i64> = decode(name, args)?;
                self.core.delete_events(&ids).await?;
                Ok(Value::Null)
            }
            CoreMethod::DeleteAllEvents => {
                self.core.delete_all_events().await?;
                Ok(Value::Null)
            }
            CoreMethod::GetSearchDict => self.core.get_search_dict(caller).await,
            CoreMethod::DeleteAllSessions => {
                self.core.delete_all_sessions(caller).await?;
                Ok(Value::Null)
            }
            CoreMethod::ReloadAllSessions => {
                self.core.reload_all_sessions(caller);
                Ok(Value::Null)
            }
            CoreMethod::GetServerTime => Ok(json!(self.core.get_server_time())),
        }
    }

    /// Every method name on the surface: core methods first, then
    /// namespace methods sorted
    pub fn methods(&self) -> Vec<String> {
        CoreMethod::ALL
            .iter()
            .map(|m| m.as_str().to_string())
            .chain(self.namespaces.qualified_methods())
            .collect()
    }
}

fn decode<T: DeserializeOwned>(method: &str, args: Value) -> AdminResult<T> {
    serde_json::from_value(args).map_err(|e| AdminError::invalid_arguments(method, e))
}
