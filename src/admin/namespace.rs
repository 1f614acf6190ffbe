//! # Namespace Registry
//!
//! Fixed table from `Namespace` to the capability module implementing it.
//! Built once at startup; every namespace must be registered exactly once.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::identity::CallerIdentity;
use super::method::Namespace;
use crate::services::ServiceResult;

/// An independently maintained group of admin methods
#[async_trait]
pub trait AdminNamespace: Send + Sync {
    /// Key this module is registered under
    fn namespace(&self) -> Namespace;

    fn has_method(&self, method: &str) -> bool;

    /// Method names without the namespace prefix
    fn method_names(&self) -> Vec<String>;

    async fn call(&self, caller: &CallerIdentity, method: &str, args: Value) -> ServiceResult<Value>;
}

/// Registry composition errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Namespace registered twice: {0}")]
    Duplicate(Namespace),

    #[error("Namespaces not registered: {}", join(.0))]
    Missing(Vec<Namespace>),
}

fn join(namespaces: &[Namespace]) -> String {
    namespaces
        .iter()
        .map(Namespace::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Immutable namespace table
#[derive(Clone)]
pub struct NamespaceRegistry {
    modules: BTreeMap<Namespace, Arc<dyn AdminNamespace>>,
}

impl NamespaceRegistry {
    pub fn builder() -> NamespaceRegistryBuilder {
        NamespaceRegistryBuilder::default()
    }

    pub fn get(&self, namespace: Namespace) -> Option<&Arc<dyn AdminNamespace>> {
        self.modules.get(&namespace)
    }

    /// Module for `namespace` if it implements `method`
    pub fn resolve(&self, namespace: Namespace, method: &str) -> Option<&Arc<dyn AdminNamespace>> {
        self.get(namespace).filter(|module| module.has_method(method))
    }

    /// Every `<namespace>.<method>` on the surface, sorted
    pub fn qualified_methods(&self) -> Vec<String> {
        self.modules
            .iter()
            .flat_map(|(ns, module)| {
                module
                    .method_names()
                    .into_iter()
                    .map(move |m| format!("{}.{}", ns, m))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[derive(Default)]
pub struct NamespaceRegistryBuilder {
    modules: BTreeMap<Namespace, Arc<dyn AdminNamespace>>,
    duplicate: Option<Namespace>,
}

impl NamespaceRegistryBuilder {
    /// Register a module under the namespace it reports
    pub fn register(mut self, module: Arc<dyn AdminNamespace>) -> Self {
        let namespace = module.namespace();
        if self.modules.insert(namespace, module).is_some() && self.duplicate.is_none() {
            self.duplicate = Some(namespace);
        }
        self
    }

    /// Finish composition. Fails on any duplicate or missing namespace.
    pub fn build(self) -> Result<NamespaceRegistry, RegistryError> {
        if let Some(namespace) = self.duplicate {
            return Err(RegistryError::Duplicate(namespace));
        }

        let missing: Vec<Namespace> = Namespace::ALL
            .iter()
            .copied()
            .filter(|ns| !self.modules.contains_key(ns))
            .collect();
        if !missing.is_empty() {
            return Err(RegistryError::Missing(missing));
        }

        Ok(NamespaceRegistry {
            modules: self.modules,
        })
    }
}
