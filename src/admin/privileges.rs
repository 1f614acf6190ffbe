//! # Admin Privileges
//!
//! Protection map from method name to the privileges that unlock it.
//!
//! A method missing from the map is unprotected. A method mapped to an
//! empty list can only be called by administrators.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A named capability grant, e.g. `admin:settings`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Privilege(String);

impl Privilege {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Privileges attached to one protected method. Holding any one of them
/// is enough.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivilegeRequirement {
    privileges: Vec<Privilege>,
}

impl PrivilegeRequirement {
    /// Parse a `;`-separated privilege list (`"admin:settings;admin:admins-mods"`).
    /// Blank segments are dropped, so `""` parses to an empty requirement.
    pub fn parse(spec: &str) -> Self {
        let privileges = spec
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Privilege::new)
            .collect();
        Self { privileges }
    }

    pub fn privileges(&self) -> &[Privilege] {
        &self.privileges
    }

    pub fn is_empty(&self) -> bool {
        self.privileges.is_empty()
    }
}

/// Read-only protection map, built once at startup
#[derive(Debug, Clone, Default)]
pub struct ProtectionMap {
    entries: HashMap<String, PrivilegeRequirement>,
}

impl ProtectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `method -> "priv1;priv2"` pairs as found in configuration
    pub fn from_specs<I, K, V>(specs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let entries = specs
            .into_iter()
            .map(|(method, spec)| (method.into(), PrivilegeRequirement::parse(spec.as_ref())))
            .collect();
        Self { entries }
    }

    pub fn get(&self, method: &str) -> Option<&PrivilegeRequirement> {
        self.entries.get(method)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
