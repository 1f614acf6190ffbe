//! # Method Names
//!
//! Admin methods are addressed either as a bare core method (`restart`) or
//! as `<namespace>.<method>`. Namespaces form a closed set so the dispatch
//! table can be checked for completeness when it is built.

use std::fmt;

/// Administrative sub-namespaces composed into the dispatch surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    User,
    Categories,
    Settings,
    Tags,
    Rewards,
    Navigation,
    Rooms,
    Social,
    Themes,
    Plugins,
    Widgets,
    Config,
    Email,
    Analytics,
    Logs,
    Errors,
    Digest,
    Cache,
}

impl Namespace {
    /// Every namespace, in registration order
    pub const ALL: [Namespace; 18] = [
        Namespace::User,
        Namespace::Categories,
        Namespace::Settings,
        Namespace::Tags,
        Namespace::Rewards,
        Namespace::Navigation,
        Namespace::Rooms,
        Namespace::Social,
        Namespace::Themes,
        Namespace::Plugins,
        Namespace::Widgets,
        Namespace::Config,
        Namespace::Email,
        Namespace::Analytics,
        Namespace::Logs,
        Namespace::Errors,
        Namespace::Digest,
        Namespace::Cache,
    ];

    /// Wire name used as the method prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::User => "user",
            Namespace::Categories => "categories",
            Namespace::Settings => "settings",
            Namespace::Tags => "tags",
            Namespace::Rewards => "rewards",
            Namespace::Navigation => "navigation",
            Namespace::Rooms => "rooms",
            Namespace::Social => "social",
            Namespace::Themes => "themes",
            Namespace::Plugins => "plugins",
            Namespace::Widgets => "widgets",
            Namespace::Config => "config",
            Namespace::Email => "email",
            Namespace::Analytics => "analytics",
            Namespace::Logs => "logs",
            Namespace::Errors => "errors",
            Namespace::Digest => "digest",
            Namespace::Cache => "cache",
        }
    }

    /// Look up a namespace by wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|ns| ns.as_str() == name)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level methods implemented by the gate itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreMethod {
    Restart,
    Reload,
    FireEvent,
    DeleteEvents,
    DeleteAllEvents,
    GetSearchDict,
    DeleteAllSessions,
    ReloadAllSessions,
    GetServerTime,
}

impl CoreMethod {
    pub const ALL: [CoreMethod; 9] = [
        CoreMethod::Restart,
        CoreMethod::Reload,
        CoreMethod::FireEvent,
        CoreMethod::DeleteEvents,
        CoreMethod::DeleteAllEvents,
        CoreMethod::GetSearchDict,
        CoreMethod::DeleteAllSessions,
        CoreMethod::ReloadAllSessions,
        CoreMethod::GetServerTime,
    ];

    /// Canonical wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            CoreMethod::Restart => "restart",
            CoreMethod::Reload => "reload",
            CoreMethod::FireEvent => "fireEvent",
            CoreMethod::DeleteEvents => "deleteEvents",
            CoreMethod::DeleteAllEvents => "deleteAllEvents",
            CoreMethod::GetSearchDict => "getSearchDict",
            CoreMethod::DeleteAllSessions => "deleteAllSessions",
            CoreMethod::ReloadAllSessions => "reloadAllSessions",
            CoreMethod::GetServerTime => "getServerTime",
        }
    }

    /// Look up a core method, accepting the long-form search dictionary alias
    pub fn from_name(name: &str) -> Option<Self> {
        if name == "getSearchDictionary" {
            return Some(CoreMethod::GetSearchDict);
        }
        Self::ALL.iter().copied().find(|m| m.as_str() == name)
    }

    /// Whether the method runs the restart/reload workflow
    pub fn is_workflow(&self) -> bool {
        matches!(self, CoreMethod::Restart | CoreMethod::Reload)
    }
}

impl fmt::Display for CoreMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved method name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodName {
    /// Bare top-level method
    Core(CoreMethod),

    /// `<namespace>.<method>`
    Namespaced { namespace: Namespace, method: String },
}

impl MethodName {
    /// Parse a wire method name. Returns `None` when the name cannot
    /// address anything on the surface.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.split_once('.') {
            Some((namespace, method)) => {
                if method.is_empty() {
                    return None;
                }
                let namespace = Namespace::from_name(namespace)?;
                Some(MethodName::Namespaced {
                    namespace,
                    method: method.to_string(),
                })
            }
            None => CoreMethod::from_name(raw).map(MethodName::Core),
        }
    }

    /// The core method, if this is one
    pub fn core(&self) -> Option<CoreMethod> {
        match self {
            MethodName::Core(method) => Some(*method),
            MethodName::Namespaced { .. } => None,
        }
    }
}

impl fmt::Display for MethodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodName::Core(method) => f.write_str(method.as_str()),
            MethodName::Namespaced { namespace, method } => write!(f, "{}.{}", namespace, method),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_core_method() {
        assert_eq!(
            MethodName::parse("restart"),
            Some(MethodName::Core(CoreMethod::Restart))
        );
        assert_eq!(
            MethodName::parse("getSearchDictionary"),
            Some(MethodName::Core(CoreMethod::GetSearchDict))
        );
        assert_eq!(MethodName::parse("shutdown"), None);
    }

    #[test]
    fn test_parse_namespaced_method() {
        let parsed = MethodName::parse("config.set").unwrap();
        assert_eq!(
            parsed,
            MethodName::Namespaced {
                namespace: Namespace::Config,
                method: "set".to_string(),
            }
        );
        assert_eq!(parsed.to_string(), "config.set");
    }

    #[test]
    fn test_parse_rejects_unknown_namespace_and_empty_method() {
        assert_eq!(MethodName::parse("bogus.set"), None);
        assert_eq!(MethodName::parse("config."), None);
        assert_eq!(MethodName::parse(""), None);
    }

    #[test]
    fn test_alias_renders_canonical_name() {
        let parsed = MethodName::parse("getSearchDictionary").unwrap();
        assert_eq!(parsed.to_string(), "getSearchDict");
    }

    #[test]
    fn test_namespace_names_are_unique() {
        for ns in Namespace::ALL {
            assert_eq!(Namespace::from_name(ns.as_str()), Some(ns));
        }
    }
}
