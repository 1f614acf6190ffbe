//! # Admin Dispatch
//!
//! Privilege-gated admin method surface.
//!
//! ## Architecture
//!
//! - **Gate**: resolves a method name and runs it after authorization
//! - **Authorizer**: administrator bypass, protection map, any-of privileges
//! - **Namespaces**: fixed table of independently maintained method groups
//! - **Workflow**: rebuild → log → persist → restart
//! - **Passthrough**: core methods that forward to a collaborator

pub mod authorize;
pub mod errors;
pub mod gate;
pub mod identity;
pub mod method;
pub mod namespace;
pub mod passthrough;
pub mod privileges;
pub mod workflow;

pub use authorize::{Authorizer, Grant};
pub use errors::{AdminError, AdminResult};
pub use gate::{AuthorizedCall, DispatchGate, GateSettings};
pub use identity::{CallerIdentity, Uid};
pub use method::{CoreMethod, MethodName, Namespace};
pub use namespace::{AdminNamespace, NamespaceRegistry, RegistryError};
pub use passthrough::{ServerTime, FALLBACK_LOCALE, LIVERELOAD_EVENT};
pub use privileges::{Privilege, PrivilegeRequirement, ProtectionMap};
pub use workflow::{EventDescriptor, EventKind, RestartAuditRecord, RestartWorkflow, WorkflowStage, LAST_RESTART_KEY};
