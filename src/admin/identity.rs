//! # Caller Identity
//!
//! The authenticated actor behind one admin call. Owned by the transport,
//! read-only to the gate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(pub u64);

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Uid {
    fn from(value: u64) -> Self {
        Uid(value)
    }
}

/// Identity attached to a connection for its lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// User the connection is authenticated as
    pub uid: Uid,

    /// Remote address of the connection
    pub ip: String,
}

impl CallerIdentity {
    pub fn new(uid: impl Into<Uid>, ip: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ip: ip.into(),
        }
    }

    /// Broadcast group every connection of this user belongs to
    pub fn group_key(&self) -> String {
        user_group(self.uid)
    }
}

/// Group key for all connections of `uid`
pub fn user_group(uid: Uid) -> String {
    format!("uid_{}", uid)
}
