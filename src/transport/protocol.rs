//! # Wire Protocol
//!
//! JSON text frames, tagged by `type`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::admin::identity::Uid;

/// Message from a client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Bind the connection to a user
    Auth { token: String },

    /// Invoke an admin method
    Call {
        id: u64,
        method: String,
        #[serde(default)]
        args: Value,
    },

    /// Heartbeat/ping
    Heartbeat {
        #[serde(default)]
        ref_id: Option<String>,
    },
}

/// Message to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection-level notice
    System { message: String },

    /// Auth accepted
    Authenticated { uid: Uid },

    /// Successful call
    Result { id: u64, data: Value },

    /// Failed call or protocol error; `id` is set when tied to a call
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        code: String,
        message: String,
    },

    /// Broadcast event
    Event { name: String, payload: Value },

    /// Heartbeat response
    Heartbeat {
        ref_id: Option<String>,
        server_time: i64,
    },
}

impl ServerMessage {
    pub fn error(id: Option<u64>, code: &str, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            id,
            code: code.to_string(),
            message: message.into(),
        }
    }
}
