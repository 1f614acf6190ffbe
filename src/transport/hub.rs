//! # Connection Hub
//!
//! Live connections and the user group each one joined. Broadcasts fan
//! out through each connection's outgoing queue.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde_json::Value;
use tokio::sync::mpsc;

use super::protocol::ServerMessage;
use crate::services::Broadcaster;

/// Outgoing queue of one connection
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

struct Connection {
    outbox: Outbox,
    group: Option<String>,
}

/// Registry of open connections
#[derive(Default)]
pub struct ConnectionHub {
    connections: RwLock<HashMap<String, Connection>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, connection_id: &str, outbox: Outbox) {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(connection_id.to_string(), Connection { outbox, group: None });
    }

    /// Put a connection in `group`, leaving any previous one
    pub fn join_group(&self, connection_id: &str, group: String) {
        let mut conns = self.connections.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(conn) = conns.get_mut(connection_id) {
            conn.group = Some(group);
        }
    }

    pub fn remove(&self, connection_id: &str) {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(connection_id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn group_size(&self, group: &str) -> usize {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|c| c.group.as_deref() == Some(group))
            .count()
    }

    fn send_where(&self, event: &str, payload: Value, pred: impl Fn(&Connection) -> bool) {
        let conns = self.connections.read().unwrap_or_else(PoisonError::into_inner);
        for conn in conns.values().filter(|c| pred(c)) {
            // A closed outbox means the connection is being torn down
            let _ = conn.outbox.send(ServerMessage::Event {
                name: event.to_string(),
                payload: payload.clone(),
            });
        }
    }
}

impl Broadcaster for ConnectionHub {
    fn emit_all(&self, event: &str, payload: Value) {
        self.send_where(event, payload, |_| true);
    }

    fn emit_to_group(&self, group: &str, event: &str, payload: Value) {
        self.send_where(event, payload, |c| c.group.as_deref() == Some(group));
    }
}
