//! # Admin Socket Server
//!
//! WebSocket front of the dispatch gate. A connection authenticates once
//! with a session token and then issues calls; each call runs on its own
//! task so a slow rebuild never blocks heartbeats or other calls.
//!
//! restart and reload are serialized process-wide: while one is running,
//! another authorized one fails fast with `TRANSPORT_WORKFLOW_IN_PROGRESS`.
//! Authorization runs first, so a denied caller gets `ADMIN_UNAUTHORIZED`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time::{interval_at, timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use uuid::Uuid;

use super::errors::{TransportError, TransportResult};
use super::hub::{ConnectionHub, Outbox};
use super::process::{Shutdown, ShutdownHandle};
use super::protocol::{ClientMessage, ServerMessage};
use crate::admin::{CallerIdentity, DispatchGate};
use crate::observability::{Event, Logger};
use crate::services::SessionStore;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Socket server configuration
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Bind address
    pub bind_addr: String,

    /// Heartbeat interval in seconds
    pub heartbeat_interval_secs: u64,

    /// How long open connections get to finish on shutdown
    pub shutdown_grace_secs: u64,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:4567".to_string(),
            heartbeat_interval_secs: 25,
            shutdown_grace_secs: 5,
        }
    }
}

/// State shared by every connection task
#[derive(Clone)]
struct ConnectionContext {
    gate: Arc<DispatchGate>,
    hub: Arc<ConnectionHub>,
    sessions: Arc<dyn SessionStore>,
    shutdown: ShutdownHandle,
    workflow_lock: Arc<Mutex<()>>,
    heartbeat: Duration,
}

/// WebSocket server for the admin surface
pub struct AdminSocketServer {
    config: SocketConfig,
    ctx: ConnectionContext,
}

impl AdminSocketServer {
    /// `hub` and `shutdown` must be the broadcaster and process control
    /// the gate was built with.
    pub fn new(
        config: SocketConfig,
        gate: DispatchGate,
        hub: Arc<ConnectionHub>,
        sessions: Arc<dyn SessionStore>,
        shutdown: ShutdownHandle,
    ) -> Self {
        let ctx = ConnectionContext {
            gate: Arc::new(gate),
            hub,
            sessions,
            shutdown,
            workflow_lock: Arc::new(Mutex::new(())),
            heartbeat: Duration::from_secs(config.heartbeat_interval_secs.max(1)),
        };
        Self { config, ctx }
    }

    pub async fn bind(&self) -> TransportResult<TcpListener> {
        TcpListener::bind(&self.config.bind_addr).await.map_err(|e| {
            Logger::fatal(
                Event::BindFailed,
                &[("addr", &self.config.bind_addr), ("error", &e.to_string())],
            );
            TransportError::Bind {
                addr: self.config.bind_addr.clone(),
                reason: e.to_string(),
            }
        })
    }

    /// Bind and serve until shutdown
    pub async fn run(&self) -> TransportResult<Shutdown> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accept connections until a stop or restart is signalled
    pub async fn serve(&self, listener: TcpListener) -> TransportResult<Shutdown> {
        let addr = listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| self.config.bind_addr.clone());
        Logger::info(Event::Serving, &[("addr", &addr)]);

        let mut shutdown_rx = self.ctx.shutdown.subscribe();
        let mut connections = JoinSet::new();

        let reason = loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let ctx = self.ctx.clone();
                            connections.spawn(async move {
                                if let Err(e) = ctx.handle_connection(stream, peer).await {
                                    Logger::error(
                                        Event::ConnectionError,
                                        &[("peer", &peer.to_string()), ("error", &e.to_string())],
                                    );
                                }
                            });
                        }
                        Err(e) => {
                            Logger::error(Event::ConnectionError, &[("error", &e.to_string())]);
                        }
                    }
                }

                Some(_) = connections.join_next(), if !connections.is_empty() => {}

                signal = shutdown_rx.recv() => {
                    break signal.unwrap_or(Shutdown::Stop);
                }
            }
        };

        let grace = Duration::from_secs(self.config.shutdown_grace_secs);
        let drained = timeout(grace, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            connections.abort_all();
        }

        let reason_name = match reason {
            Shutdown::Stop => "stop",
            Shutdown::Restart => "restart",
        };
        Logger::info(Event::ShutdownComplete, &[("reason", reason_name)]);
        Ok(reason)
    }
}

impl ConnectionContext {
    async fn handle_connection(self, stream: TcpStream, peer: SocketAddr) -> TransportResult<()> {
        let ws_stream = accept_async(stream)
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;
        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        let connection_id = Uuid::new_v4().to_string();
        Logger::trace(
            Event::ConnectionOpened,
            &[("connection_id", &connection_id), ("peer", &peer.to_string())],
        );

        let (outbox, mut outgoing) = mpsc::unbounded_channel::<ServerMessage>();
        self.hub.register(&connection_id, outbox.clone());
        let mut shutdown_rx = self.shutdown.subscribe();

        let mut identity: Option<CallerIdentity> = None;
        let mut calls = JoinSet::new();

        let _ = outbox.send(ServerMessage::System {
            message: format!("Connected. Connection ID: {}", connection_id),
        });

        let mut heartbeat = interval_at(Instant::now() + self.heartbeat, self.heartbeat);

        loop {
            tokio::select! {
                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ClientMessage>(&text) {
                                Ok(client_msg) => {
                                    self.process_client_message(
                                        &connection_id,
                                        peer,
                                        client_msg,
                                        &mut identity,
                                        &outbox,
                                        &mut calls,
                                    )
                                    .await;
                                }
                                Err(e) => {
                                    reject(&outbox, None, TransportError::InvalidMessage(e.to_string()));
                                }
                            }
                        }
                        Some(Ok(Message::Binary(_))) => {
                            reject(&outbox, None, TransportError::Unsupported);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if ws_tx.send(Message::Pong(data)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(e)) => {
                            Logger::error(
                                Event::ConnectionError,
                                &[("connection_id", &connection_id), ("error", &e.to_string())],
                            );
                            break;
                        }
                        _ => {}
                    }
                }

                Some(server_msg) = outgoing.recv() => {
                    if !write(&mut ws_tx, &server_msg).await {
                        break;
                    }
                }

                Some(_) = calls.join_next(), if !calls.is_empty() => {}

                _ = heartbeat.tick() => {
                    let _ = outbox.send(ServerMessage::Heartbeat {
                        ref_id: None,
                        server_time: chrono::Utc::now().timestamp_millis(),
                    });
                }

                _ = shutdown_rx.recv() => {
                    // Let in-flight calls answer before closing
                    while calls.join_next().await.is_some() {}
                    while let Ok(server_msg) = outgoing.try_recv() {
                        if !write(&mut ws_tx, &server_msg).await {
                            break;
                        }
                    }
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }

        self.hub.remove(&connection_id);
        Logger::trace(Event::ConnectionClosed, &[("connection_id", &connection_id)]);
        Ok(())
    }

    async fn process_client_message(
        &self,
        connection_id: &str,
        peer: SocketAddr,
        message: ClientMessage,
        identity: &mut Option<CallerIdentity>,
        outbox: &Outbox,
        calls: &mut JoinSet<()>,
    ) {
        match message {
            ClientMessage::Auth { token } => match self.sessions.resolve(&token).await {
                Ok(Some(uid)) => {
                    let caller = CallerIdentity::new(uid, peer.ip().to_string());
                    self.hub.join_group(connection_id, caller.group_key());
                    Logger::info(
                        Event::ConnectionAuthenticated,
                        &[("connection_id", connection_id), ("uid", &uid.to_string())],
                    );
                    *identity = Some(caller);
                    let _ = outbox.send(ServerMessage::Authenticated { uid });
                }
                Ok(None) => reject(outbox, None, TransportError::AuthenticationFailed),
                Err(e) => reject(outbox, None, TransportError::Session(e)),
            },

            ClientMessage::Call { id, method, args } => match identity {
                Some(caller) => {
                    let ctx = self.clone();
                    let caller = caller.clone();
                    let outbox = outbox.clone();
                    calls.spawn(async move { ctx.run_call(caller, id, method, args, outbox).await });
                }
                None => reject(outbox, Some(id), TransportError::AuthenticationRequired),
            },

            ClientMessage::Heartbeat { ref_id } => {
                let _ = outbox.send(ServerMessage::Heartbeat {
                    ref_id,
                    server_time: chrono::Utc::now().timestamp_millis(),
                });
            }
        }
    }

    async fn run_call(&self, caller: CallerIdentity, id: u64, method: String, args: Value, outbox: Outbox) {
        let call = match self.gate.authorize_call(&caller, &method).await {
            Ok(call) => call,
            Err(e) => {
                let _ = outbox.send(ServerMessage::error(Some(id), e.code(), e.to_string()));
                return;
            }
        };

        // Locked only after a grant; denied callers never contend
        let _workflow_guard = if call.is_workflow() {
            match self.workflow_lock.clone().try_lock_owned() {
                Ok(guard) => Some(guard),
                Err(_) => {
                    Logger::warn(
                        Event::WorkflowBusy,
                        &[("method", &method), ("uid", &caller.uid.to_string())],
                    );
                    reject(&outbox, Some(id), TransportError::WorkflowInProgress);
                    return;
                }
            }
        } else {
            None
        };

        let reply = match self.gate.execute(&caller, call, args).await {
            Ok(data) => ServerMessage::Result { id, data },
            Err(e) => ServerMessage::error(Some(id), e.code(), e.to_string()),
        };
        let _ = outbox.send(reply);
    }
}

fn reject(outbox: &Outbox, id: Option<u64>, err: TransportError) {
    let _ = outbox.send(ServerMessage::error(id, err.code(), err.to_string()));
}

/// Returns false once the socket is gone
async fn write(ws_tx: &mut WsSink, message: &ServerMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(json) => ws_tx.send(Message::Text(json)).await.is_ok(),
        Err(e) => {
            Logger::error(Event::ConnectionError, &[("error", &e.to_string())]);
            true
        }
    }
}
