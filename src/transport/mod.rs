//! # Transport
//!
//! WebSocket surface over the dispatch gate:
//! - JSON message protocol
//! - connection hub doubling as the broadcaster
//! - restart signalling to the binary

pub mod errors;
pub mod hub;
pub mod process;
pub mod protocol;
pub mod websocket;

pub use errors::{TransportError, TransportResult};
pub use hub::ConnectionHub;
pub use process::{Shutdown, ShutdownHandle};
pub use protocol::{ClientMessage, ServerMessage};
pub use websocket::{AdminSocketServer, SocketConfig};
