//! # Process Control
//!
//! A restart stops the server loop; the binary then exits with the
//! configured code and the supervisor starts a fresh process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::services::ProcessControl;

/// Why the server loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Stop,
    Restart,
}

/// Shared shutdown signal for the listener and every connection
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: broadcast::Sender<Shutdown>,
    restart_requested: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(4);
        Self {
            tx,
            restart_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Shutdown> {
        self.tx.subscribe()
    }

    /// Stop without restarting
    pub fn stop(&self) {
        let _ = self.tx.send(Shutdown::Stop);
    }

    pub fn restart_requested(&self) -> bool {
        self.restart_requested.load(Ordering::SeqCst)
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessControl for ShutdownHandle {
    fn trigger_restart(&self) {
        self.restart_requested.store(true, Ordering::SeqCst);
        // No receivers only happens before serve() or after it returned
        let _ = self.tx.send(Shutdown::Restart);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_restart_reaches_subscribers() {
        let handle = ShutdownHandle::new();
        let mut rx = handle.subscribe();

        handle.trigger_restart();

        assert_eq!(rx.recv().await.unwrap(), Shutdown::Restart);
        assert!(handle.restart_requested());
    }

    #[tokio::test]
    async fn test_stop_is_not_a_restart() {
        let handle = ShutdownHandle::new();
        let mut rx = handle.subscribe();

        handle.stop();

        assert_eq!(rx.recv().await.unwrap(), Shutdown::Stop);
        assert!(!handle.restart_requested());
    }
}
