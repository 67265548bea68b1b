//! Keep-open gate.
//!
//! A shared browser may be asked to close while a user still wants to look
//! at it. The gate holds such a close until it is explicitly released.

use std::sync::Arc;

use tokio::sync::watch;

/// Cooperative close gate. Clones share the same state.
#[derive(Debug, Clone)]
pub struct KeepOpenGate {
    held: Arc<watch::Sender<bool>>,
}

impl KeepOpenGate {
    /// Create a gate, initially held when `keep_open` is true.
    pub fn new(keep_open: bool) -> Self {
        let (tx, _rx) = watch::channel(keep_open);
        Self { held: Arc::new(tx) }
    }

    /// Whether a close would currently block.
    pub fn is_held(&self) -> bool {
        *self.held.borrow()
    }

    /// Block future closes until [`allow_close`](Self::allow_close).
    pub fn hold_open(&self) {
        self.held.send_replace(true);
    }

    /// Let pending and future closes proceed.
    pub fn allow_close(&self) {
        self.held.send_replace(false);
    }

    /// Resolve once the gate is released. Never resolves while it stays held.
    pub async fn released(&self) {
        let mut rx = self.held.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|held| !*held).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_released_gate_resolves_immediately() {
        let gate = KeepOpenGate::new(false);
        tokio::time::timeout(Duration::from_millis(50), gate.released())
            .await
            .expect("gate should not block");
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_gate_blocks_until_allowed() {
        let gate = KeepOpenGate::new(true);
        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move { gate.released().await }
        });

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!waiter.is_finished());

        gate.allow_close();
        waiter.await.unwrap();
        assert!(!gate.is_held());
    }

    #[tokio::test]
    async fn test_hold_open_rearms() {
        let gate = KeepOpenGate::new(false);
        gate.hold_open();
        assert!(gate.is_held());
        let blocked = tokio::time::timeout(Duration::from_millis(20), gate.released()).await;
        assert!(blocked.is_err());
    }
}
