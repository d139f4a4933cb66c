//! Shutdown coordination for the background loops.

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Broadcasts a single shutdown signal to every long-running task and cancels
/// in-flight submissions.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    cancel: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Receiver for a background loop's `select!`.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Token for submissions; cancelled when shutdown is triggered.
    pub fn submission_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub fn trigger(&self) {
        self.cancel.cancel();
        let _ = self.tx.send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Loops still subscribed.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_loops_and_submissions() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        let token = shutdown.submission_token();
        assert_eq!(shutdown.receiver_count(), 1);

        shutdown.trigger();

        rx.recv().await.unwrap();
        assert!(token.is_cancelled());
        assert!(shutdown.is_triggered());
    }

    #[test]
    fn test_trigger_without_subscribers_is_harmless() {
        let shutdown = Shutdown::default();
        shutdown.trigger();
        assert!(shutdown.is_triggered());
    }
}
