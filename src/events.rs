//! Publish/subscribe feed of transaction record changes.
//!
//! Subscribers receive every record inserted or updated after they subscribed.
//! Calling [`Subscription::unsubscribe`] (or dropping the subscription)
//! unregisters immediately: no record published afterwards is delivered.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::store::TransactionRecord;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct TransactionFeed {
    tx: broadcast::Sender<TransactionRecord>,
}

impl TransactionFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns the number of subscribers the record was delivered to.
    pub fn publish(&self, record: TransactionRecord) -> usize {
        self.tx.send(record).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: Some(self.tx.subscribe()),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for TransactionFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A registered subscriber.
#[derive(Debug)]
pub struct Subscription {
    rx: Option<broadcast::Receiver<TransactionRecord>>,
}

impl Subscription {
    /// Next record, or `None` once unsubscribed or the feed is gone.
    /// A subscriber that falls behind skips the records it missed.
    pub async fn next(&mut self) -> Option<TransactionRecord> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(record) => return Some(record),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Transaction feed subscriber lagged");
                }
                Err(RecvError::Closed) => {
                    self.rx = None;
                    return None;
                }
            }
        }
    }

    pub fn unsubscribe(&mut self) {
        self.rx = None;
    }

    pub fn is_active(&self) -> bool {
        self.rx.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{TransactionKind, TransactionStatus};

    fn record(id: &str) -> TransactionRecord {
        TransactionRecord {
            id: id.into(),
            wallet_id: "w".into(),
            hash: format!("hash-{}", id),
            kind: TransactionKind::Send,
            status: TransactionStatus::Pending,
            from: "a".into(),
            to: "b".into(),
            amount: 1,
            fee: 0,
            confirmations: 0,
            error: None,
            memo: None,
            timestamp: 0,
            simulated: false,
            simulation_logs: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let feed = TransactionFeed::default();
        let mut sub = feed.subscribe();

        assert_eq!(feed.publish(record("1")), 1);
        feed.publish(record("2"));

        assert_eq!(sub.next().await.unwrap().id, "1");
        assert_eq!(sub.next().await.unwrap().id, "2");
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let feed = TransactionFeed::default();
        let mut sub = feed.subscribe();
        feed.publish(record("1"));

        sub.unsubscribe();
        assert!(!sub.is_active());
        assert_eq!(feed.subscriber_count(), 0);
        assert_eq!(feed.publish(record("2")), 0);
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_ahead() {
        let feed = TransactionFeed::new(2);
        let mut sub = feed.subscribe();
        for id in ["1", "2", "3", "4"] {
            feed.publish(record(id));
        }
        assert_eq!(sub.next().await.unwrap().id, "3");
    }
}
