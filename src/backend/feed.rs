use tokio::sync::broadcast;
use tracing::warn;

use crate::cases::models::CaseChange;

/// Fan-out of case row updates to every live subscription.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<CaseChange>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Deliver a change to all current subscribers. Returns how many
    /// subscriptions were live at the time.
    pub fn publish(&self, change: CaseChange) -> usize {
        // no subscribers is not an error
        self.tx.send(change).unwrap_or(0)
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

/// A registered interest in case updates.
///
/// Dropping the handle (or calling [`Subscription::close`]) unregisters it;
/// no event is delivered afterwards.
pub struct Subscription {
    rx: Option<broadcast::Receiver<CaseChange>>,
}

impl Subscription {
    /// Wait for the next change. Returns `None` once the subscription is
    /// closed or the feed has shut down. Cancel-safe.
    pub async fn next(&mut self) -> Option<CaseChange> {
        loop {
            let rx = self.rx.as_mut()?;
            match rx.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Case subscription lagged; skipping missed updates");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.rx = None;
                    return None;
                }
            }
        }
    }

    pub fn close(&mut self) {
        self.rx = None;
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_none()
    }
}
