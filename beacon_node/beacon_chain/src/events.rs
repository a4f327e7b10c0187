use tokio::sync::broadcast;
use tracing::trace;
use types::{Checkpoint, Epoch, Hash256, Slot};

/// Lifecycle and chain-progress events published by the core.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainEvent {
    /// A genesis state exists; the chain will start at `genesis_time`.
    StateInitialized { genesis_time: u64 },
    /// The genesis slot has been reached.
    ChainStart { genesis_time: u64 },
    NewHead {
        root: Hash256,
        slot: Slot,
        epoch: Epoch,
    },
    FinalizedCheckpoint(Checkpoint),
}

/// An explicit, injected event feed. There is no process-wide singleton:
/// every component that emits or observes events holds a handle.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<ChainEvent>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: ChainEvent) {
        // No subscribers is normal during startup.
        if self.tx.send(event.clone()).is_err() {
            trace!(?event, "Chain event dropped, no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChainEvent> {
        self.tx.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();
        notifier.publish(ChainEvent::StateInitialized { genesis_time: 12 });
        assert_eq!(
            rx.recv().await.unwrap(),
            ChainEvent::StateInitialized { genesis_time: 12 }
        );
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let notifier = Notifier::default();
        notifier.publish(ChainEvent::ChainStart { genesis_time: 0 });
    }
}
