//! Read-only access to synced items
//!
//! The engine publishes the item list here after every completed merge.
//! Readers never see sync errors: they hold the last successfully persisted
//! list, or an empty one if nothing has been loaded yet.

use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::traits::Item;

/// Shared, immutable snapshot of the item list (newest first)
pub type ItemsSnapshot = Arc<Vec<Item>>;

/// Publishing half, owned by the engine
#[derive(Debug)]
pub(crate) struct ItemsPublisher {
    tx: watch::Sender<ItemsSnapshot>,
}

impl ItemsPublisher {
    pub(crate) fn new() -> (Self, ItemsReader) {
        let (tx, rx) = watch::channel(Arc::new(Vec::new()));
        (Self { tx }, ItemsReader { rx })
    }

    /// Replace the published list
    pub(crate) fn publish(&self, items: Vec<Item>) {
        self.tx.send_replace(Arc::new(items));
    }
}

/// Read-only accessor for presentation code
///
/// Cheap to clone; every clone observes the same snapshots.
#[derive(Debug, Clone)]
pub struct ItemsReader {
    rx: watch::Receiver<ItemsSnapshot>,
}

impl ItemsReader {
    /// Current items, newest first
    pub fn items(&self) -> ItemsSnapshot {
        self.rx.borrow().clone()
    }

    /// Stream yielding the current snapshot, then every newly published one
    pub fn changes(&self) -> WatchStream<ItemsSnapshot> {
        WatchStream::new(self.rx.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    fn item(id: &str) -> Item {
        Item {
            id: id.to_string(),
            title: String::new(),
            description: String::new(),
            published_at: None,
            thumbnail_url: None,
            source_url: String::new(),
        }
    }

    #[test]
    fn reader_starts_empty() {
        let (_publisher, reader) = ItemsPublisher::new();
        assert!(reader.items().is_empty());
    }

    #[test]
    fn clones_observe_published_items() {
        let (publisher, reader) = ItemsPublisher::new();
        let other = reader.clone();

        publisher.publish(vec![item("b"), item("a")]);

        let ids: Vec<_> = other.items().iter().map(|i| i.id.clone()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn change_stream_yields_latest_snapshot() {
        let (publisher, reader) = ItemsPublisher::new();
        let mut changes = reader.changes();

        let initial = changes.next().await.unwrap();
        assert!(initial.is_empty());

        publisher.publish(vec![item("a")]);
        let next = changes.next().await.unwrap();
        assert_eq!(next.len(), 1);
    }
}
