use std::future::Future;
use std::sync::Arc;

use futures::channel::mpsc;
use futures::stream::BoxStream;
use futures::{SinkExt, StreamExt};
use tokio::sync::watch;

/// Fan-out point for committed writes.
///
/// Every store keeps one; each successful write marks it and every live
/// query re-runs against the latest committed state. The counter only
/// signals that something changed; snapshots are always recomputed, never
/// diffed, so delivery matches the re-deliver-everything contract.
#[derive(Debug, Clone)]
pub struct ChangeSignal {
    tx: Arc<watch::Sender<u64>>,
}

impl ChangeSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    pub fn mark(&self) {
        self.tx.send_modify(|revision| *revision += 1);
    }

    pub fn follow(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

impl Default for ChangeSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a change signal plus a snapshot query into a live snapshot stream.
///
/// Delivers one snapshot immediately, then one per mark; marks arriving
/// while a snapshot is in flight coalesce into a single recomputation.
/// `query` returning `None` skips that delivery on a failed read, which
/// the caller logs. Dropping the returned stream stops delivery at once
/// and lets the producer task wind down.
pub fn snapshots<T, F, Fut>(mut changes: watch::Receiver<u64>, query: F) -> BoxStream<'static, T>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Option<T>> + Send + 'static,
{
    let (mut tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        loop {
            if let Some(snapshot) = query().await {
                if tx.send(snapshot).await.is_err() {
                    break;
                }
            }
            if changes.changed().await.is_err() {
                break;
            }
        }
    });
    rx.boxed()
}
