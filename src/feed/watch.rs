use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::PlayerStore;
use crate::tokio_tools::spawn_named_task;

use super::{FeedError, FeedUpdate, FEED_CAPACITY};

const LOG_TARGET: &str = "feed::watch";

/// Push feed over a store's own change notifications. Emits the current list
/// once on start, then the full list after every write.
pub struct StoreWatchFeed {
    store: Arc<dyn PlayerStore>,
}

impl StoreWatchFeed {
    pub fn new(store: Arc<dyn PlayerStore>) -> Self {
        Self { store }
    }

    pub fn spawn(self, stop: CancellationToken) -> (JoinHandle<()>, mpsc::Receiver<FeedUpdate>) {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let handle = spawn_named_task("leaderboard-store-watch", self.run(tx, stop));
        (handle, rx)
    }

    async fn reload(&self) -> FeedUpdate {
        self.store
            .ranked()
            .await
            .map_err(FeedError::from)
            .into()
    }

    async fn run(self, tx: mpsc::Sender<FeedUpdate>, stop: CancellationToken) {
        // subscribe first so no write between the initial read and the
        // subscription is lost
        let mut changes = self.store.subscribe();
        info!(target = LOG_TARGET, "watching store changes");

        let mut next = Some(self.reload().await);
        loop {
            if let Some(update) = next.take() {
                if tx.send(update).await.is_err() {
                    debug!(target = LOG_TARGET, "feed consumer dropped");
                    break;
                }
            }

            next = tokio::select! {
                _ = stop.cancelled() => break,
                change = changes.recv() => match change {
                    Ok(list) => Some(FeedUpdate::Snapshot(list)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(target = LOG_TARGET, skipped, "lagged on store changes; reloading");
                        Some(self.reload().await)
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!(target = LOG_TARGET, "store change channel closed");
                        break;
                    }
                },
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standings::PlayerRecord;
    use crate::store::InMemoryPlayerStore;

    #[tokio::test]
    async fn emits_initial_list_then_every_write() {
        let store = Arc::new(InMemoryPlayerStore::with_players([
            PlayerRecord::new("amy", 10),
            PlayerRecord::new("bob", 5),
        ]));
        let stop = CancellationToken::new();
        let (handle, mut rx) =
            StoreWatchFeed::new(Arc::clone(&store) as Arc<dyn PlayerStore>).spawn(stop.clone());

        match rx.recv().await {
            Some(FeedUpdate::Snapshot(list)) => assert_eq!(list.rank_of("amy"), Some(1)),
            other => panic!("unexpected update {other:?}"),
        }

        store.increment("bob", 10).await.unwrap();
        match rx.recv().await {
            Some(FeedUpdate::Snapshot(list)) => {
                assert_eq!(list.rank_of("bob"), Some(1));
                assert_eq!(list.rank_of("amy"), Some(2));
            }
            other => panic!("unexpected update {other:?}"),
        }

        stop.cancel();
        handle.await.unwrap();
    }
}
