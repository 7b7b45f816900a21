use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::tokio_tools::spawn_named_task;

use super::source::LeaderboardSource;
use super::{FeedError, FeedUpdate, FEED_CAPACITY};

const LOG_TARGET: &str = "feed::poller";

/// Pulls the standings on a fixed interval.
///
/// Cycles never overlap: the next tick is only awaited once the current fetch
/// has resolved, and a fetch still pending when its interval elapses is
/// cancelled and reported as [`FeedError::TimedOut`].
pub struct PollingFeed {
    source: Arc<dyn LeaderboardSource>,
    interval: Duration,
}

impl PollingFeed {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

    pub fn new(source: Arc<dyn LeaderboardSource>, interval: Duration) -> Self {
        Self { source, interval }
    }

    pub fn spawn(self, stop: CancellationToken) -> (JoinHandle<()>, mpsc::Receiver<FeedUpdate>) {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let handle = spawn_named_task("leaderboard-poller", self.run(tx, stop));
        (handle, rx)
    }

    pub async fn poll_once(&self) -> FeedUpdate {
        match timeout(self.interval, self.source.fetch()).await {
            Ok(result) => FeedUpdate::from(result),
            Err(_) => FeedUpdate::Failed(FeedError::TimedOut(self.interval)),
        }
    }

    async fn run(self, tx: mpsc::Sender<FeedUpdate>, stop: CancellationToken) {
        info!(
            target = LOG_TARGET,
            interval_ms = self.interval.as_millis() as u64,
            "polling leaderboard"
        );
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let update = tokio::select! {
                _ = stop.cancelled() => break,
                update = self.poll_once() => update,
            };
            if let FeedUpdate::Failed(err) = &update {
                debug!(target = LOG_TARGET, error = %err, "poll failed");
            }

            if tx.send(update).await.is_err() {
                debug!(target = LOG_TARGET, "feed consumer dropped");
                break;
            }
        }

        info!(target = LOG_TARGET, "poller stopped");
    }
}
