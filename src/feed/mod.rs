//! Ways of obtaining the latest ranked list: polling a source on a fixed
//! interval, or reacting to pushed change notifications.

use std::time::Duration;

use thiserror::Error;

use crate::standings::RankedList;
use crate::store::StoreError;

pub mod poller;
pub mod realtime;
pub mod source;
pub mod watch;

pub use poller::PollingFeed;
pub use realtime::{RealtimeFeed, SupabaseRealtimeClientConfig};
pub use source::{HttpLeaderboardSource, LeaderboardSource, StoreSource};
pub use watch::StoreWatchFeed;

/// Buffered updates per feed before the producer waits on the consumer.
pub const FEED_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {endpoint}")]
    Status { status: u16, endpoint: String },
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("fetch did not finish within {0:?}")]
    TimedOut(Duration),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a feed delivers each cycle.
#[derive(Debug)]
pub enum FeedUpdate {
    Snapshot(RankedList),
    Failed(FeedError),
}

impl From<Result<RankedList, FeedError>> for FeedUpdate {
    fn from(result: Result<RankedList, FeedError>) -> Self {
        match result {
            Ok(list) => FeedUpdate::Snapshot(list),
            Err(err) => FeedUpdate::Failed(err),
        }
    }
}
