use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::standings::{PlayerRecord, RankedList};
use crate::store::PlayerStore;

use super::FeedError;

/// Request/response access to the current standings.
#[async_trait]
pub trait LeaderboardSource: Send + Sync {
    async fn fetch(&self) -> Result<RankedList, FeedError>;
}

/// Reads `GET /api/leaderboard` from a leaderboard server.
#[derive(Clone, Debug)]
pub struct HttpLeaderboardSource {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpLeaderboardSource {
    pub const PATH: &'static str = "/api/leaderboard";

    pub fn new(base: &Url, request_timeout: Duration) -> Result<Self, FeedError> {
        let endpoint = base.join(Self::PATH)?;
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl LeaderboardSource for HttpLeaderboardSource {
    async fn fetch(&self) -> Result<RankedList, FeedError> {
        let response = self.client.get(self.endpoint.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
                endpoint: self.endpoint.to_string(),
            });
        }

        // the payload order is not trusted
        let players: Vec<PlayerRecord> = response.json().await?;
        Ok(RankedList::from_unsorted(players))
    }
}

/// Reads straight from a store in the same process.
#[derive(Clone)]
pub struct StoreSource {
    store: Arc<dyn PlayerStore>,
}

impl StoreSource {
    pub fn new(store: Arc<dyn PlayerStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LeaderboardSource for StoreSource {
    async fn fetch(&self) -> Result<RankedList, FeedError> {
        Ok(self.store.ranked().await?)
    }
}
