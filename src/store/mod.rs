//! Player document store: the external source of truth for scores.

use async_trait::async_trait;
use ::sea_orm::DbErr;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::standings::{PlayerRecord, RankedList, Score};

pub mod in_memory;
pub mod sea_orm;

pub use self::in_memory::InMemoryPlayerStore;
pub use self::sea_orm::SeaOrmPlayerStore;

const CHANGE_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("player {0} not found")]
    NotFound(String),
    #[error("score overflow for player {0}")]
    Overflow(String),
}

/// Writes are last-write-wins; every successful write publishes the full
/// ranked list to subscribers.
#[async_trait]
pub trait PlayerStore: Send + Sync {
    async fn ranked(&self) -> Result<RankedList, StoreError>;

    /// Creates the player, or resets an existing one, with a score of 0.
    async fn upsert(&self, name: &str) -> Result<PlayerRecord, StoreError>;

    async fn increment(&self, name: &str, delta: Score) -> Result<PlayerRecord, StoreError>;

    /// Returns whether a player was removed. Deleting an unknown name is not
    /// an error.
    async fn delete(&self, name: &str) -> Result<bool, StoreError>;

    fn subscribe(&self) -> broadcast::Receiver<RankedList>;
}

/// Fan-out of full ranked lists after each write.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<RankedList>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, list: RankedList) {
        // no receivers is fine
        let _ = self.tx.send(list);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RankedList> {
        self.tx.subscribe()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
