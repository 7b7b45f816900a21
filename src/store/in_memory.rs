use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::standings::{PlayerRecord, RankedList, Score};

use super::{ChangeNotifier, PlayerStore, StoreError};

#[derive(Debug, Default)]
pub struct InMemoryPlayerStore {
    players: RwLock<HashMap<String, Score>>,
    changes: ChangeNotifier,
}

impl InMemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_players(players: impl IntoIterator<Item = PlayerRecord>) -> Self {
        let store = Self::new();
        {
            let mut map = store.players.write();
            for player in players {
                map.insert(player.name, player.score);
            }
        }
        store
    }

    fn snapshot(&self) -> RankedList {
        self.players
            .read()
            .iter()
            .map(|(name, score)| PlayerRecord::new(name.clone(), *score))
            .collect()
    }

    fn publish(&self) {
        self.changes.publish(self.snapshot());
    }
}

#[async_trait]
impl PlayerStore for InMemoryPlayerStore {
    async fn ranked(&self) -> Result<RankedList, StoreError> {
        Ok(self.snapshot())
    }

    async fn upsert(&self, name: &str) -> Result<PlayerRecord, StoreError> {
        self.players.write().insert(name.to_owned(), 0);
        self.publish();
        Ok(PlayerRecord::new(name, 0))
    }

    async fn increment(&self, name: &str, delta: Score) -> Result<PlayerRecord, StoreError> {
        let updated = {
            let mut players = self.players.write();
            let score = players
                .get_mut(name)
                .ok_or_else(|| StoreError::NotFound(name.to_owned()))?;
            *score = score
                .checked_add(delta)
                .ok_or_else(|| StoreError::Overflow(name.to_owned()))?;
            PlayerRecord::new(name, *score)
        };
        self.publish();
        Ok(updated)
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let removed = self.players.write().remove(name).is_some();
        if removed {
            self.publish();
        }
        Ok(removed)
    }

    fn subscribe(&self) -> broadcast::Receiver<RankedList> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn negative_delta_has_no_floor() {
        let store = InMemoryPlayerStore::with_players([PlayerRecord::new("amy", 5)]);
        let updated = store.increment("amy", -10).await.unwrap();
        assert_eq!(updated.score, -5);
        assert_eq!(store.ranked().await.unwrap().get("amy").unwrap().score, -5);
    }

    #[tokio::test]
    async fn upsert_resets_score() {
        let store = InMemoryPlayerStore::with_players([PlayerRecord::new("amy", 40)]);
        store.upsert("amy").await.unwrap();
        store.upsert("bob").await.unwrap();

        let ranked = store.ranked().await.unwrap();
        assert_eq!(
            ranked.into_inner(),
            vec![PlayerRecord::new("amy", 0), PlayerRecord::new("bob", 0)]
        );
    }

    #[tokio::test]
    async fn increment_unknown_player_fails() {
        let store = InMemoryPlayerStore::new();
        let err = store.increment("ghost", 1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(name) if name == "ghost"));
    }

    #[tokio::test]
    async fn increment_overflow_is_rejected() {
        let store = InMemoryPlayerStore::with_players([PlayerRecord::new("max", Score::MAX)]);
        let err = store.increment("max", 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Overflow(_)));
        assert_eq!(store.ranked().await.unwrap()[0].score, Score::MAX);
    }

    #[tokio::test]
    async fn writes_publish_full_list() {
        let store = InMemoryPlayerStore::with_players([PlayerRecord::new("amy", 1)]);
        let mut changes = store.subscribe();

        store.increment("amy", 2).await.unwrap();
        let list = changes.recv().await.unwrap();
        assert_eq!(list.into_inner(), vec![PlayerRecord::new("amy", 3)]);

        assert!(!store.delete("ghost").await.unwrap());
        assert!(store.delete("amy").await.unwrap());
        let list = changes.recv().await.unwrap();
        assert!(list.is_empty());
    }
}
