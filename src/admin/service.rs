use std::sync::Arc;

use tracing::info;

use crate::standings::{RankedList, Score};
use crate::store::PlayerStore;

use super::error::AdminError;

const LOG_TARGET: &str = "admin::service";

/// Step used by the quick +/- controls.
pub const QUICK_ADJUST: Score = 10;

/// Parses a score delta typed by an operator. Zero is rejected along with
/// anything that is not an integer.
pub fn parse_delta(raw: &str) -> Result<Score, AdminError> {
    match raw.trim().parse::<Score>() {
        Ok(0) | Err(_) => Err(AdminError::InvalidDelta(raw.to_string())),
        Ok(delta) => Ok(delta),
    }
}

fn validated_name(name: &str) -> Result<&str, AdminError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AdminError::InvalidName);
    }
    Ok(name)
}

/// Every write is followed by a full reload so callers always get back the
/// complete, ordered standings.
#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn PlayerStore>,
}

impl AdminService {
    pub fn new(store: Arc<dyn PlayerStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn PlayerStore> {
        &self.store
    }

    pub async fn standings(&self) -> Result<RankedList, AdminError> {
        Ok(self.store.ranked().await?)
    }

    /// Creates the player, or resets an existing one to zero.
    pub async fn add_player(&self, name: &str) -> Result<RankedList, AdminError> {
        let name = validated_name(name)?;
        self.store.upsert(name).await?;
        info!(target = LOG_TARGET, player = name, "player added");
        self.standings().await
    }

    pub async fn adjust_score(&self, name: &str, raw_delta: &str) -> Result<RankedList, AdminError> {
        let delta = parse_delta(raw_delta)?;
        self.apply_delta(name, delta).await
    }

    pub async fn apply_delta(&self, name: &str, delta: Score) -> Result<RankedList, AdminError> {
        if delta == 0 {
            return Err(AdminError::InvalidDelta(delta.to_string()));
        }
        let name = validated_name(name)?;
        let record = self.store.increment(name, delta).await?;
        info!(
            target = LOG_TARGET,
            player = name,
            delta,
            score = record.score,
            "score adjusted"
        );
        self.standings().await
    }

    pub async fn bump(&self, name: &str, up: bool) -> Result<RankedList, AdminError> {
        let delta = if up { QUICK_ADJUST } else { -QUICK_ADJUST };
        self.apply_delta(name, delta).await
    }

    pub async fn remove_player(&self, name: &str) -> Result<RankedList, AdminError> {
        let name = validated_name(name)?;
        let removed = self.store.delete(name).await?;
        info!(target = LOG_TARGET, player = name, removed, "player removed");
        self.standings().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standings::PlayerRecord;
    use crate::store::{InMemoryPlayerStore, StoreError};

    fn service(players: &[(&str, Score)]) -> AdminService {
        let store = InMemoryPlayerStore::with_players(
            players
                .iter()
                .map(|(name, score)| PlayerRecord::new(*name, *score)),
        );
        AdminService::new(Arc::new(store))
    }

    #[test]
    fn delta_parsing() {
        assert_eq!(parse_delta("5").unwrap(), 5);
        assert_eq!(parse_delta(" -10 ").unwrap(), -10);
        assert_eq!(parse_delta("+3").unwrap(), 3);
        assert!(matches!(parse_delta("0"), Err(AdminError::InvalidDelta(_))));
        assert!(matches!(parse_delta("abc"), Err(AdminError::InvalidDelta(_))));
        assert!(matches!(parse_delta(""), Err(AdminError::InvalidDelta(_))));
        assert!(matches!(parse_delta("2.5"), Err(AdminError::InvalidDelta(_))));
    }

    #[tokio::test]
    async fn negative_delta_can_go_below_zero() {
        let admin = service(&[("amy", 5)]);

        let list = admin.adjust_score("amy", "-10").await.unwrap();

        assert_eq!(list.get("amy").map(|p| p.score), Some(-5));
    }

    #[tokio::test]
    async fn rejected_delta_leaves_store_untouched() {
        let admin = service(&[("amy", 5)]);

        assert!(admin.adjust_score("amy", "ten").await.is_err());
        assert!(admin.adjust_score("amy", "0").await.is_err());

        let list = admin.standings().await.unwrap();
        assert_eq!(list.get("amy").map(|p| p.score), Some(5));
    }

    #[tokio::test]
    async fn add_bump_and_remove() {
        let admin = service(&[("amy", 5)]);

        let list = admin.add_player("  bob ").await.unwrap();
        assert_eq!(list.get("bob").map(|p| p.score), Some(0));

        let list = admin.bump("bob", true).await.unwrap();
        assert_eq!(list.rank_of("bob"), Some(1));

        let list = admin.bump("bob", false).await.unwrap();
        assert_eq!(list.get("bob").map(|p| p.score), Some(0));

        let list = admin.remove_player("amy").await.unwrap();
        assert_eq!(list.len(), 1);

        assert!(matches!(admin.add_player("   ").await, Err(AdminError::InvalidName)));
    }

    #[tokio::test]
    async fn adjusting_unknown_player_fails() {
        let admin = service(&[]);

        let err = admin.apply_delta("ghost", 3).await.unwrap_err();

        assert!(matches!(err, AdminError::Store(StoreError::NotFound(_))));
    }
}
