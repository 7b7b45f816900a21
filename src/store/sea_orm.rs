use async_trait::async_trait;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use tokio::sync::broadcast;
use tracing::warn;

use crate::db::entity::players;
use crate::standings::{PlayerRecord, RankedList, Score};

use super::{ChangeNotifier, PlayerStore, StoreError};

const LOG_TARGET: &str = "store::sea_orm";

/// Postgres-backed store. Change notifications only cover writes made
/// through this instance; pair it with a realtime feed to observe other
/// writers.
pub struct SeaOrmPlayerStore {
    connection: DatabaseConnection,
    changes: ChangeNotifier,
}

impl SeaOrmPlayerStore {
    pub fn new(connection: DatabaseConnection) -> Self {
        Self {
            connection,
            changes: ChangeNotifier::new(),
        }
    }

    async fn publish(&self) {
        match self.ranked().await {
            Ok(list) => self.changes.publish(list),
            Err(err) => {
                warn!(target = LOG_TARGET, error = %err, "failed to reload players after write");
            }
        }
    }
}

fn into_record(model: players::Model) -> PlayerRecord {
    PlayerRecord::new(model.name, model.score)
}

#[async_trait]
impl PlayerStore for SeaOrmPlayerStore {
    async fn ranked(&self) -> Result<RankedList, StoreError> {
        let rows = players::Entity::find()
            .order_by_desc(players::Column::Score)
            .order_by_asc(players::Column::Name)
            .all(&self.connection)
            .await?;
        Ok(RankedList::from_unsorted(
            rows.into_iter().map(into_record).collect(),
        ))
    }

    async fn upsert(&self, name: &str) -> Result<PlayerRecord, StoreError> {
        let model = players::ActiveModel {
            name: Set(name.to_owned()),
            score: Set(0),
        };
        players::Entity::insert(model)
            .on_conflict(
                OnConflict::column(players::Column::Name)
                    .update_column(players::Column::Score)
                    .to_owned(),
            )
            .exec(&self.connection)
            .await?;
        self.publish().await;
        Ok(PlayerRecord::new(name, 0))
    }

    async fn increment(&self, name: &str, delta: Score) -> Result<PlayerRecord, StoreError> {
        let result = players::Entity::update_many()
            .col_expr(
                players::Column::Score,
                Expr::col(players::Column::Score).add(delta),
            )
            .filter(players::Column::Name.eq(name))
            .exec(&self.connection)
            .await?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(name.to_owned()));
        }

        let model = players::Entity::find_by_id(name.to_owned())
            .one(&self.connection)
            .await?
            .ok_or_else(|| StoreError::NotFound(name.to_owned()))?;
        self.publish().await;
        Ok(into_record(model))
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let result = players::Entity::delete_by_id(name.to_owned())
            .exec(&self.connection)
            .await?;
        let removed = result.rows_affected > 0;
        if removed {
            self.publish().await;
        }
        Ok(removed)
    }

    fn subscribe(&self) -> broadcast::Receiver<RankedList> {
        self.changes.subscribe()
    }
}
