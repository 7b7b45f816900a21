use thiserror::Error;

use crate::store::StoreError;

use super::sync::SyncError;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("player name must not be empty")]
    InvalidName,
    #[error("score delta must be a non-zero integer, got {0:?}")]
    InvalidDelta(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}
