//! Score mutations and player-set reconciliation.

pub mod error;
pub mod service;
pub mod sync;

pub use error::AdminError;
pub use service::{parse_delta, AdminService, QUICK_ADJUST};
pub use sync::{spawn_sync_loop, sync_players, HttpUserDirectory, SyncError, SyncReport, UserDirectory};
