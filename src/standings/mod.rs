//! Ranked standings and rank-change detection.

pub mod detector;
pub mod types;

pub use detector::{detect_score_changes, detect_transitions};
pub use types::{
    standing_order, Direction, PlayerRecord, Rank, RankedList, Score, Snapshot, Transition,
    PODIUM_SIZE,
};
