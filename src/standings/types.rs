use std::cmp::Ordering;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 1-based position in a [`RankedList`].
pub type Rank = usize;
pub type Score = i64;

/// Number of slots rendered on the podium.
pub const PODIUM_SIZE: usize = 3;

/// A single player's standing. The name doubles as the primary key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub score: Score,
}

impl PlayerRecord {
    pub fn new(name: impl Into<String>, score: Score) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

/// Score descending, then name ascending.
pub fn standing_order(a: &PlayerRecord, b: &PlayerRecord) -> Ordering {
    b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name))
}

/// Players in display order. Ranks are never stored; they are the index + 1.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankedList {
    players: Vec<PlayerRecord>,
}

impl RankedList {
    /// Sorts by [`standing_order`]. The sort is stable, so re-sorting an
    /// already ranked list leaves it untouched.
    pub fn from_unsorted(mut players: Vec<PlayerRecord>) -> Self {
        players.sort_by(standing_order);
        Self { players }
    }

    pub fn resorted(self) -> Self {
        Self::from_unsorted(self.players)
    }

    pub fn rank_of(&self, name: &str) -> Option<Rank> {
        self.players
            .iter()
            .position(|player| player.name == name)
            .map(|idx| idx + 1)
    }

    pub fn get(&self, name: &str) -> Option<&PlayerRecord> {
        self.players.iter().find(|player| player.name == name)
    }

    pub fn into_inner(self) -> Vec<PlayerRecord> {
        self.players
    }
}

impl Deref for RankedList {
    type Target = [PlayerRecord];

    fn deref(&self) -> &Self::Target {
        &self.players
    }
}

impl FromIterator<PlayerRecord> for RankedList {
    fn from_iter<I: IntoIterator<Item = PlayerRecord>>(iter: I) -> Self {
        Self::from_unsorted(iter.into_iter().collect())
    }
}

/// A ranked list together with the moment it was obtained.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub players: RankedList,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn now(players: RankedList) -> Self {
        Self {
            players,
            fetched_at: Utc::now(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

/// A player's move between two consecutive lists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub name: String,
    pub old_rank: Rank,
    pub new_rank: Rank,
    pub direction: Direction,
    pub is_top3: bool,
}

impl Transition {
    /// Callers guarantee `old_rank != new_rank`.
    pub fn between(name: impl Into<String>, old_rank: Rank, new_rank: Rank) -> Self {
        let direction = if new_rank < old_rank {
            Direction::Up
        } else {
            Direction::Down
        };
        Self {
            name: name.into(),
            old_rank,
            new_rank,
            direction,
            is_top3: new_rank <= PODIUM_SIZE,
        }
    }

    /// Upward moves that land on the podium get confetti and a tone.
    pub fn celebrates(&self) -> bool {
        self.is_top3 && self.direction == Direction::Up
    }

    pub fn magnitude(&self) -> usize {
        self.old_rank.abs_diff(self.new_rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players(entries: &[(&str, Score)]) -> Vec<PlayerRecord> {
        entries
            .iter()
            .map(|(name, score)| PlayerRecord::new(*name, *score))
            .collect()
    }

    #[test]
    fn sorts_by_score_descending() {
        let list = RankedList::from_unsorted(players(&[("c", 10), ("a", 30), ("b", 20)]));
        let names: Vec<_> = list.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(list.rank_of("c"), Some(3));
    }

    #[test]
    fn equal_scores_break_ties_by_name() {
        let list = RankedList::from_unsorted(players(&[("zed", 5), ("amy", 5), ("bob", 7)]));
        let names: Vec<_> = list.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["bob", "amy", "zed"]);
    }

    #[test]
    fn sorting_twice_is_a_fixed_point() {
        let once = RankedList::from_unsorted(players(&[
            ("d", 1),
            ("a", 9),
            ("c", 9),
            ("b", -3),
            ("e", 0),
        ]));
        let twice = once.clone().resorted();
        assert_eq!(once, twice);
    }

    #[test]
    fn transition_direction_and_top3_flag() {
        let up = Transition::between("b", 5, 3);
        assert_eq!(up.direction, Direction::Up);
        assert!(up.is_top3);
        assert!(up.celebrates());
        assert_eq!(up.magnitude(), 2);

        let down = Transition::between("a", 1, 4);
        assert_eq!(down.direction, Direction::Down);
        assert!(!down.is_top3);
        assert!(!down.celebrates());
    }

    #[test]
    fn serializes_as_plain_array() {
        let list = RankedList::from_unsorted(players(&[("a", 2)]));
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json, serde_json::json!([{ "name": "a", "score": 2 }]));
    }
}
