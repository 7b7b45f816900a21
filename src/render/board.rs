use serde::{Deserialize, Serialize};

use crate::standings::{PlayerRecord, Rank, RankedList, Score, PODIUM_SIZE};

/// Shown in empty podium slots.
pub const PLACEHOLDER_NAME: &str = "—";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodiumSlot {
    pub rank: Rank,
    pub name: String,
    pub score: Score,
    pub occupied: bool,
}

impl PodiumSlot {
    fn vacant(rank: Rank) -> Self {
        Self {
            rank,
            name: PLACEHOLDER_NAME.to_string(),
            score: 0,
            occupied: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardRow {
    pub rank: Rank,
    pub name: String,
    pub score: Score,
}

/// What the display paints: three podium slots and a table for everyone else.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardView {
    pub podium: [PodiumSlot; PODIUM_SIZE],
    pub rows: Vec<BoardRow>,
}

impl BoardView {
    /// Re-sorts before painting, so stale or unordered input still renders
    /// consistent ranks.
    pub fn from_players(players: &[PlayerRecord]) -> Self {
        let ranked = RankedList::from_unsorted(players.to_vec());
        let mut entries = ranked.into_inner().into_iter();

        let podium = std::array::from_fn(|idx| match entries.next() {
            Some(player) => PodiumSlot {
                rank: idx + 1,
                name: player.name,
                score: player.score,
                occupied: true,
            },
            None => PodiumSlot::vacant(idx + 1),
        });

        let rows = entries
            .enumerate()
            .map(|(idx, player)| BoardRow {
                rank: PODIUM_SIZE + idx + 1,
                name: player.name,
                score: player.score,
            })
            .collect();

        Self { podium, rows }
    }

    pub fn empty() -> Self {
        Self::from_players(&[])
    }

    /// Names of every rendered player element, podium first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.podium
            .iter()
            .filter(|slot| slot.occupied)
            .map(|slot| slot.name.as_str())
            .chain(self.rows.iter().map(|row| row.name.as_str()))
    }

    pub fn player_count(&self) -> usize {
        self.podium.iter().filter(|slot| slot.occupied).count() + self.rows.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

const PODIUM_TOP: f64 = 0.3;
const TABLE_TOP: f64 = 0.55;
const ROW_HEIGHT: f64 = 40.0;

/// Screen anchor of each rendered element, y growing downwards.
///
/// Podium slots sit side by side with first place in the middle; table rows
/// stack below them.
pub fn layout(board: &BoardView, viewport: &Viewport) -> Vec<(String, Point)> {
    // slot order left to right: 2nd, 1st, 3rd
    const COLUMN: [f64; PODIUM_SIZE] = [0.5, 0.25, 0.75];

    let podium = board
        .podium
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.occupied)
        .map(|(idx, slot)| {
            let lift = if idx == 0 { 0.05 } else { 0.0 };
            (
                slot.name.clone(),
                Point {
                    x: viewport.width * COLUMN[idx],
                    y: viewport.height * (PODIUM_TOP - lift),
                },
            )
        });

    let rows = board.rows.iter().enumerate().map(|(idx, row)| {
        (
            row.name.clone(),
            Point {
                x: viewport.width * 0.5,
                y: viewport.height * TABLE_TOP + ROW_HEIGHT * idx as f64,
            },
        )
    });

    podium.chain(rows).collect()
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
    fn short_list_fills_podium_with_placeholders() {
        let board = BoardView::from_players(&players(&[("solo", 12)]));

        assert_eq!(board.podium[0].name, "solo");
        assert!(board.podium[0].occupied);
        for (idx, slot) in board.podium.iter().enumerate().skip(1) {
            assert_eq!(slot.rank, idx + 1);
            assert_eq!(slot.name, PLACEHOLDER_NAME);
            assert_eq!(slot.score, 0);
            assert!(!slot.occupied);
        }
        assert!(board.rows.is_empty());
    }

    #[test]
    fn empty_list_renders() {
        let board = BoardView::empty();
        assert_eq!(board.player_count(), 0);
        assert!(board.podium.iter().all(|slot| !slot.occupied));
    }

    #[test]
    fn unsorted_input_is_reranked() {
        let board = BoardView::from_players(&players(&[
            ("d", 10),
            ("a", 40),
            ("e", 5),
            ("b", 30),
            ("c", 20),
        ]));

        let podium: Vec<_> = board.podium.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(podium, ["a", "b", "c"]);
        assert_eq!(
            board.rows,
            vec![
                BoardRow {
                    rank: 4,
                    name: "d".into(),
                    score: 10
                },
                BoardRow {
                    rank: 5,
                    name: "e".into(),
                    score: 5
                },
            ]
        );
        let names: Vec<_> = board.names().collect();
        assert_eq!(names, ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn layout_places_every_rendered_player() {
        let board = BoardView::from_players(&players(&[("a", 3), ("b", 2), ("c", 1), ("d", 0)]));
        let viewport = Viewport::default();
        let anchors = layout(&board, &viewport);

        assert_eq!(anchors.len(), 4);
        let first = anchors.iter().find(|(name, _)| name == "a").unwrap().1;
        let second = anchors.iter().find(|(name, _)| name == "b").unwrap().1;
        let row = anchors.iter().find(|(name, _)| name == "d").unwrap().1;
        assert_eq!(first.x, viewport.width * 0.5);
        assert!(first.y < second.y);
        assert!(row.y > second.y);
    }
}
