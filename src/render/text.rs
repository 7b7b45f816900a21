use std::fmt::Write;

use super::board::BoardView;

const HEADER: &str = "=== Leaderboard ===";

/// Plain-text rendering for terminals, one `rank. name - score` line per
/// player.
#[derive(Clone, Debug, Default)]
pub struct TextRenderer {
    pub show_vacant: bool,
}

impl TextRenderer {
    pub fn render(&self, board: &BoardView) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{HEADER}");

        for slot in &board.podium {
            if slot.occupied || self.show_vacant {
                let _ = writeln!(out, "{}. {} - {}", slot.rank, slot.name, slot.score);
            }
        }
        for row in &board.rows {
            let _ = writeln!(out, "{}. {} - {}", row.rank, row.name, row.score);
        }

        out
    }
}
