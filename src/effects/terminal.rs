use std::io::Write;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::render::{Point, TextRenderer, Viewport};

use super::stage::{Roster, Stage, StageEvent};

const LOG_TARGET: &str = "effects::terminal";

/// Draws the board as text. Motion and confetti have no terminal rendering,
/// they are only logged.
pub struct TerminalStage<W: Write + Send> {
    out: Mutex<W>,
    renderer: TextRenderer,
    roster: Roster,
}

impl<W: Write + Send> TerminalStage<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            renderer: TextRenderer::default(),
            roster: Roster::new(Viewport::default()),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn write(&self, text: &str) {
        let mut out = self.out.lock();
        if let Err(err) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
            warn!(target = LOG_TARGET, error = %err, "failed to write to terminal");
        }
    }
}

impl<W: Write + Send> Stage for TerminalStage<W> {
    fn locate(&self, player: &str) -> Option<Point> {
        self.roster.locate(player)
    }

    fn apply(&self, event: StageEvent) {
        self.roster.observe(&event);
        match event {
            StageEvent::Board { board } => {
                self.write(&format!("\n{}", self.renderer.render(&board)));
            }
            StageEvent::ClassAdded { player, class } => {
                info!(target = LOG_TARGET, %player, class = class.as_str(), "player moved");
            }
            StageEvent::ParticleSpawned { burst, particle: 0, player, .. } => {
                info!(target = LOG_TARGET, %player, %burst, "celebration");
            }
            StageEvent::NoticeShown { message, .. } => {
                self.write(&format!("! {message}\n"));
            }
            other => debug!(target = LOG_TARGET, event = ?other, "stage event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::BoardView;
    use crate::standings::PlayerRecord;
    use uuid::Uuid;

    #[test]
    fn prints_board_and_notices() {
        let stage = TerminalStage::new(Vec::new());
        let board = BoardView::from_players(&[
            PlayerRecord::new("amy", 10),
            PlayerRecord::new("bob", 5),
        ]);

        stage.apply(StageEvent::Board { board });
        assert!(stage.locate("bob").is_some());

        stage.apply(StageEvent::NoticeShown {
            id: Uuid::new_v4(),
            message: "Failed to load leaderboard".into(),
        });

        let text = String::from_utf8(stage.into_inner()).unwrap();
        assert!(text.contains("1. amy - 10\n2. bob - 5\n"));
        assert!(text.ends_with("! Failed to load leaderboard\n"));
    }
}
