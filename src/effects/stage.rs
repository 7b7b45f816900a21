use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::render::{layout, BoardView, Point, Viewport};
use crate::standings::Direction;

/// Classes toggled on a player element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionClass {
    Up,
    Down,
    Flash,
}

impl MotionClass {
    pub fn as_str(self) -> &'static str {
        match self {
            MotionClass::Up => "up",
            MotionClass::Down => "down",
            MotionClass::Flash => "flash",
        }
    }
}

impl From<Direction> for MotionClass {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => MotionClass::Up,
            Direction::Down => MotionClass::Down,
        }
    }
}

/// One instruction for the display surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageEvent {
    Board {
        board: BoardView,
    },
    ClassAdded {
        player: String,
        class: MotionClass,
    },
    ClassRemoved {
        player: String,
        class: MotionClass,
    },
    ParticleSpawned {
        burst: Uuid,
        particle: usize,
        player: String,
        x: f64,
        y: f64,
        opacity: f64,
    },
    ParticleMoved {
        burst: Uuid,
        particle: usize,
        x: f64,
        y: f64,
        opacity: f64,
    },
    ParticleRemoved {
        burst: Uuid,
        particle: usize,
    },
    Tone {
        start_hz: f64,
        end_hz: f64,
        duration_ms: u64,
    },
    NoticeShown {
        id: Uuid,
        message: String,
    },
    NoticeDismissed {
        id: Uuid,
    },
}

/// The display surface effects are drawn on.
///
/// Elements are addressed by player name. `locate` returns `None` for players
/// that have not been painted yet.
pub trait Stage: Send + Sync {
    fn locate(&self, player: &str) -> Option<Point>;
    fn apply(&self, event: StageEvent);
}

/// Tracks where each painted player sits, fed by `Board` events.
#[derive(Debug, Default)]
pub struct Roster {
    viewport: Viewport,
    anchors: RwLock<HashMap<String, Point>>,
}

impl Roster {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            anchors: RwLock::new(HashMap::new()),
        }
    }

    pub fn observe(&self, event: &StageEvent) {
        if let StageEvent::Board { board } = event {
            let anchors = layout(board, &self.viewport).into_iter().collect();
            *self.anchors.write() = anchors;
        }
    }

    pub fn locate(&self, player: &str) -> Option<Point> {
        self.anchors.read().get(player).copied()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::standings::PlayerRecord;
    use parking_lot::Mutex;

    /// Keeps every event in memory.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingStage {
        roster: Roster,
        events: Mutex<Vec<StageEvent>>,
    }

    impl RecordingStage {
        pub(crate) fn events(&self) -> Vec<StageEvent> {
            self.events.lock().clone()
        }

        pub(crate) fn take(&self) -> Vec<StageEvent> {
            std::mem::take(&mut *self.events.lock())
        }

        pub(crate) fn count(&self, predicate: impl Fn(&StageEvent) -> bool) -> usize {
            self.events.lock().iter().filter(|event| predicate(event)).count()
        }
    }

    impl Stage for RecordingStage {
        fn locate(&self, player: &str) -> Option<Point> {
            self.roster.locate(player)
        }

        fn apply(&self, event: StageEvent) {
            self.roster.observe(&event);
            self.events.lock().push(event);
        }
    }

    #[test]
    fn board_event_updates_roster() {
        let stage = RecordingStage::default();
        assert!(stage.locate("amy").is_none());

        let board = BoardView::from_players(&[PlayerRecord::new("amy", 1)]);
        stage.apply(StageEvent::Board { board });

        assert!(stage.locate("amy").is_some());
        assert!(stage.locate("bob").is_none());

        stage.apply(StageEvent::Board {
            board: BoardView::empty(),
        });
        assert!(stage.locate("amy").is_none());
    }

    #[test]
    fn events_are_tagged_by_type() {
        let event = StageEvent::ClassAdded {
            player: "amy".into(),
            class: MotionClass::Up,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "class_added", "player": "amy", "class": "up" })
        );
    }
}
