use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Extension;
use futures::{stream, Stream, StreamExt};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use crate::effects::{Roster, Stage, StageEvent};
use crate::render::{BoardView, Point, Viewport};

use super::routes::ServerContext;

const LOG_TARGET: &str = "server::stream";
const STAGE_CAPACITY: usize = 1024;

/// Fans stage events out to every connected display.
///
/// The last painted board is retained so a display that connects mid-session
/// starts from the current standings.
pub struct BroadcastStage {
    roster: Roster,
    current: RwLock<Option<BoardView>>,
    tx: broadcast::Sender<StageEvent>,
}

impl BroadcastStage {
    pub fn new(viewport: Viewport) -> Self {
        let (tx, _) = broadcast::channel(STAGE_CAPACITY);
        Self {
            roster: Roster::new(viewport),
            current: RwLock::new(None),
            tx,
        }
    }

    pub fn subscribe(&self) -> (Option<BoardView>, broadcast::Receiver<StageEvent>) {
        // hold the read lock so no board slips between the copy and the subscription
        let current = self.current.read();
        (current.clone(), self.tx.subscribe())
    }

    pub fn viewers(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Stage for BroadcastStage {
    fn locate(&self, player: &str) -> Option<Point> {
        self.roster.locate(player)
    }

    fn apply(&self, event: StageEvent) {
        self.roster.observe(&event);
        let mut current = self.current.write();
        if let StageEvent::Board { board } = &event {
            *current = Some(board.clone());
        }
        let _ = self.tx.send(event);
    }
}

fn event_name(event: &StageEvent) -> &'static str {
    match event {
        StageEvent::Board { .. } => "board",
        StageEvent::ClassAdded { .. } => "class_added",
        StageEvent::ClassRemoved { .. } => "class_removed",
        StageEvent::ParticleSpawned { .. } => "particle_spawned",
        StageEvent::ParticleMoved { .. } => "particle_moved",
        StageEvent::ParticleRemoved { .. } => "particle_removed",
        StageEvent::Tone { .. } => "tone",
        StageEvent::NoticeShown { .. } => "notice_shown",
        StageEvent::NoticeDismissed { .. } => "notice_dismissed",
    }
}

fn to_sse(event: &StageEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(data) => Some(Event::default().event(event_name(event)).data(data)),
        Err(err) => {
            warn!(target = LOG_TARGET, error = %err, "failed to encode stage event");
            None
        }
    }
}

/// GET /api/leaderboard/events
pub async fn stream_events(
    Extension(ctx): Extension<Arc<ServerContext>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (current, rx) = ctx.stage.subscribe();
    debug!(target = LOG_TARGET, viewers = ctx.stage.viewers(), "display connected");

    let initial = stream::iter(current.map(|board| StageEvent::Board { board }));
    let live = BroadcastStream::new(rx).filter_map(|item| async move {
        match item {
            Ok(event) => Some(event),
            Err(err) => {
                // a lagging display drops effects but catches up on the next board
                debug!(target = LOG_TARGET, error = %err, "display lagged");
                None
            }
        }
    });

    let events = initial
        .chain(live)
        .filter_map(|event| async move { to_sse(&event) })
        .map(Ok::<Event, Infallible>);

    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text(":"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::MotionClass;
    use crate::standings::PlayerRecord;

    #[tokio::test]
    async fn late_subscriber_starts_from_current_board() {
        let stage = BroadcastStage::new(Viewport::default());
        assert!(stage.subscribe().0.is_none());

        let board = BoardView::from_players(&[PlayerRecord::new("amy", 3)]);
        stage.apply(StageEvent::Board { board: board.clone() });

        let (current, mut rx) = stage.subscribe();
        assert_eq!(current, Some(board));
        assert!(stage.locate("amy").is_some());

        stage.apply(StageEvent::ClassAdded {
            player: "amy".into(),
            class: MotionClass::Up,
        });
        let event = rx.recv().await.unwrap();
        assert_eq!(event_name(&event), "class_added");
    }
}
