use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::effects::{AnimationSequencer, Stage, StageEvent};
use crate::feed::{FeedError, FeedUpdate};
use crate::render::BoardView;
use crate::standings::{detect_score_changes, detect_transitions, RankedList, Snapshot, Transition};
use crate::tokio_tools::spawn_named_task;

const LOG_TARGET: &str = "controller";

pub const NOTICE_TTL: Duration = Duration::from_secs(4);
pub const FETCH_FAILED_NOTICE: &str = "Failed to load leaderboard";

/// What a single feed update did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// First list of the session; painted, nothing to compare against.
    Baseline,
    Animated { transitions: Vec<Transition> },
    /// Painted, but detection deferred until running animations drain.
    Suppressed,
    Failed,
}

/// Owns the session: the last list detection ran against, the board on
/// screen and the sequencer.
///
/// Every update is painted. Detection runs against `previous`, which only
/// advances when a pass actually runs, so moves that arrive while effects are
/// still in flight are folded into the next pass instead of being lost.
pub struct LeaderboardController {
    stage: Arc<dyn Stage>,
    sequencer: AnimationSequencer,
    previous: Option<Snapshot>,
    displayed: Option<BoardView>,
    pending: Option<RankedList>,
}

impl LeaderboardController {
    pub fn new(stage: Arc<dyn Stage>, sequencer: AnimationSequencer) -> Self {
        Self {
            stage,
            sequencer,
            previous: None,
            displayed: None,
            pending: None,
        }
    }

    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    pub fn displayed(&self) -> Option<&BoardView> {
        self.displayed.as_ref()
    }

    pub fn sequencer(&self) -> &AnimationSequencer {
        &self.sequencer
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn apply(&mut self, update: FeedUpdate) -> CycleOutcome {
        match update {
            FeedUpdate::Snapshot(list) => self.show(list),
            FeedUpdate::Failed(err) => {
                self.notify_failure(&err);
                CycleOutcome::Failed
            }
        }
    }

    fn show(&mut self, list: RankedList) -> CycleOutcome {
        let current = list.resorted();
        let board = BoardView::from_players(&current);
        debug!(target = LOG_TARGET, players = board.player_count(), "painting board");
        self.stage.apply(StageEvent::Board {
            board: board.clone(),
        });
        self.displayed = Some(board);

        let Some(previous) = self.previous.as_ref().map(|snapshot| &snapshot.players) else {
            debug!(target = LOG_TARGET, players = current.len(), "baseline captured");
            self.previous = Some(Snapshot::now(current));
            return CycleOutcome::Baseline;
        };

        if self.sequencer.is_animating() {
            debug!(
                target = LOG_TARGET,
                in_flight = self.sequencer.in_flight(),
                "animations running; deferring detection"
            );
            self.pending = Some(current);
            return CycleOutcome::Suppressed;
        }

        let transitions = detect_transitions(previous, &current);
        for player in detect_score_changes(previous, &current) {
            self.sequencer.flash(player);
        }
        let animated = self.sequencer.dispatch(&transitions);
        if !transitions.is_empty() {
            info!(
                target = LOG_TARGET,
                moved = transitions.len(),
                animated,
                "rank changes detected"
            );
        }

        self.previous = Some(Snapshot::now(current));
        self.pending = None;
        CycleOutcome::Animated { transitions }
    }

    fn notify_failure(&self, err: &FeedError) {
        warn!(target = LOG_TARGET, error = %err, "leaderboard fetch failed");

        let id = Uuid::new_v4();
        self.stage.apply(StageEvent::NoticeShown {
            id,
            message: FETCH_FAILED_NOTICE.to_string(),
        });

        let stage = Arc::clone(&self.stage);
        spawn_named_task("notice-dismiss", async move {
            sleep(NOTICE_TTL).await;
            stage.apply(StageEvent::NoticeDismissed { id });
        });
    }

    /// Drives the controller until the feed closes or `stop` fires. A
    /// deferred list is replayed as soon as the sequencer goes idle.
    pub async fn run(mut self, mut updates: mpsc::Receiver<FeedUpdate>, stop: CancellationToken) {
        info!(target = LOG_TARGET, "controller started");
        loop {
            let update = tokio::select! {
                _ = stop.cancelled() => break,
                _ = self.sequencer.idle(), if self.pending.is_some() => {
                    match self.pending.take() {
                        Some(list) => FeedUpdate::Snapshot(list),
                        None => continue,
                    }
                }
                update = updates.recv() => match update {
                    Some(update) => update,
                    None => {
                        debug!(target = LOG_TARGET, "feed closed");
                        break;
                    }
                },
            };
            self.apply(update);
        }

        self.sequencer.settled().await;
        info!(target = LOG_TARGET, "controller stopped");
    }
}
