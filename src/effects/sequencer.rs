use std::sync::Arc;
use std::time::Duration;

use rand::{rngs::StdRng, SeedableRng};
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tokio_util::task::TaskTracker;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::render::{Point, Viewport};
use crate::standings::Transition;
use crate::tokio_tools::spawn_tracked;

use super::particles::{max_flight_time, Flight, Launch, Particle, BURST_SIZE};
use super::stage::{MotionClass, Stage, StageEvent};
use super::tone::{ToneOutput, ToneSweep, SAMPLE_RATE};

const LOG_TARGET: &str = "effects::sequencer";

#[derive(Clone, Debug)]
pub struct SequencerConfig {
    /// How long the `up`/`down` class stays on an element.
    pub class_duration: Duration,
    /// How long the `flash` class stays on an element.
    pub flash_duration: Duration,
    /// Upper bound on how long a class stays applied.
    pub settle: Duration,
    pub frame: Duration,
    pub viewport: Viewport,
    pub burst_size: usize,
    pub tone: ToneSweep,
    pub sample_rate: u32,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            class_duration: Duration::from_millis(1_500),
            flash_duration: Duration::from_millis(1_000),
            settle: Duration::from_secs(2),
            frame: Duration::from_millis(16),
            viewport: Viewport::default(),
            burst_size: BURST_SIZE,
            tone: ToneSweep::default(),
            sample_rate: SAMPLE_RATE,
        }
    }
}

/// Turns transitions into timed stage effects.
///
/// Every animation runs as its own task on a [`TaskTracker`], so
/// [`AnimationSequencer::is_animating`] reflects exactly the work still in
/// flight.
pub struct AnimationSequencer {
    stage: Arc<dyn Stage>,
    audio: Arc<dyn ToneOutput>,
    config: Arc<SequencerConfig>,
    tracker: TaskTracker,
    rng: StdRng,
}

impl AnimationSequencer {
    pub fn new(stage: Arc<dyn Stage>, audio: Arc<dyn ToneOutput>, config: SequencerConfig) -> Self {
        Self {
            stage,
            audio,
            config: Arc::new(config),
            tracker: TaskTracker::new(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn is_animating(&self) -> bool {
        !self.tracker.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Starts the effects of every transition. Returns how many had a
    /// rendered element to animate.
    pub fn dispatch(&mut self, transitions: &[Transition]) -> usize {
        transitions
            .iter()
            .filter(|transition| self.play(transition))
            .count()
    }

    pub fn play(&mut self, transition: &Transition) -> bool {
        let Some(anchor) = self.stage.locate(&transition.name) else {
            trace!(
                target = LOG_TARGET,
                player = %transition.name,
                "no rendered element; skipping transition"
            );
            return false;
        };

        debug!(
            target = LOG_TARGET,
            player = %transition.name,
            old_rank = transition.old_rank,
            new_rank = transition.new_rank,
            places = transition.magnitude(),
            direction = ?transition.direction,
            "animating rank change"
        );

        let class = MotionClass::from(transition.direction);
        self.hold_class(&transition.name, class, self.config.class_duration);

        if transition.celebrates() {
            self.celebrate(&transition.name, anchor);
        }

        true
    }

    /// Briefly flags a player whose score changed in place.
    pub fn flash(&mut self, player: &str) -> bool {
        if self.stage.locate(player).is_none() {
            return false;
        }
        self.hold_class(player, MotionClass::Flash, self.config.flash_duration);
        true
    }

    /// Resolves at the first frame boundary with nothing in flight. Unlike
    /// [`AnimationSequencer::settled`] this is cancel-safe.
    pub async fn idle(&self) {
        while self.is_animating() {
            sleep(self.config.frame).await;
        }
    }

    /// Resolves once every tracked animation has finished.
    pub async fn settled(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    fn hold_class(&self, player: &str, class: MotionClass, duration: Duration) {
        let stage = Arc::clone(&self.stage);
        let player = player.to_owned();
        let hold = duration.min(self.config.settle);

        stage.apply(StageEvent::ClassAdded {
            player: player.clone(),
            class,
        });
        spawn_tracked(&self.tracker, class.as_str(), async move {
            sleep(hold).await;
            stage.apply(StageEvent::ClassRemoved { player, class });
        });
    }

    fn celebrate(&mut self, player: &str, origin: Point) {
        let burst = Uuid::new_v4();
        debug!(target = LOG_TARGET, %player, %burst, "celebration burst");

        for index in 0..self.config.burst_size {
            let particle = Particle::launch(origin, Launch::sample(&mut self.rng));
            let flight = fly(
                Arc::clone(&self.stage),
                Arc::clone(&self.config),
                burst,
                index,
                player.to_owned(),
                particle,
            );
            spawn_tracked(&self.tracker, "particle", flight);
        }

        self.sound();
    }

    fn sound(&self) {
        let tone = &self.config.tone;
        let samples = tone.synthesize(self.config.sample_rate);
        if let Err(err) = self.audio.play(tone, &samples) {
            debug!(target = LOG_TARGET, error = %err, "audio cue skipped");
        }
    }
}

async fn fly(
    stage: Arc<dyn Stage>,
    config: Arc<SequencerConfig>,
    burst: Uuid,
    index: usize,
    player: String,
    mut particle: Particle,
) {
    stage.apply(StageEvent::ParticleSpawned {
        burst,
        particle: index,
        player,
        x: particle.position.x,
        y: particle.position.y,
        opacity: particle.opacity,
    });

    let dt = config.frame.as_secs_f64();
    let flight = async {
        let mut ticker = interval(config.frame);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if particle.step(dt, &config.viewport) == Flight::Exited {
                break;
            }
            stage.apply(StageEvent::ParticleMoved {
                burst,
                particle: index,
                x: particle.position.x,
                y: particle.position.y,
                opacity: particle.opacity,
            });
        }
    };

    // a particle leaves by falling past the bottom edge; the cap only guards
    // against a stalled clock
    let cap = max_flight_time(&config.viewport) + config.frame * 4;
    if timeout(cap, flight).await.is_err() {
        trace!(target = LOG_TARGET, %burst, index, "particle hit flight cap");
    }

    stage.apply(StageEvent::ParticleRemoved {
        burst,
        particle: index,
    });
}
