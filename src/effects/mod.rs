//! Display-side effects: class toggles, confetti and the celebration tone.

pub mod particles;
pub mod sequencer;
pub mod stage;
pub mod terminal;
pub mod tone;

pub use sequencer::{AnimationSequencer, SequencerConfig};
pub use stage::{MotionClass, Roster, Stage, StageEvent};

#[cfg(test)]
pub(crate) use stage::tests::RecordingStage;
pub use terminal::TerminalStage;
pub use tone::{AudioError, NoAudio, StageTone, TerminalBell, ToneOutput, ToneSweep};
