use std::f64::consts::TAU;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use super::stage::{Stage, StageEvent};

pub const SAMPLE_RATE: u32 = 44_100;

// gain floor the envelope decays to
const RELEASE_LEVEL: f64 = 0.01;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio output unavailable")]
    Unavailable,
    #[error("audio device error: {0}")]
    Device(String),
}

/// Exponential frequency sweep with a decaying gain envelope.
#[derive(Clone, Debug, PartialEq)]
pub struct ToneSweep {
    pub start_hz: f64,
    pub end_hz: f64,
    pub duration: Duration,
    pub peak_gain: f64,
}

impl Default for ToneSweep {
    fn default() -> Self {
        Self {
            start_hz: 440.0,
            end_hz: 880.0,
            duration: Duration::from_millis(300),
            peak_gain: 0.3,
        }
    }
}

impl ToneSweep {
    pub fn frequency_at(&self, t: f64) -> f64 {
        let progress = (t / self.duration.as_secs_f64()).clamp(0.0, 1.0);
        self.start_hz * (self.end_hz / self.start_hz).powf(progress)
    }

    fn gain_at(&self, t: f64) -> f64 {
        let progress = (t / self.duration.as_secs_f64()).clamp(0.0, 1.0);
        self.peak_gain * RELEASE_LEVEL.powf(progress)
    }

    /// Mono PCM samples in `[-peak_gain, peak_gain]`.
    pub fn synthesize(&self, sample_rate: u32) -> Vec<f32> {
        let rate = f64::from(sample_rate);
        let count = (self.duration.as_secs_f64() * rate).round() as usize;
        let mut samples = Vec::with_capacity(count);
        let mut phase = 0.0_f64;

        for idx in 0..count {
            let t = idx as f64 / rate;
            samples.push((phase.sin() * self.gain_at(t)) as f32);
            phase = (phase + TAU * self.frequency_at(t) / rate) % TAU;
        }

        samples
    }
}

/// Where synthesised cues are played.
pub trait ToneOutput: Send + Sync {
    fn play(&self, tone: &ToneSweep, samples: &[f32]) -> Result<(), AudioError>;
}

/// For sessions without any audio capability.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAudio;

impl ToneOutput for NoAudio {
    fn play(&self, _tone: &ToneSweep, _samples: &[f32]) -> Result<(), AudioError> {
        Err(AudioError::Unavailable)
    }
}

/// Rings the terminal bell.
pub struct TerminalBell<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl<W: Write + Send> ToneOutput for TerminalBell<W> {
    fn play(&self, _tone: &ToneSweep, _samples: &[f32]) -> Result<(), AudioError> {
        let mut out = self.out.lock();
        out.write_all(b"\x07")
            .and_then(|_| out.flush())
            .map_err(|err| AudioError::Device(err.to_string()))
    }
}

/// Hands the cue to the stage so remote displays can play it themselves.
pub struct StageTone<S: ?Sized> {
    stage: Arc<S>,
}

impl<S: Stage + ?Sized> StageTone<S> {
    pub fn new(stage: Arc<S>) -> Self {
        Self { stage }
    }
}

impl<S: Stage + ?Sized> ToneOutput for StageTone<S> {
    fn play(&self, tone: &ToneSweep, _samples: &[f32]) -> Result<(), AudioError> {
        self.stage.apply(StageEvent::Tone {
            start_hz: tone.start_hz,
            end_hz: tone.end_hz,
            duration_ms: tone.duration.as_millis() as u64,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::RecordingStage;

    #[test]
    fn sweep_spans_requested_range() {
        let tone = ToneSweep::default();
        assert_eq!(tone.frequency_at(0.0), 440.0);
        assert!((tone.frequency_at(0.3) - 880.0).abs() < 1e-9);
        assert!((tone.frequency_at(0.15) - 440.0 * 2f64.sqrt()).abs() < 1e-9);
        assert!((tone.frequency_at(5.0) - 880.0).abs() < 1e-9);
    }

    #[test]
    fn synthesized_buffer_matches_duration_and_gain() {
        let tone = ToneSweep::default();
        let samples = tone.synthesize(SAMPLE_RATE);

        assert_eq!(samples.len(), 13_230);
        let peak = tone.peak_gain as f32;
        assert!(samples.iter().all(|s| s.abs() <= peak + f32::EPSILON));
        assert!(samples.iter().any(|s| s.abs() > peak / 2.0));

        let tail = &samples[samples.len() - 100..];
        assert!(tail.iter().all(|s| s.abs() < peak / 10.0));
    }

    #[test]
    fn no_audio_reports_unavailable() {
        let err = NoAudio.play(&ToneSweep::default(), &[]).unwrap_err();
        assert!(matches!(err, AudioError::Unavailable));
    }

    #[test]
    fn terminal_bell_writes_bel() {
        let bell = TerminalBell::new(Vec::new());
        bell.play(&ToneSweep::default(), &[]).unwrap();
        assert_eq!(bell.out.lock().as_slice(), b"\x07");
    }

    #[test]
    fn stage_tone_forwards_event() {
        let stage = Arc::new(RecordingStage::default());
        let output = StageTone::new(Arc::clone(&stage));
        output.play(&ToneSweep::default(), &[]).unwrap();

        assert_eq!(
            stage.events(),
            vec![StageEvent::Tone {
                start_hz: 440.0,
                end_hz: 880.0,
                duration_ms: 300,
            }]
        );
    }
}
