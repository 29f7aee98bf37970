//! Chord synthesizer: sine voices with an attack/decay envelope through one
//! shared output stream

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cadenza_core::{NashvilleChord, Note, chord_frequencies};
use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;
use tracing::{error, info, warn};

/// Output level of the shared gain stage
const MASTER_GAIN: f32 = 0.3;
/// Total envelope headroom split across the tones of a chord
const CHORD_HEADROOM: f32 = 0.2;
/// Linear attack window in seconds
const ATTACK_SECS: f32 = 0.01;
/// Near-silence target the exponential decay reaches at the end of a tone
const DECAY_FLOOR: f32 = 0.01;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("No audio output devices found")]
    NoDevices,
    #[error("Failed to get default output config: {0}")]
    ConfigError(String),
    #[error("Failed to build output stream: {0}")]
    StreamError(String),
}

/// Seam between the sequencer and the audio backend. Implementations are
/// constructed on the sequencer thread and need not be Send.
pub trait ChordSink {
    /// Start every tone of the chord now; all tones end after `duration`.
    /// Side-effecting only: failures are logged, never surfaced.
    fn play_chord(&mut self, chord: &NashvilleChord, key: Note, duration: Duration);

    /// Cut all in-flight tones immediately
    fn stop(&mut self);
}

impl ChordSink for Box<dyn ChordSink> {
    fn play_chord(&mut self, chord: &NashvilleChord, key: Note, duration: Duration) {
        (**self).play_chord(chord, key, duration);
    }

    fn stop(&mut self) {
        (**self).stop();
    }
}

/// One sounding sine tone with its envelope position
#[derive(Debug, Clone)]
struct ToneVoice {
    frequency: f32,
    phase: f32,
    peak: f32,
    /// Envelope sample counts
    attack: usize,
    total: usize,
    elapsed: usize,
}

impl ToneVoice {
    fn new(frequency: f32, peak: f32, sample_rate: f32, duration_secs: f32) -> Self {
        let total = ((duration_secs * sample_rate) as usize).max(1);
        let attack = ((ATTACK_SECS * sample_rate) as usize).max(1).min(total);
        Self {
            frequency,
            phase: 0.0,
            peak,
            attack,
            total,
            elapsed: 0,
        }
    }

    fn active(&self) -> bool {
        self.elapsed < self.total
    }

    /// Linear ramp to the peak, then exponential decay hitting the floor
    /// exactly at the end of the tone
    fn envelope(&self) -> f32 {
        if self.elapsed < self.attack {
            return self.peak * self.elapsed as f32 / self.attack as f32;
        }
        if self.elapsed >= self.total || self.total == self.attack {
            return 0.0;
        }
        let frac = (self.elapsed - self.attack) as f32 / (self.total - self.attack) as f32;
        let ratio = (DECAY_FLOOR / self.peak).min(1.0);
        self.peak * ratio.powf(frac)
    }

    fn next_sample(&mut self, sample_rate: f32) -> f32 {
        let sample = (self.phase * std::f32::consts::TAU).sin() * self.envelope();
        self.phase = (self.phase + self.frequency / sample_rate).fract();
        self.elapsed += 1;
        sample
    }
}

/// All in-flight tones, mixed by the stream callback
#[derive(Debug)]
pub(crate) struct VoiceBank {
    sample_rate: f32,
    voices: Vec<ToneVoice>,
}

impl VoiceBank {
    fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            voices: Vec::new(),
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Start one voice per frequency; peak headroom is split across the
    /// chord so stacking more tones cannot clip
    fn start_chord(&mut self, frequencies: &[f32], duration_secs: f32) {
        if frequencies.is_empty() {
            return;
        }
        let peak = CHORD_HEADROOM / frequencies.len() as f32;
        for &frequency in frequencies {
            self.voices
                .push(ToneVoice::new(frequency, peak, self.sample_rate, duration_secs));
        }
    }

    fn silence(&mut self) {
        self.voices.clear();
    }

    /// Mix every active voice into an interleaved output buffer
    fn render(&mut self, buffer: &mut [f32], channels: usize) {
        for frame in buffer.chunks_mut(channels.max(1)) {
            let mix: f32 = self
                .voices
                .iter_mut()
                .map(|v| v.next_sample(self.sample_rate))
                .sum();
            frame.fill(mix * MASTER_GAIN);
        }
        self.voices.retain(ToneVoice::active);
    }
}

/// Builds the shared output stage and returns the playing stream
fn open_output_stream(bank: Arc<Mutex<VoiceBank>>) -> Result<cpal::Stream, SynthError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(SynthError::NoDevices)?;

    let supported_config = device
        .default_output_config()
        .map_err(|e| SynthError::ConfigError(e.to_string()))?;

    let sample_rate = supported_config.sample_rate().0;
    let channels = supported_config.channels() as usize;
    let config: StreamConfig = supported_config.into();

    if let Ok(mut bank) = bank.lock() {
        bank.set_sample_rate(sample_rate as f32);
    }

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let Ok(mut bank) = bank.lock() else {
                    data.fill(0.0);
                    return;
                };
                bank.render(data, channels);
            },
            move |err| error!("Output stream error: {err}"),
            None,
        )
        .map_err(|e| SynthError::StreamError(e.to_string()))?;

    stream
        .play()
        .map_err(|e| SynthError::StreamError(e.to_string()))?;

    info!(sample_rate, channels, "Opened synthesizer output stream");
    Ok(stream)
}

/// Renders chords through one shared cpal output stream.
///
/// Not Send (cpal streams are thread-bound); construct it on the thread that
/// will play through it.
pub struct Synthesizer {
    bank: Arc<Mutex<VoiceBank>>,
    stream: Option<cpal::Stream>,
}

impl Synthesizer {
    pub fn new() -> Result<Self, SynthError> {
        let bank = Arc::new(Mutex::new(VoiceBank::new(44100.0)));
        let stream = open_output_stream(bank.clone())?;
        Ok(Self {
            bank,
            stream: Some(stream),
        })
    }
}

impl ChordSink for Synthesizer {
    fn play_chord(&mut self, chord: &NashvilleChord, key: Note, duration: Duration) {
        if self.stream.is_none() {
            // Output stage was lost and could not be re-acquired; stay silent
            return;
        }
        let frequencies = match chord_frequencies(chord, key) {
            Ok(f) => f,
            Err(e) => {
                warn!("Skipping unplayable chord: {e}");
                return;
            }
        };
        if let Ok(mut bank) = self.bank.lock() {
            bank.start_chord(&frequencies, duration.as_secs_f32());
        }
    }

    fn stop(&mut self) {
        if let Ok(mut bank) = self.bank.lock() {
            bank.silence();
        }
        // The output stage may be unusable once released, so tearing it down
        // is always paired with re-acquisition
        self.stream = None;
        match open_output_stream(self.bank.clone()) {
            Ok(stream) => self.stream = Some(stream),
            Err(e) => warn!("Could not re-acquire audio output after stop: {e}"),
        }
    }
}

/// Sink used when no audio backend is available: transport keeps running and
/// reporting positions, nothing sounds
#[derive(Debug, Default)]
pub struct SilentSink;

impl ChordSink for SilentSink {
    fn play_chord(&mut self, _chord: &NashvilleChord, _key: Note, _duration: Duration) {}

    fn stop(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_reaches_peak_then_decays_to_floor() {
        // 1 kHz sample rate, 100 ms tone: attack 10 samples, total 100
        let voice = |elapsed| ToneVoice {
            elapsed,
            ..ToneVoice::new(440.0, 0.1, 1000.0, 0.1)
        };
        assert_eq!(voice(0).envelope(), 0.0);
        assert!((voice(10).envelope() - 0.1).abs() < 1e-6);
        // Monotone decay after the attack
        assert!(voice(30).envelope() < voice(20).envelope());
        // Exactly the floor on the final sample
        assert!((voice(99).envelope() - DECAY_FLOOR).abs() < 1e-3);
        assert_eq!(voice(100).envelope(), 0.0);
    }

    #[test]
    fn peak_splits_headroom_by_tone_count() {
        let mut bank = VoiceBank::new(1000.0);
        bank.start_chord(&[100.0, 200.0, 300.0, 400.0], 1.0);
        assert_eq!(bank.voices.len(), 4);
        for voice in &bank.voices {
            assert!((voice.peak - CHORD_HEADROOM / 4.0).abs() < 1e-6);
        }
    }

    #[test]
    fn voices_expire_with_their_duration() {
        let mut bank = VoiceBank::new(1000.0);
        bank.start_chord(&[220.0], 0.05); // 50 samples
        let mut buffer = vec![0.0f32; 49];
        bank.render(&mut buffer, 1);
        assert_eq!(bank.voices.len(), 1);
        let mut rest = vec![0.0f32; 2];
        bank.render(&mut rest, 1);
        assert!(bank.voices.is_empty());
    }

    #[test]
    fn render_stays_within_headroom() {
        let mut bank = VoiceBank::new(8000.0);
        bank.start_chord(&[261.63, 329.63, 392.0], 0.5);
        let mut buffer = vec![0.0f32; 4000 * 2];
        bank.render(&mut buffer, 2);
        let peak = buffer.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.0, "chord should be audible");
        assert!(peak <= CHORD_HEADROOM * MASTER_GAIN + 1e-6);
    }

    #[test]
    fn silence_cuts_all_voices() {
        let mut bank = VoiceBank::new(1000.0);
        bank.start_chord(&[100.0, 150.0], 1.0);
        bank.silence();
        let mut buffer = vec![1.0f32; 8];
        bank.render(&mut buffer, 2);
        assert!(buffer.iter().all(|&s| s == 0.0));
    }
}
