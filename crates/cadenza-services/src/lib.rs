//! cadenza-services: Synthesizer and sequencer/transport layer

pub mod sequencer;
pub mod synth;

pub use sequencer::{Sequencer, SequencerError, TransportState};
pub use synth::{ChordSink, SilentSink, SynthError, Synthesizer};
