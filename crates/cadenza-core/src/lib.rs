//! cadenza-core: Domain types and music theory for the cadenza sequencer

mod chord;
mod error;
mod note;
mod position;
mod song;
pub mod theory;

pub use chord::{CHORD_QUALITIES, ChordQuality, NashvilleChord};
pub use error::{CoreError, Result};
pub use note::{DEFAULT_OCTAVE, NOTES, Note};
pub use position::Position;
pub use song::{
    Beat, BeatValue, DEFAULT_BEATS_PER_MEASURE, Measure, Section, SectionKind, Song,
    TimeSignature, generate_id,
};
pub use theory::{MAJOR_SCALE_INTERVALS, chord_frequencies, degree_to_note};
