//! Chromatic pitch classes and frequency lookup

use serde::{Deserialize, Serialize};

/// Octave used when a chord is voiced without any register information
pub const DEFAULT_OCTAVE: i32 = 4;

/// The 12 chromatic pitch classes, circularly ordered from C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Note {
    C,
    #[serde(rename = "C#")]
    Cs,
    D,
    #[serde(rename = "D#")]
    Ds,
    E,
    F,
    #[serde(rename = "F#")]
    Fs,
    G,
    #[serde(rename = "G#")]
    Gs,
    A,
    #[serde(rename = "A#")]
    As,
    B,
}

/// All pitch classes in chromatic order
pub const NOTES: [Note; 12] = [
    Note::C,
    Note::Cs,
    Note::D,
    Note::Ds,
    Note::E,
    Note::F,
    Note::Fs,
    Note::G,
    Note::Gs,
    Note::A,
    Note::As,
    Note::B,
];

impl Note {
    /// Index in the chromatic circle (C = 0 .. B = 11)
    pub fn chromatic_index(&self) -> usize {
        NOTES.iter().position(|n| n == self).unwrap_or(0)
    }

    /// Pitch class at a chromatic index, wrapping mod 12
    pub fn from_chromatic_index(index: usize) -> Self {
        NOTES[index % 12]
    }

    /// Equal-tempered frequency in the reference octave, anchored at A4 = 440 Hz
    pub fn reference_frequency(&self) -> f32 {
        match self {
            Self::C => 261.63,
            Self::Cs => 277.18,
            Self::D => 293.66,
            Self::Ds => 311.13,
            Self::E => 329.63,
            Self::F => 349.23,
            Self::Fs => 369.99,
            Self::G => 392.00,
            Self::Gs => 415.30,
            Self::A => 440.00,
            Self::As => 466.16,
            Self::B => 493.88,
        }
    }

    /// Frequency in an arbitrary octave (each octave doubles the reference)
    pub fn frequency(&self, octave: i32) -> f32 {
        self.reference_frequency() * 2f32.powi(octave - DEFAULT_OCTAVE)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::C => "C",
            Self::Cs => "C#",
            Self::D => "D",
            Self::Ds => "D#",
            Self::E => "E",
            Self::F => "F",
            Self::Fs => "F#",
            Self::G => "G",
            Self::Gs => "G#",
            Self::A => "A",
            Self::As => "A#",
            Self::B => "B",
        }
    }
}

impl std::fmt::Display for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
