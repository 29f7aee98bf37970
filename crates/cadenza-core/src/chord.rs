//! Chord qualities and Nashville-notation chords

use serde::{Deserialize, Serialize};

/// Chord quality selecting a fixed interval formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChordQuality {
    #[serde(rename = "major")]
    Major,
    #[serde(rename = "minor")]
    Minor,
    #[serde(rename = "diminished")]
    Diminished,
    #[serde(rename = "augmented")]
    Augmented,
    #[serde(rename = "sus2")]
    Sus2,
    #[serde(rename = "sus4")]
    Sus4,
    #[serde(rename = "7")]
    Dominant7,
    #[serde(rename = "maj7")]
    Major7,
    #[serde(rename = "min7")]
    Minor7,
    #[serde(rename = "dim7")]
    Diminished7,
}

/// All supported qualities
pub const CHORD_QUALITIES: [ChordQuality; 10] = [
    ChordQuality::Major,
    ChordQuality::Minor,
    ChordQuality::Diminished,
    ChordQuality::Augmented,
    ChordQuality::Sus2,
    ChordQuality::Sus4,
    ChordQuality::Dominant7,
    ChordQuality::Major7,
    ChordQuality::Minor7,
    ChordQuality::Diminished7,
];

impl ChordQuality {
    /// Interval formula as semitone offsets from the root, in stacking order
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            Self::Major => &[0, 4, 7],
            Self::Minor => &[0, 3, 7],
            Self::Diminished => &[0, 3, 6],
            Self::Augmented => &[0, 4, 8],
            Self::Sus2 => &[0, 2, 7],
            Self::Sus4 => &[0, 5, 7],
            Self::Dominant7 => &[0, 4, 7, 10],
            Self::Major7 => &[0, 4, 7, 11],
            Self::Minor7 => &[0, 3, 7, 10],
            Self::Diminished7 => &[0, 3, 6, 9],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Major => "Major",
            Self::Minor => "Minor",
            Self::Diminished => "Dim",
            Self::Augmented => "Aug",
            Self::Sus2 => "Sus2",
            Self::Sus4 => "Sus4",
            Self::Dominant7 => "7",
            Self::Major7 => "Maj7",
            Self::Minor7 => "Min7",
            Self::Diminished7 => "Dim7",
        }
    }
}

/// A chord written against the key as a scale degree.
///
/// `inversion` and `bass` exist in the schema for slash-chord notation but are
/// never consulted when voicing audio; the upstream format left their sonic
/// meaning unspecified, so synthesis always plays root position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NashvilleChord {
    /// Scale degree, 1-7
    pub degree: u8,
    pub quality: ChordQuality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inversion: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bass: Option<u8>,
}

impl NashvilleChord {
    pub fn new(degree: u8, quality: ChordQuality) -> Self {
        Self {
            degree,
            quality,
            inversion: None,
            bass: None,
        }
    }
}
