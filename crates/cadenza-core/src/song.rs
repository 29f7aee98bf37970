//! Song arrangement: sections, measures, beats

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::chord::NashvilleChord;
use crate::error::{CoreError, Result};
use crate::note::Note;

/// Beats per measure used by the editing defaults (4/4 convention)
pub const DEFAULT_BEATS_PER_MEASURE: usize = 4;
const DEFAULT_MEASURES_PER_SECTION: usize = 4;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique-enough id for songs and sections (timestamp + process counter)
pub fn generate_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let count = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{millis}-{count}")
}

/// What a beat sounds: nothing, or one chord
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BeatValue {
    #[default]
    Rest,
    Chord(NashvilleChord),
}

impl BeatValue {
    pub fn chord(&self) -> Option<&NashvilleChord> {
        match self {
            Self::Rest => None,
            Self::Chord(chord) => Some(chord),
        }
    }

    pub fn is_sounding(&self) -> bool {
        matches!(self, Self::Chord(_))
    }
}

impl From<Option<NashvilleChord>> for BeatValue {
    fn from(chord: Option<NashvilleChord>) -> Self {
        chord.map_or(Self::Rest, Self::Chord)
    }
}

// Wire format keeps the original nullable `chord` field
mod beat_value_serde {
    use super::BeatValue;
    use crate::chord::NashvilleChord;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &BeatValue, ser: S) -> Result<S::Ok, S::Error> {
        value.chord().serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<BeatValue, D::Error> {
        Ok(Option::<NashvilleChord>::deserialize(de)?.into())
    }
}

fn default_duration() -> f32 {
    1.0
}

/// One slot of the grid: a rest or a sounding chord, with a length in beats
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    #[serde(rename = "chord", default, with = "beat_value_serde")]
    pub value: BeatValue,
    /// Length in beat units; always positive, defaults to one beat
    #[serde(default = "default_duration")]
    pub duration: f32,
}

impl Beat {
    pub fn rest() -> Self {
        Self {
            value: BeatValue::Rest,
            duration: 1.0,
        }
    }

    pub fn chord(chord: NashvilleChord) -> Self {
        Self {
            value: BeatValue::Chord(chord),
            duration: 1.0,
        }
    }

    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration;
        self
    }
}

impl Default for Beat {
    fn default() -> Self {
        Self::rest()
    }
}

/// Ordered beats; serialized as a bare array like the original grid rows
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Measure {
    pub beats: Vec<Beat>,
}

impl Measure {
    /// A measure of rests, conventionally four beats
    pub fn empty(beats: usize) -> Self {
        Self {
            beats: vec![Beat::rest(); beats],
        }
    }

    pub fn from_beats(beats: Vec<Beat>) -> Self {
        Self { beats }
    }

    pub fn len(&self) -> usize {
        self.beats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
    }
}

/// Structural role of a section within the song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionKind {
    Intro,
    Verse,
    #[serde(rename = "Pre-Chorus")]
    PreChorus,
    Chorus,
    Bridge,
    Outro,
}

impl SectionKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Intro => "Intro",
            Self::Verse => "Verse",
            Self::PreChorus => "Pre-Chorus",
            Self::Chorus => "Chorus",
            Self::Bridge => "Bridge",
            Self::Outro => "Outro",
        }
    }
}

/// A named run of measures (verse, chorus, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SectionKind,
    pub name: String,
    #[serde(default)]
    pub lyrics: String,
    pub measures: Vec<Measure>,
}

impl Section {
    /// New section filled with empty four-beat measures
    pub fn new(kind: SectionKind, name: impl Into<String>, measure_count: usize) -> Self {
        Self {
            id: generate_id(),
            kind,
            name: name.into(),
            lyrics: String::new(),
            measures: vec![Measure::empty(DEFAULT_BEATS_PER_MEASURE); measure_count],
        }
    }

    /// Deep copy under a fresh id
    pub fn duplicate(&self) -> Self {
        Self {
            id: generate_id(),
            ..self.clone()
        }
    }

    pub fn total_beats(&self) -> usize {
        self.measures.iter().map(Measure::len).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }
}

/// The complete arrangement the sequencer reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artist: String,
    pub key: Note,
    /// Beats per minute; must be positive
    pub tempo: f64,
    #[serde(rename = "timeSignature", default)]
    pub time_signature: TimeSignature,
    pub sections: Vec<Section>,
}

impl Song {
    /// New song with the editing collaborator's defaults: a verse and a chorus
    pub fn new(key: Note, tempo: f64) -> Self {
        Self {
            id: generate_id(),
            title: "Untitled Song".to_string(),
            artist: String::new(),
            key,
            tempo,
            time_signature: TimeSignature::default(),
            sections: vec![
                Section::new(SectionKind::Verse, "Verse 1", DEFAULT_MEASURES_PER_SECTION),
                Section::new(SectionKind::Chorus, "Chorus", DEFAULT_MEASURES_PER_SECTION),
            ],
        }
    }

    /// Sanity-check invariants the editing collaborator is supposed to hold
    pub fn validate(&self) -> Result<()> {
        if self.tempo <= 0.0 {
            return Err(CoreError::InvalidTempo(self.tempo));
        }
        for section in &self.sections {
            for measure in &section.measures {
                for beat in &measure.beats {
                    if let Some(chord) = beat.value.chord() {
                        if !(1..=7).contains(&chord.degree) {
                            return Err(CoreError::InvalidDegree(chord.degree));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Seconds one beat unit lasts at this tempo
    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.tempo
    }

    pub fn total_beats(&self) -> usize {
        self.sections.iter().map(Section::total_beats).sum()
    }

    /// Whether any beat in the arrangement sounds a chord
    pub fn has_sounding_beat(&self) -> bool {
        self.sections.iter().any(|section| {
            section
                .measures
                .iter()
                .any(|measure| measure.beats.iter().any(|beat| beat.value.is_sounding()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::ChordQuality;

    #[test]
    fn new_song_matches_editing_defaults() {
        let song = Song::new(Note::C, 120.0);
        assert_eq!(song.sections.len(), 2);
        assert_eq!(song.sections[0].kind, SectionKind::Verse);
        assert_eq!(song.total_beats(), 2 * 4 * 4);
        assert!(!song.has_sounding_beat());
        song.validate().unwrap();
    }

    #[test]
    fn duplicate_gets_fresh_id() {
        let section = Section::new(SectionKind::Chorus, "Chorus", 2);
        let copy = section.duplicate();
        assert_ne!(section.id, copy.id);
        assert_eq!(section.measures, copy.measures);
    }

    #[test]
    fn validate_rejects_bad_tempo_and_degree() {
        let mut song = Song::new(Note::C, 0.0);
        assert!(song.validate().is_err());
        song.tempo = 90.0;
        song.sections[0].measures[0].beats[0] =
            Beat::chord(NashvilleChord::new(9, ChordQuality::Major));
        assert!(matches!(song.validate(), Err(CoreError::InvalidDegree(9))));
    }

    #[test]
    fn beat_wire_format_matches_original_grid() {
        // Missing chord field and missing duration both take defaults
        let beat: Beat = serde_json::from_str("{}").unwrap();
        assert_eq!(beat.value, BeatValue::Rest);
        assert_eq!(beat.duration, 1.0);

        let beat: Beat =
            serde_json::from_str(r#"{"chord":{"degree":1,"quality":"maj7"},"duration":2}"#)
                .unwrap();
        assert!(beat.value.is_sounding());
        assert_eq!(beat.duration, 2.0);

        // Rests serialize with an explicit null chord
        let json = serde_json::to_string(&Beat::rest()).unwrap();
        assert_eq!(json, r#"{"chord":null,"duration":1.0}"#);
    }

    #[test]
    fn measure_serializes_as_bare_array() {
        let measure = Measure::empty(2);
        let json = serde_json::to_string(&measure).unwrap();
        assert!(json.starts_with('['));
        let back: Measure = serde_json::from_str(&json).unwrap();
        assert_eq!(back, measure);
    }

    #[test]
    fn song_round_trips_through_json() {
        let mut song = Song::new(Note::Fs, 96.0);
        song.sections[1].measures[2].beats[3] =
            Beat::chord(NashvilleChord::new(4, ChordQuality::Sus4)).with_duration(2.0);
        let json = serde_json::to_string(&song).unwrap();
        assert!(json.contains("\"timeSignature\""));
        let back: Song = serde_json::from_str(&json).unwrap();
        assert_eq!(back, song);
    }
}
