//! Playback cursor into the nested section/measure/beat structure

use serde::{Deserialize, Serialize};

use crate::song::{Beat, Song};

/// Cursor into a Song snapshot. Valid only while all three indices are in
/// bounds for the snapshot it was created against; the sequencer re-checks
/// bounds every tick so a concurrently shrunk song never makes this fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub section: usize,
    pub measure: usize,
    pub beat: usize,
}

impl Position {
    pub const START: Self = Self {
        section: 0,
        measure: 0,
        beat: 0,
    };

    pub fn new(section: usize, measure: usize, beat: usize) -> Self {
        Self {
            section,
            measure,
            beat,
        }
    }

    pub fn is_valid(&self, song: &Song) -> bool {
        self.beat_in(song).is_some()
    }

    /// The beat under the cursor, if in bounds
    pub fn beat_in<'a>(&self, song: &'a Song) -> Option<&'a Beat> {
        song.sections
            .get(self.section)?
            .measures
            .get(self.measure)?
            .beats
            .get(self.beat)
    }

    /// Flat beat index from the start of the song
    pub fn absolute_beat(&self, song: &Song) -> Option<usize> {
        if !self.is_valid(song) {
            return None;
        }
        let before_section: usize = song.sections[..self.section]
            .iter()
            .map(|s| s.total_beats())
            .sum();
        let before_measure: usize = song.sections[self.section].measures[..self.measure]
            .iter()
            .map(|m| m.len())
            .sum();
        Some(before_section + before_measure + self.beat)
    }

    /// Cursor for a flat beat index, if the song is long enough
    pub fn from_absolute_beat(song: &Song, absolute: usize) -> Option<Self> {
        let mut remaining = absolute;
        for (section_idx, section) in song.sections.iter().enumerate() {
            for (measure_idx, measure) in section.measures.iter().enumerate() {
                if remaining < measure.len() {
                    return Some(Self::new(section_idx, measure_idx, remaining));
                }
                remaining -= measure.len();
            }
        }
        None
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 1-based, the way players read charts
        write!(
            f,
            "{}.{}.{}",
            self.section + 1,
            self.measure + 1,
            self.beat + 1
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Note;
    use crate::song::{Measure, Section, SectionKind};

    fn two_section_song() -> Song {
        let mut song = Song::new(Note::C, 120.0);
        song.sections = vec![
            Section::new(SectionKind::Verse, "Verse 1", 2),
            Section::new(SectionKind::Chorus, "Chorus", 1),
        ];
        song
    }

    #[test]
    fn absolute_round_trips_over_whole_song() {
        let song = two_section_song();
        let total = song.total_beats();
        assert_eq!(total, 12);
        for n in 0..total {
            let pos = Position::from_absolute_beat(&song, n).unwrap();
            assert_eq!(pos.absolute_beat(&song), Some(n));
        }
        assert!(Position::from_absolute_beat(&song, total).is_none());
    }

    #[test]
    fn crossing_a_section_boundary() {
        let song = two_section_song();
        // First beat of the chorus comes after 2 measures * 4 beats
        assert_eq!(
            Position::from_absolute_beat(&song, 8),
            Some(Position::new(1, 0, 0))
        );
    }

    #[test]
    fn out_of_bounds_is_invalid_not_fatal() {
        let mut song = two_section_song();
        let pos = Position::new(1, 0, 0);
        assert!(pos.is_valid(&song));
        // A concurrent edit shrinks the song under the cursor
        song.sections.pop();
        assert!(!pos.is_valid(&song));
        assert_eq!(pos.absolute_beat(&song), None);
    }

    #[test]
    fn skips_sections_with_no_measures() {
        let mut song = two_section_song();
        song.sections[0].measures = Vec::new();
        assert_eq!(
            Position::from_absolute_beat(&song, 0),
            Some(Position::new(1, 0, 0))
        );
    }

    #[test]
    fn displays_one_based() {
        assert_eq!(Position::new(0, 2, 3).to_string(), "1.3.4");
    }

    #[test]
    fn empty_measures_are_never_valid_cursors() {
        let mut song = two_section_song();
        song.sections[0].measures[0] = Measure::empty(0);
        assert!(!Position::new(0, 0, 0).is_valid(&song));
    }
}
