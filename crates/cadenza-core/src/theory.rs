//! Scale-degree resolution and chord voicing

use crate::chord::NashvilleChord;
use crate::error::{CoreError, Result};
use crate::note::{DEFAULT_OCTAVE, Note};

/// Major-scale semitone pattern. Other modes are out of scope.
pub const MAJOR_SCALE_INTERVALS: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Resolve a scale degree (1-7) to its pitch class in the given key
pub fn degree_to_note(key: Note, degree: u8) -> Result<Note> {
    if !(1..=7).contains(&degree) {
        return Err(CoreError::InvalidDegree(degree));
    }
    let offset = MAJOR_SCALE_INTERVALS[degree as usize - 1] as usize;
    Ok(Note::from_chromatic_index(key.chromatic_index() + offset))
}

/// Frequencies for each chord tone, in formula order.
///
/// Tones are voiced from the root in the default octave, carrying into the
/// next octave when the formula wraps past B so the chord stacks upward
/// (G major yields G4-B4-D5, not G4-B4-D4).
pub fn chord_frequencies(chord: &NashvilleChord, key: Note) -> Result<Vec<f32>> {
    let root = degree_to_note(key, chord.degree)?;
    let root_index = root.chromatic_index();

    Ok(chord
        .quality
        .intervals()
        .iter()
        .map(|&offset| {
            let index = root_index + offset as usize;
            let note = Note::from_chromatic_index(index);
            note.frequency(DEFAULT_OCTAVE + (index / 12) as i32)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::ChordQuality;
    use crate::note::NOTES;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 0.02,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn diatonic_degrees_in_c() {
        let expected = [Note::C, Note::D, Note::E, Note::F, Note::G, Note::A, Note::B];
        for (degree, note) in (1..=7).zip(expected) {
            assert_eq!(degree_to_note(Note::C, degree).unwrap(), note);
        }
    }

    #[test]
    fn degree_resolution_is_total_and_transposes() {
        for key in NOTES {
            for degree in 1..=7u8 {
                let note = degree_to_note(key, degree).unwrap();
                // Transposing the key transposes the result by the same amount
                for shift in 0..12 {
                    let shifted_key = Note::from_chromatic_index(key.chromatic_index() + shift);
                    let shifted = degree_to_note(shifted_key, degree).unwrap();
                    assert_eq!(
                        shifted.chromatic_index(),
                        (note.chromatic_index() + shift) % 12
                    );
                }
            }
        }
    }

    #[test]
    fn rejects_out_of_range_degrees() {
        assert!(matches!(
            degree_to_note(Note::C, 0),
            Err(CoreError::InvalidDegree(0))
        ));
        assert!(matches!(
            degree_to_note(Note::C, 8),
            Err(CoreError::InvalidDegree(8))
        ));
    }

    #[test]
    fn five_major_in_c_is_g_triad() {
        let chord = NashvilleChord::new(5, ChordQuality::Major);
        let freqs = chord_frequencies(&chord, Note::C).unwrap();
        assert_eq!(freqs.len(), 3);
        assert_close(freqs[0], 392.00); // G4
        assert_close(freqs[1], 493.88); // B4
        assert_close(freqs[2], 587.33); // D5
    }

    #[test]
    fn two_minor_in_c_is_d_minor_triad() {
        let chord = NashvilleChord::new(2, ChordQuality::Minor);
        let freqs = chord_frequencies(&chord, Note::C).unwrap();
        assert_close(freqs[0], 293.66); // D4
        assert_close(freqs[1], 349.23); // F4
        assert_close(freqs[2], 440.00); // A4
    }

    #[test]
    fn every_quality_yields_formula_length_positive_frequencies() {
        for key in NOTES {
            for quality in crate::chord::CHORD_QUALITIES {
                for degree in 1..=7u8 {
                    let chord = NashvilleChord::new(degree, quality);
                    let freqs = chord_frequencies(&chord, key).unwrap();
                    assert_eq!(freqs.len(), quality.intervals().len());
                    assert!(freqs.iter().all(|&f| f > 0.0));
                }
            }
        }
    }

    #[test]
    fn inversion_and_bass_do_not_affect_voicing() {
        let plain = NashvilleChord::new(1, ChordQuality::Major);
        let mut slashed = plain;
        slashed.inversion = Some(1);
        slashed.bass = Some(5);
        assert_eq!(
            chord_frequencies(&plain, Note::E).unwrap(),
            chord_frequencies(&slashed, Note::E).unwrap()
        );
    }
}
