use score_model::{NoteEvent, Part, PitchSequence, Score};

use crate::error::AnalysisError;
use crate::harmony::{reduce, select_parts, selection_notes, HarmonicReduction};
use crate::key::estimate_key;
use crate::melodic::{analyze_part, MelodicOptions, MelodicRecord};
use crate::symmetry::{analyze_sequence, SymmetryMode, SymmetryResult};
use crate::types::{Key, KeyDetection, KeyProfile};

/// Trait for score analysis backends.
///
/// The engine and the advanced passes go through this seam, so a backend can
/// swap key finding or chord labelling without touching the passes.
pub trait ScoreAnalyzer: Send + Sync {
    fn analyze_key(&self, notes: &[NoteEvent]) -> KeyDetection;

    fn analyze_melody(&self, part: &Part, index: usize, options: MelodicOptions) -> MelodicRecord;

    /// Reduce the selected parts. Without `key`, the key comes from
    /// [`ScoreAnalyzer::analyze_key`] over the selected parts' notes.
    fn reduce_harmony(
        &self,
        score: &Score,
        part_indices: &[usize],
        key: Option<Key>,
    ) -> Result<HarmonicReduction, AnalysisError> {
        let selected = select_parts(score, part_indices)?;
        let key = match key {
            Some(key) => KeyDetection { key, confidence: 1.0 },
            None => self.analyze_key(&selection_notes(score, &selected)),
        };
        reduce(score, &selected, key)
    }

    fn analyze_symmetry(
        &self,
        sequence: &PitchSequence,
        part: &str,
        mode: SymmetryMode,
        tonic: u8,
    ) -> SymmetryResult;
}

/// Profile-correlation key finding, template chord matching and exact
/// pitch-class symmetry comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnalyzer {
    pub profile: KeyProfile,
}

impl HeuristicAnalyzer {
    pub fn new(profile: KeyProfile) -> Self {
        Self { profile }
    }
}

impl ScoreAnalyzer for HeuristicAnalyzer {
    fn analyze_key(&self, notes: &[NoteEvent]) -> KeyDetection {
        estimate_key(notes, self.profile)
    }

    fn analyze_melody(&self, part: &Part, index: usize, options: MelodicOptions) -> MelodicRecord {
        analyze_part(part, index, options)
    }

    fn analyze_symmetry(
        &self,
        sequence: &PitchSequence,
        part: &str,
        mode: SymmetryMode,
        tonic: u8,
    ) -> SymmetryResult {
        analyze_sequence(sequence, part, mode, tonic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use score_model::{Event, Measure, Pitch};

    fn held_chord(number: u32, midis: &[u8]) -> Measure {
        let pitches = midis.iter().map(|&m| Pitch::from_midi(m)).collect();
        Measure::new(number, (number - 1) as f64 * 4.0, 4.0).with_events(vec![Event::chord(0.0, 4.0, pitches)])
    }

    fn two_keys() -> Score {
        let organ = Part::new("P1")
            .with_name("Organ")
            .with_measures(vec![held_chord(1, &[60, 64, 67]), held_chord(2, &[48, 64, 67])]);
        let strings = Part::new("P2").with_measures(vec![held_chord(1, &[66, 70, 73]), held_chord(2, &[71, 75, 78])]);
        Score::new("Two keys", vec![organ, strings]).unwrap()
    }

    /// Reports Bb major for any material.
    struct FlatSide;

    impl ScoreAnalyzer for FlatSide {
        fn analyze_key(&self, _notes: &[NoteEvent]) -> KeyDetection {
            KeyDetection { key: Key::major(10), confidence: 0.9 }
        }

        fn analyze_melody(&self, part: &Part, index: usize, options: MelodicOptions) -> MelodicRecord {
            analyze_part(part, index, options)
        }

        fn analyze_symmetry(&self, sequence: &PitchSequence, part: &str, mode: SymmetryMode, tonic: u8) -> SymmetryResult {
            analyze_sequence(sequence, part, mode, tonic)
        }
    }

    #[test]
    fn reduction_key_is_estimated_from_selected_parts_only() {
        let reduction = HeuristicAnalyzer::default().reduce_harmony(&two_keys(), &[0], None).unwrap();
        assert_eq!(reduction.reduction_key, "C major");
        assert_eq!(reduction.selected_instruments, vec!["Organ"]);
    }

    #[test]
    fn reduction_uses_the_analyzers_key() {
        let reduction = FlatSide.reduce_harmony(&two_keys(), &[0], None).unwrap();
        assert_eq!(reduction.reduction_key, "Bb major");
        assert_eq!(reduction.key.confidence, 0.9);
        // C major triad is II in Bb
        assert_eq!(reduction.chord_report[0].tonal_functions, vec!["II"]);
    }

    #[test]
    fn explicit_key_skips_estimation() {
        let reduction = FlatSide.reduce_harmony(&two_keys(), &[0], Some(Key::major(0))).unwrap();
        assert_eq!(reduction.reduction_key, "C major");
        assert_eq!(reduction.chord_report[0].tonal_functions, vec!["I"]);
    }

    #[test]
    fn bad_selection_fails_before_key_finding() {
        assert!(matches!(
            FlatSide.reduce_harmony(&two_keys(), &[2], None),
            Err(AnalysisError::IndexOutOfRange { index: 2, part_count: 2 })
        ));
    }
}
