use score_model::{Part, Score};
use serde::{Deserialize, Serialize};

use super::AdvancedResult;
use crate::analyzer::ScoreAnalyzer;
use crate::chordify::chordify_measure;
use crate::error::AnalysisError;
use crate::harmony::{Sonority, UNKNOWN_CHORD};
use crate::melodic::{count_labels, LabelCount};

/// Trailing measures scanned for cadences.
const CADENCE_SCAN_MEASURES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CadenceKind {
    #[serde(rename = "Authentic (V-I)")]
    Authentic,
    #[serde(rename = "Plagal (IV-I)")]
    Plagal,
}

impl CadenceKind {
    /// Bass motion into C: G → C is authentic, F → C plagal.
    fn from_bass(previous: u8, current: u8) -> Option<Self> {
        match (previous, current) {
            (7, 0) => Some(CadenceKind::Authentic),
            (5, 0) => Some(CadenceKind::Plagal),
            _ => None,
        }
    }

    pub fn strength(&self) -> f64 {
        match self {
            CadenceKind::Authentic => 0.95,
            CadenceKind::Plagal => 0.80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cadence {
    /// Measure the cadence resolves into.
    pub measure: u32,
    #[serde(rename = "type")]
    pub kind: CadenceKind,
    pub strength: f64,
    pub instrument: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadenceReport {
    pub cadences: Vec<Cadence>,
    pub total_cadences: usize,
}

/// Bass pitch class of the first sounding slice in a measure.
fn opening_bass(part: &Part, measure_index: usize) -> Option<u8> {
    chordify_measure(&[part], measure_index)
        .first()
        .and_then(|slice| slice.bass_pitch_class())
}

pub(super) fn cadences(score: &Score, _analyzer: &dyn ScoreAnalyzer) -> Result<AdvancedResult, AnalysisError> {
    let mut found = Vec::new();
    for (index, part) in score.parts().iter().enumerate() {
        let count = part.measure_count();
        let start = count.saturating_sub(CADENCE_SCAN_MEASURES).max(1);
        for m in start..count {
            let (Some(previous), Some(current)) = (opening_bass(part, m - 1), opening_bass(part, m)) else {
                continue;
            };
            if let Some(kind) = CadenceKind::from_bass(previous, current) {
                found.push(Cadence {
                    measure: m as u32 + 1,
                    kind,
                    strength: kind.strength(),
                    instrument: part.display_name(index),
                });
            }
        }
    }
    Ok(AdvancedResult::Cadences(CadenceReport {
        total_cadences: found.len(),
        cadences: found,
    }))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonicFunctionsReport {
    pub triads: usize,
    pub seventh_chords: usize,
    pub extended_chords: usize,
    /// Chord names of the counted chords, most common first.
    pub chord_breakdown: Vec<LabelCount>,
}

/// Count chord sizes per part: three pitches make a triad, four a seventh
/// chord, more an extended chord. Slices under three pitches are not chords.
pub(super) fn harmonic_functions(score: &Score, analyzer: &dyn ScoreAnalyzer) -> Result<AdvancedResult, AnalysisError> {
    let key = analyzer.analyze_key(&score.note_events()).key;
    let (mut triads, mut seventh_chords, mut extended_chords) = (0, 0, 0);
    let mut names = Vec::new();

    for part in score.parts() {
        for m in 0..part.measure_count() {
            for slice in chordify_measure(&[part], m) {
                match slice.notes.len() {
                    0..=2 => continue,
                    3 => triads += 1,
                    4 => seventh_chords += 1,
                    _ => extended_chords += 1,
                }
                names.push(Sonority::from_slice(&slice, &key).name.display_or(UNKNOWN_CHORD));
            }
        }
    }

    Ok(AdvancedResult::HarmonicFunctions(HarmonicFunctionsReport {
        triads,
        seventh_chords,
        extended_chords,
        chord_breakdown: count_labels(names),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advanced::tests::make_score;
    use crate::analyzer::HeuristicAnalyzer;
    use pretty_assertions::assert_eq;
    use score_model::{Event, Measure, Pitch};

    fn chords(name: &str, bars: &[&[u8]]) -> Part {
        let measures = bars
            .iter()
            .enumerate()
            .map(|(i, midis)| {
                let pitches = midis.iter().map(|&m| Pitch::from_midi(m)).collect();
                Measure::new(i as u32 + 1, i as f64 * 4.0, 4.0).with_events(vec![Event::chord(0.0, 4.0, pitches)])
            })
            .collect();
        Part::new(name).with_name(name).with_measures(measures)
    }

    fn run_cadences(score: &Score) -> CadenceReport {
        match cadences(score, &HeuristicAnalyzer::default()).unwrap() {
            AdvancedResult::Cadences(report) => report,
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn dominant_to_tonic_bass_is_authentic() {
        let score = make_score(vec![chords("Organ", &[&[43, 59, 62], &[48, 64, 67]])]);
        let report = run_cadences(&score);
        assert_eq!(report.total_cadences, 1);
        assert_eq!(
            report.cadences[0],
            Cadence {
                measure: 2,
                kind: CadenceKind::Authentic,
                strength: 0.95,
                instrument: "Organ".to_string(),
            }
        );
    }

    #[test]
    fn subdominant_to_tonic_bass_is_plagal() {
        let score = make_score(vec![chords("Organ", &[&[48, 64], &[41, 57, 60], &[48, 64, 67]])]);
        let report = run_cadences(&score);
        assert_eq!(report.total_cadences, 1);
        assert_eq!(report.cadences[0].kind, CadenceKind::Plagal);
        assert_eq!(report.cadences[0].strength, 0.80);
        assert_eq!(report.cadences[0].measure, 3);
    }

    #[test]
    fn only_last_eight_measures_are_scanned() {
        // V-I at measures 1-2 falls outside the last eight of ten measures
        let mut bars: Vec<&[u8]> = vec![&[43][..], &[48][..]];
        bars.extend(std::iter::repeat(&[50u8][..]).take(8));
        let score = make_score(vec![chords("Bass", &bars)]);
        assert_eq!(run_cadences(&score).total_cadences, 0);
    }

    #[test]
    fn chord_sizes_are_bucketed() {
        let score = make_score(vec![chords(
            "Piano",
            &[&[48, 52, 55], &[43, 47, 50, 53], &[48, 52, 55, 59, 62], &[48, 55], &[60, 64, 67]],
        )]);
        let report = match harmonic_functions(&score, &HeuristicAnalyzer::default()).unwrap() {
            AdvancedResult::HarmonicFunctions(report) => report,
            other => panic!("unexpected result {other:?}"),
        };
        assert_eq!((report.triads, report.seventh_chords, report.extended_chords), (2, 1, 1));
        assert_eq!(
            report.chord_breakdown[0],
            LabelCount { label: "C major triad".to_string(), count: 2 }
        );
        let total: usize = report.chord_breakdown.iter().map(|c| c.count).sum();
        assert_eq!(total, 4);
    }
}
