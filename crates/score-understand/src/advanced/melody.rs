use score_model::{NoteEvent, Score};
use serde::{Deserialize, Serialize};

use super::{percentage, round2, AdvancedResult};
use crate::analyzer::ScoreAnalyzer;
use crate::error::AnalysisError;
use crate::melodic::{count_labels, Interval, LabelCount};
use crate::types::Key;

/// Interval classes (semitones mod 12) treated as dissonant.
const DISSONANT_CLASSES: [i32; 5] = [1, 2, 6, 10, 11];

/// Moves larger than this many semitones are leaps.
const STEP_LIMIT: i32 = 2;

/// Semitone moves needed in one direction to form a chromatic passage.
const MIN_PASSAGE_MOVES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceLeading {
    pub instrument: String,
    pub total_notes: usize,
    pub leaps: usize,
    /// Mean leap size in semitones, 0 without leaps.
    pub average_leap: f64,
    pub stepwise_motion: usize,
    pub lowest: u8,
    pub highest: u8,
    /// `"60 - 72 MIDI"`.
    pub pitch_range: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceLeadingReport {
    pub voices: Vec<VoiceLeading>,
}

fn semitone_moves(notes: &[NoteEvent]) -> impl Iterator<Item = i32> + '_ {
    notes.windows(2).map(|pair| pair[1].midi as i32 - pair[0].midi as i32)
}

/// Leap and step counts for every part with at least two single notes.
pub(super) fn voice_leading(score: &Score, _analyzer: &dyn ScoreAnalyzer) -> Result<AdvancedResult, AnalysisError> {
    let mut voices = Vec::new();
    for (index, part) in score.parts().iter().enumerate() {
        let notes = part.melodic_notes();
        if notes.len() < 2 {
            continue;
        }

        let (leaps, steps): (Vec<i32>, Vec<i32>) = semitone_moves(&notes)
            .map(i32::abs)
            .partition(|&size| size > STEP_LIMIT);
        let average_leap = if leaps.is_empty() {
            0.0
        } else {
            round2(leaps.iter().sum::<i32>() as f64 / leaps.len() as f64)
        };
        let lowest = notes.iter().map(|n| n.midi).min().unwrap_or_default();
        let highest = notes.iter().map(|n| n.midi).max().unwrap_or_default();

        voices.push(VoiceLeading {
            instrument: part.display_name(index),
            total_notes: notes.len(),
            leaps: leaps.len(),
            average_leap,
            stepwise_motion: steps.len(),
            lowest,
            highest,
            pitch_range: format!("{lowest} - {highest} MIDI"),
        });
    }
    Ok(AdvancedResult::VoiceLeading(VoiceLeadingReport { voices }))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DissonantInterval {
    pub instrument: String,
    pub measure: u32,
    pub from: String,
    pub to: String,
    pub interval: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DissonanceReport {
    pub dissonant_intervals: Vec<DissonantInterval>,
    /// Consonant interval names, most common first.
    pub consonant_intervals: Vec<LabelCount>,
    pub dissonance_percentage: f64,
    pub total_intervals_analyzed: usize,
}

/// Classify consecutive single-note intervals as dissonant or consonant.
pub(super) fn dissonance(score: &Score, _analyzer: &dyn ScoreAnalyzer) -> Result<AdvancedResult, AnalysisError> {
    let mut dissonant_intervals = Vec::new();
    let mut consonant = Vec::new();
    let mut total = 0;

    for (index, part) in score.parts().iter().enumerate() {
        let notes = part.melodic_notes();
        for pair in notes.windows(2) {
            let (from, to) = (&pair[0], &pair[1]);
            let interval = Interval::between(&from.pitch, &to.pitch);
            total += 1;
            if DISSONANT_CLASSES.contains(&interval.semitones.rem_euclid(12)) {
                dissonant_intervals.push(DissonantInterval {
                    instrument: part.display_name(index),
                    measure: to.measure,
                    from: from.pitch.name_with_octave(),
                    to: to.pitch.name_with_octave(),
                    interval: interval.name,
                });
            } else {
                consonant.push(interval.name);
            }
        }
    }

    Ok(AdvancedResult::Dissonance(DissonanceReport {
        dissonance_percentage: percentage(dissonant_intervals.len(), total),
        dissonant_intervals,
        consonant_intervals: count_labels(consonant),
        total_intervals_analyzed: total,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassageDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromaticPassage {
    pub instrument: String,
    pub direction: PassageDirection,
    pub start_measure: u32,
    pub end_measure: u32,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromaticismReport {
    /// Key whose scale defined the diatonic notes.
    pub key: String,
    pub total_notes: usize,
    pub chromatic_notes: usize,
    pub diatonic_percentage: f64,
    /// Accidentals of the chromatic notes, most common first.
    pub accidentals: Vec<LabelCount>,
    pub chromatic_passages: Vec<ChromaticPassage>,
}

/// Runs of at least three same-direction semitone moves.
fn chromatic_passages(instrument: &str, notes: &[NoteEvent]) -> Vec<ChromaticPassage> {
    let moves: Vec<i32> = semitone_moves(notes).collect();
    let mut passages = Vec::new();
    let mut start = 0;
    while start < moves.len() {
        let direction = moves[start];
        if direction.abs() != 1 {
            start += 1;
            continue;
        }
        let run = moves[start..].iter().take_while(|&&m| m == direction).count();
        if run >= MIN_PASSAGE_MOVES {
            let span = &notes[start..=start + run];
            passages.push(ChromaticPassage {
                instrument: instrument.to_string(),
                direction: if direction > 0 {
                    PassageDirection::Ascending
                } else {
                    PassageDirection::Descending
                },
                start_measure: span[0].measure,
                end_measure: span[span.len() - 1].measure,
                notes: span.iter().map(|n| n.pitch.name_with_octave()).collect(),
            });
        }
        start += run;
    }
    passages
}

/// Measure single notes against the estimated key's scale; an indeterminate
/// key falls back to the C major scale.
pub(super) fn chromaticism(score: &Score, analyzer: &dyn ScoreAnalyzer) -> Result<AdvancedResult, AnalysisError> {
    let detection = analyzer.analyze_key(&score.note_events());
    let key = if detection.confidence > 0.0 {
        detection.key
    } else {
        Key::default()
    };
    let scale = key.scale_pitch_classes();

    let mut total_notes = 0;
    let mut accidentals = Vec::new();
    let mut passages = Vec::new();
    for (index, part) in score.parts().iter().enumerate() {
        let notes = part.melodic_notes();
        total_notes += notes.len();
        accidentals.extend(
            notes
                .iter()
                .filter(|n| !scale.contains(&n.pitch_class))
                .map(|n| n.pitch.accidental().name()),
        );
        passages.extend(chromatic_passages(&part.display_name(index), &notes));
    }

    let chromatic_notes = accidentals.len();
    Ok(AdvancedResult::Chromaticism(ChromaticismReport {
        key: key.label(),
        total_notes,
        chromatic_notes,
        diatonic_percentage: percentage(total_notes - chromatic_notes, total_notes),
        accidentals: count_labels(accidentals),
        chromatic_passages: passages,
    }))
}
