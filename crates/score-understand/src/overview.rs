//! Score-level summaries: general information, the piano-roll view and the
//! instrument comparison view.

use score_model::{NoteEvent, Part, Score, TimeSignature};
use serde::{Deserialize, Serialize};

use crate::analyzer::ScoreAnalyzer;
use crate::types::KeyDetection;

/// Name used in the piano roll for parts without one.
pub const PIANO_ROLL_FALLBACK_NAME: &str = "Instrument";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentNoteCount {
    pub instrument: String,
    /// Note and chord events; a chord counts once.
    pub notes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralInfo {
    pub total_instruments: usize,
    pub instrument_names: Vec<String>,
    pub overall_key: String,
    pub total_measures: usize,
    /// Distinct time signatures as `n/d`, first-seen order.
    pub time_signatures: Vec<String>,
    pub first_time_signature: String,
    pub measure_duration_beats: u8,
    pub notes_per_instrument: Vec<InstrumentNoteCount>,
}

/// What a client sees right after loading a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOverview {
    pub title: String,
    pub key: KeyDetection,
    pub general_info: GeneralInfo,
}

/// Summarize a score; the overall key is estimated from every part.
pub fn overview(score: &Score, analyzer: &dyn ScoreAnalyzer) -> ScoreOverview {
    let key = analyzer.analyze_key(&score.note_events());
    let first = score.first_time_signature().unwrap_or_default();

    let notes_per_instrument = score
        .parts()
        .iter()
        .enumerate()
        .map(|(index, part)| InstrumentNoteCount {
            instrument: part.display_name(index),
            notes: part.sounding_event_count(),
        })
        .collect();

    ScoreOverview {
        title: score.title().to_string(),
        key,
        general_info: GeneralInfo {
            total_instruments: score.part_count(),
            instrument_names: score.part_names(),
            overall_key: key.label(),
            total_measures: score.measure_count(),
            time_signatures: score
                .time_signatures()
                .iter()
                .map(TimeSignature::ratio_string)
                .collect(),
            first_time_signature: first.ratio_string(),
            measure_duration_beats: first.numerator,
            notes_per_instrument,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PianoRollNote {
    pub pitch: u8,
    pub name: String,
    pub start: f64,
    pub duration: f64,
    pub velocity: u8,
}

impl From<&NoteEvent> for PianoRollNote {
    fn from(note: &NoteEvent) -> Self {
        Self {
            pitch: note.midi,
            name: note.pitch.name_with_octave(),
            start: note.offset,
            duration: note.duration,
            velocity: note.velocity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PianoRollInstrument {
    pub name: String,
    pub notes: Vec<PianoRollNote>,
}

impl PianoRollInstrument {
    fn from_part(part: &Part) -> Self {
        Self {
            name: part
                .label()
                .unwrap_or_else(|| PIANO_ROLL_FALLBACK_NAME.to_string()),
            notes: part.note_events().iter().map(PianoRollNote::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PianoRoll {
    pub instruments: Vec<PianoRollInstrument>,
}

/// Every part's notes in absolute time, with repeats played out.
pub fn piano_roll(score: &Score) -> PianoRoll {
    let expanded = score.expand_repeats();
    PianoRoll {
        instruments: expanded
            .parts()
            .iter()
            .map(PianoRollInstrument::from_part)
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonNote {
    pub pitch: u8,
    pub start_time: f64,
    pub duration: f64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonInstrument {
    pub index: usize,
    pub name: String,
    pub notes: Vec<ComparisonNote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub instruments: Vec<ComparisonInstrument>,
    pub measure_duration_beats: u8,
}

/// Notes of the chosen parts side by side. Indices past the last part are
/// skipped.
pub fn compare(score: &Score, instrument_indices: &[usize]) -> Comparison {
    let expanded = score.expand_repeats();
    let instruments = instrument_indices
        .iter()
        .filter_map(|&index| {
            let part = expanded.part(index)?;
            Some(ComparisonInstrument {
                index,
                name: part
                    .label()
                    .unwrap_or_else(|| format!("Instrument {}", index + 1)),
                notes: part
                    .note_events()
                    .iter()
                    .map(|note| ComparisonNote {
                        pitch: note.midi,
                        start_time: note.offset,
                        duration: note.duration,
                        name: note.pitch.name_with_octave(),
                    })
                    .collect(),
            })
        })
        .collect();

    Comparison {
        instruments,
        measure_duration_beats: expanded
            .first_time_signature()
            .map(|ts| ts.beat_count())
            .unwrap_or(4),
    }
}
