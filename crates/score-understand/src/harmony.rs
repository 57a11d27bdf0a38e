//! Harmonic reduction: chordify selected parts measure by measure, collapse
//! repeated sonorities, then name each chord and its function in a key.

use score_model::{pitch_class_name, NoteEvent, Part, Score};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chord_templates::{identify_chord, ChordIdentity};
use crate::chordify::{chordify_measure, Slice};
use crate::error::{AnalysisError, Derivation, DerivationFailure};
use crate::roman::roman_numeral;
use crate::types::{ChordQuality, Key, KeyDetection};

pub const UNKNOWN_CHORD: &str = "Unknown chord";
pub const UNKNOWN_FUNCTION: &str = "Unknown";
pub const NO_CHORDS: &str = "No chords";

/// A deduplicated chord occurrence within a measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sonority {
    /// Offset from the measure start, in quarter notes.
    pub onset: f64,
    pub pitch_classes: Vec<u8>,
    pub bass: u8,
    pub midi: Vec<u8>,
    pub root: Option<u8>,
    pub quality: Option<ChordQuality>,
    pub name: Derivation<String>,
    pub function: Derivation<String>,
}

impl Sonority {
    /// Name and classify a chordified slice against `key`.
    pub fn from_slice(slice: &Slice, key: &Key) -> Self {
        let pitch_classes = slice.pitch_classes();
        let bass = slice.bass_pitch_class().unwrap_or_default();
        let identity = identify_chord(&pitch_classes, bass);

        let (name, function) = match (&identity, pitch_classes.len()) {
            (_, 0) => (
                Err(DerivationFailure::EmptySonority),
                Err(DerivationFailure::EmptySonority),
            ),
            (_, 1) => (
                Ok(format!("{} note", pitch_class_name(bass, key.uses_flats()))),
                Err(DerivationFailure::NoRomanNumeral),
            ),
            (Ok(identity), _) => (
                Ok(chord_name(identity, key)),
                roman_numeral(identity, bass, key),
            ),
            (Err(reason), _) => (Err(*reason), Err(*reason)),
        };

        Self {
            onset: slice.onset,
            pitch_classes,
            bass,
            midi: slice.midi_pitches(),
            root: identity.as_ref().ok().map(|id| id.root),
            quality: identity.as_ref().ok().map(|id| id.quality),
            name: name.into(),
            function: function.into(),
        }
    }
}

/// `"C major triad"`, spelled for the key.
pub fn chord_name(identity: &ChordIdentity, key: &Key) -> String {
    format!(
        "{} {}",
        pitch_class_name(identity.root, key.uses_flats()),
        identity.quality.common_name()
    )
}

/// Chords and functions of one measure, positionally aligned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureHarmony {
    pub measure: u32,
    pub chords: Vec<String>,
    pub tonal_functions: Vec<String>,
    pub sonorities: Vec<Sonority>,
}

impl MeasureHarmony {
    fn from_sonorities(measure: u32, sonorities: Vec<Sonority>) -> Self {
        if sonorities.is_empty() {
            return Self {
                measure,
                chords: vec![NO_CHORDS.to_string()],
                tonal_functions: vec![UNKNOWN_FUNCTION.to_string()],
                sonorities,
            };
        }
        Self {
            measure,
            chords: sonorities
                .iter()
                .map(|s| s.name.display_or(UNKNOWN_CHORD))
                .collect(),
            tonal_functions: sonorities
                .iter()
                .map(|s| s.function.display_or(UNKNOWN_FUNCTION))
                .collect(),
            sonorities,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonicReduction {
    pub part_indices: Vec<usize>,
    pub selected_instruments: Vec<String>,
    pub key: KeyDetection,
    /// Key label, e.g. `G major`.
    pub reduction_key: String,
    pub chord_report: Vec<MeasureHarmony>,
}

/// Validate a part selection, collapsing duplicates to first occurrence.
pub fn select_parts(score: &Score, part_indices: &[usize]) -> Result<Vec<usize>, AnalysisError> {
    if part_indices.is_empty() {
        return Err(AnalysisError::EmptySelection);
    }
    let mut selected = Vec::with_capacity(part_indices.len());
    for &index in part_indices {
        if index >= score.part_count() {
            return Err(AnalysisError::IndexOutOfRange {
                index,
                part_count: score.part_count(),
            });
        }
        if !selected.contains(&index) {
            selected.push(index);
        }
    }
    Ok(selected)
}

/// Keep a sonority only when its pitch-class set differs from the last kept one.
///
/// The comparison is on the exact pitch-class mask, so a transposed sonority
/// (C major followed by D major) is kept as a new entry.
pub fn dedup_slices(slices: Vec<Slice>) -> Vec<Slice> {
    let mut kept: Vec<Slice> = Vec::with_capacity(slices.len());
    for slice in slices {
        let differs = kept
            .last()
            .map_or(true, |last| last.pitch_class_mask() != slice.pitch_class_mask());
        if differs {
            kept.push(slice);
        }
    }
    kept
}

/// Notes of the selected parts, the material a reduction key is estimated from.
pub fn selection_notes(score: &Score, selected: &[usize]) -> Vec<NoteEvent> {
    selected
        .iter()
        .filter_map(|&i| score.part(i))
        .flat_map(|p| p.note_events())
        .collect()
}

/// Run the harmonic reduction over the selected parts in `key`.
pub fn reduce(score: &Score, part_indices: &[usize], key: KeyDetection) -> Result<HarmonicReduction, AnalysisError> {
    let selected = select_parts(score, part_indices)?;
    let parts: Vec<&Part> = selected.iter().filter_map(|&i| score.part(i)).collect();

    let measure_count = parts.first().map(|p| p.measure_count()).unwrap_or(0);
    let chord_report: Vec<MeasureHarmony> = (0..measure_count)
        .map(|m| {
            let sonorities = dedup_slices(chordify_measure(&parts, m))
                .iter()
                .map(|slice| Sonority::from_slice(slice, &key.key))
                .collect();
            MeasureHarmony::from_sonorities(m as u32 + 1, sonorities)
        })
        .collect();

    debug!(
        parts = ?selected,
        key = %key.key,
        measures = chord_report.len(),
        "harmonic reduction complete"
    );

    Ok(HarmonicReduction {
        selected_instruments: selected
            .iter()
            .map(|&i| score.parts()[i].display_name(i))
            .collect(),
        part_indices: selected,
        reduction_key: key.label(),
        key,
        chord_report,
    })
}
