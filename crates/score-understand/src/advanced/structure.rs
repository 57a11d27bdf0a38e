use score_model::{NoteEvent, Score};
use serde::{Deserialize, Serialize};

use super::{round2, AdvancedResult, WINDOW_MEASURES};
use crate::analyzer::ScoreAnalyzer;
use crate::error::AnalysisError;
use crate::melodic::{count_labels, LabelCount};
use crate::symmetry::SymmetryMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalKey {
    pub start_measure: u32,
    pub end_measure: u32,
    pub key: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modulation {
    pub from_measure: u32,
    pub to_measure: u32,
    pub from_key: String,
    pub to_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulationReport {
    pub local_keys: Vec<LocalKey>,
    pub modulations: Vec<Modulation>,
    pub total_modulations: usize,
}

fn first_part_measures(score: &Score) -> Result<usize, AnalysisError> {
    match score.measure_count() {
        0 => Err(AnalysisError::InsufficientData(
            "first part has no measures".to_string(),
        )),
        count => Ok(count),
    }
}

/// Local keys over consecutive four-measure windows of the first part.
pub(super) fn modulation(score: &Score, analyzer: &dyn ScoreAnalyzer) -> Result<AdvancedResult, AnalysisError> {
    let count = first_part_measures(score)?;
    let part = &score.parts()[0];

    let mut local_keys: Vec<LocalKey> = Vec::new();
    for start in (0..count).step_by(WINDOW_MEASURES) {
        let end = (start + WINDOW_MEASURES).min(count);
        let notes: Vec<NoteEvent> = part.measures[start..end]
            .iter()
            .flat_map(|m| m.note_events())
            .collect();
        if notes.is_empty() {
            continue;
        }
        let detection = analyzer.analyze_key(&notes);
        local_keys.push(LocalKey {
            start_measure: start as u32 + 1,
            end_measure: end as u32,
            key: detection.label(),
            confidence: detection.confidence,
        });
    }

    let modulations: Vec<Modulation> = local_keys
        .windows(2)
        .filter(|pair| pair[0].key != pair[1].key)
        .map(|pair| Modulation {
            from_measure: pair[0].start_measure,
            to_measure: pair[1].start_measure,
            from_key: pair[0].key.clone(),
            to_key: pair[1].key.clone(),
        })
        .collect();

    Ok(AdvancedResult::Modulation(ModulationReport {
        total_modulations: modulations.len(),
        local_keys,
        modulations,
    }))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub instrument: String,
    pub start_measure: u32,
    pub end_measure: u32,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseReport {
    pub phrases: Vec<Phrase>,
    pub total_phrases: usize,
}

/// Four-measure phrases per part; a shorter phrase closes the part.
pub(super) fn phrase_structure(score: &Score, _analyzer: &dyn ScoreAnalyzer) -> Result<AdvancedResult, AnalysisError> {
    let mut phrases = Vec::new();
    for (index, part) in score.parts().iter().enumerate() {
        let count = part.measure_count();
        for start in (0..count).step_by(WINDOW_MEASURES) {
            let end = (start + WINDOW_MEASURES).min(count);
            phrases.push(Phrase {
                instrument: part.display_name(index),
                start_measure: start as u32 + 1,
                end_measure: end as u32,
                length: end - start,
            });
        }
    }
    Ok(AdvancedResult::PhraseStructure(PhraseReport {
        total_phrases: phrases.len(),
        phrases,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureDensity {
    Sparse,
    Moderate,
    Dense,
}

impl TextureDensity {
    pub fn classify(event_count: usize) -> Self {
        match event_count {
            0..=4 => TextureDensity::Sparse,
            5..=9 => TextureDensity::Moderate,
            _ => TextureDensity::Dense,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureTexture {
    pub measure: u32,
    /// Note and chord events; a chord counts once.
    pub note_count: usize,
    pub density: TextureDensity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureReport {
    pub measures: Vec<MeasureTexture>,
    pub average_note_density: f64,
}

pub(super) fn texture(score: &Score, _analyzer: &dyn ScoreAnalyzer) -> Result<AdvancedResult, AnalysisError> {
    let count = first_part_measures(score)?;
    let measures: Vec<MeasureTexture> = score.parts()[0]
        .measures
        .iter()
        .enumerate()
        .map(|(i, measure)| {
            let note_count = measure.sounding_event_count();
            MeasureTexture {
                measure: i as u32 + 1,
                note_count,
                density: TextureDensity::classify(note_count),
            }
        })
        .collect();
    let total: usize = measures.iter().map(|m| m.note_count).sum();

    Ok(AdvancedResult::Texture(TextureReport {
        average_note_density: round2(total as f64 / count as f64),
        measures,
    }))
}

/// Tonal symmetry of the first part, mirrored about the score's key.
pub(super) fn symmetry(score: &Score, analyzer: &dyn ScoreAnalyzer) -> Result<AdvancedResult, AnalysisError> {
    let tonic = analyzer.analyze_key(&score.note_events()).key.tonic;
    let part = &score.parts()[0];
    Ok(AdvancedResult::Symmetry(analyzer.analyze_symmetry(
        &part.pitch_sequence(),
        &part.display_name(0),
        SymmetryMode::Tonal,
        tonic,
    )))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub total_notes: usize,
    pub unique_pitches: usize,
    /// Mean single-note duration in quarter notes.
    pub average_duration: f64,
    pub total_measures: usize,
    pub parts_count: usize,
    pub average_notes_per_measure: f64,
    /// Pitch names, most common first.
    pub pitch_distribution: Vec<LabelCount>,
}

/// Aggregate single-note statistics across every part.
pub(super) fn statistics(score: &Score, _analyzer: &dyn ScoreAnalyzer) -> Result<AdvancedResult, AnalysisError> {
    let notes: Vec<NoteEvent> = score.parts().iter().flat_map(|p| p.melodic_notes()).collect();
    let total_notes = notes.len();
    let total_measures = score.measure_count();

    let mut pitch_classes: Vec<u8> = notes.iter().map(|n| n.pitch_class).collect();
    pitch_classes.sort_unstable();
    pitch_classes.dedup();

    let (average_duration, average_notes_per_measure) = if total_notes == 0 {
        (0.0, 0.0)
    } else {
        let duration: f64 = notes.iter().map(|n| n.duration).sum();
        let per_measure = if total_measures > 0 {
            round2(total_notes as f64 / total_measures as f64)
        } else {
            0.0
        };
        (round2(duration / total_notes as f64), per_measure)
    };

    Ok(AdvancedResult::Statistics(StatisticsReport {
        total_notes,
        unique_pitches: pitch_classes.len(),
        average_duration,
        total_measures,
        parts_count: score.part_count(),
        average_notes_per_measure,
        pitch_distribution: count_labels(notes.iter().map(|n| n.pitch.name())),
    }))
}
