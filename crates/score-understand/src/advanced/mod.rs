//! Standalone analysis passes, one per [`AnalysisType`].
//!
//! The dispatcher runs exactly one pass per call. A pass that cannot work
//! with the material it was given reports through [`AdvancedReport::error`]
//! instead of failing the request.

pub mod harmony;
pub mod melody;
pub mod structure;

use std::fmt;
use std::str::FromStr;

use score_model::Score;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analyzer::ScoreAnalyzer;
use crate::error::AnalysisError;
use crate::symmetry::SymmetryResult;

pub use harmony::{Cadence, CadenceKind, CadenceReport, HarmonicFunctionsReport};
pub use melody::{
    ChromaticPassage, ChromaticismReport, DissonanceReport, DissonantInterval, PassageDirection,
    VoiceLeading, VoiceLeadingReport,
};
pub use structure::{
    LocalKey, MeasureTexture, Modulation, ModulationReport, Phrase, PhraseReport, StatisticsReport,
    TextureDensity, TextureReport,
};

/// Measures per analysis window and per heuristic phrase.
pub const WINDOW_MEASURES: usize = 4;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of `part` in `whole`, two decimals; 0 for an empty whole.
fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round2(100.0 * part as f64 / whole as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Cadences,
    Modulation,
    VoiceLeading,
    Dissonance,
    HarmonicFunctions,
    PhraseStructure,
    TextureAdvanced,
    ChromaticAnalysis,
    Symmetry,
    Statistics,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 10] = [
        AnalysisType::Cadences,
        AnalysisType::Modulation,
        AnalysisType::VoiceLeading,
        AnalysisType::Dissonance,
        AnalysisType::HarmonicFunctions,
        AnalysisType::PhraseStructure,
        AnalysisType::TextureAdvanced,
        AnalysisType::ChromaticAnalysis,
        AnalysisType::Symmetry,
        AnalysisType::Statistics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Cadences => "cadences",
            AnalysisType::Modulation => "modulation",
            AnalysisType::VoiceLeading => "voice_leading",
            AnalysisType::Dissonance => "dissonance",
            AnalysisType::HarmonicFunctions => "harmonic_functions",
            AnalysisType::PhraseStructure => "phrase_structure",
            AnalysisType::TextureAdvanced => "texture_advanced",
            AnalysisType::ChromaticAnalysis => "chromatic_analysis",
            AnalysisType::Symmetry => "symmetry",
            AnalysisType::Statistics => "statistics",
        }
    }

    fn handler(self) -> Handler {
        match self {
            AnalysisType::Cadences => harmony::cadences,
            AnalysisType::Modulation => structure::modulation,
            AnalysisType::VoiceLeading => melody::voice_leading,
            AnalysisType::Dissonance => melody::dissonance,
            AnalysisType::HarmonicFunctions => harmony::harmonic_functions,
            AnalysisType::PhraseStructure => structure::phrase_structure,
            AnalysisType::TextureAdvanced => structure::texture,
            AnalysisType::ChromaticAnalysis => melody::chromaticism,
            AnalysisType::Symmetry => structure::symmetry,
            AnalysisType::Statistics => structure::statistics,
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let found = match normalized.as_str() {
            "texture" => Some(AnalysisType::TextureAdvanced),
            "chromatic" | "chromaticism" => Some(AnalysisType::ChromaticAnalysis),
            "phrases" => Some(AnalysisType::PhraseStructure),
            other => AnalysisType::ALL.into_iter().find(|t| t.as_str() == other),
        };
        found.ok_or_else(|| AnalysisError::UnsupportedAnalysis(s.to_string()))
    }
}

type Handler = fn(&Score, &dyn ScoreAnalyzer) -> Result<AdvancedResult, AnalysisError>;

/// Typed payload of one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancedResult {
    Cadences(CadenceReport),
    Modulation(ModulationReport),
    VoiceLeading(VoiceLeadingReport),
    Dissonance(DissonanceReport),
    HarmonicFunctions(HarmonicFunctionsReport),
    PhraseStructure(PhraseReport),
    Texture(TextureReport),
    Chromaticism(ChromaticismReport),
    Symmetry(SymmetryResult),
    Statistics(StatisticsReport),
}

impl AdvancedResult {
    pub fn summary(&self) -> String {
        match self {
            AdvancedResult::Cadences(r) => format!("Found {} cadences in score", r.total_cadences),
            AdvancedResult::Modulation(r) => format!("Found {} key modulations", r.total_modulations),
            AdvancedResult::VoiceLeading(r) => format!("Analyzed {} voices", r.voices.len()),
            AdvancedResult::Dissonance(r) => {
                format!("{}% dissonance detected", r.dissonance_percentage)
            }
            AdvancedResult::HarmonicFunctions(r) => format!(
                "Triads: {}, Sevenths: {}, Extended: {}",
                r.triads, r.seventh_chords, r.extended_chords
            ),
            AdvancedResult::PhraseStructure(r) => format!("Identified {} phrases", r.total_phrases),
            AdvancedResult::Texture(r) => {
                format!("Average density: {} notes/measure", r.average_note_density)
            }
            AdvancedResult::Chromaticism(r) => format!("{}% diatonic notes", r.diatonic_percentage),
            AdvancedResult::Symmetry(r) => r.summary.clone(),
            AdvancedResult::Statistics(r) => format!(
                "Total: {} notes, {} unique pitches, {} measures",
                r.total_notes, r.unique_pitches, r.total_measures
            ),
        }
    }
}

/// Outcome of one advanced pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedReport {
    pub analysis: AnalysisType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AdvancedResult>,
}

impl AdvancedReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Run one advanced pass over `score`.
pub fn run_analysis(score: &Score, analysis: AnalysisType, analyzer: &dyn ScoreAnalyzer) -> AdvancedReport {
    match (analysis.handler())(score, analyzer) {
        Ok(result) => {
            let summary = result.summary();
            debug!(analysis = %analysis, %summary, "advanced pass complete");
            AdvancedReport {
                analysis,
                summary: Some(summary),
                error: None,
                result: Some(result),
            }
        }
        Err(err) => {
            debug!(analysis = %analysis, error = %err, "advanced pass failed");
            AdvancedReport {
                analysis,
                summary: None,
                error: Some(format!("{analysis} analysis failed: {err}")),
                result: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::HeuristicAnalyzer;
    use score_model::{Event, Measure, Part, Pitch};

    pub(crate) fn make_score(parts: Vec<Part>) -> Score {
        Score::new("Test", parts).unwrap()
    }

    pub(crate) fn line(name: &str, bars: &[&[u8]]) -> Part {
        let measures = bars
            .iter()
            .enumerate()
            .map(|(i, midis)| {
                let step = 4.0 / midis.len().max(1) as f64;
                let events = midis
                    .iter()
                    .enumerate()
                    .map(|(j, &m)| Event::note(j as f64 * step, step, Pitch::from_midi(m)))
                    .collect();
                Measure::new(i as u32 + 1, i as f64 * 4.0, 4.0).with_events(events)
            })
            .collect();
        Part::new(name).with_name(name).with_measures(measures)
    }

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("voice_leading".parse::<AnalysisType>().unwrap(), AnalysisType::VoiceLeading);
        assert_eq!("voice-leading".parse::<AnalysisType>().unwrap(), AnalysisType::VoiceLeading);
        assert_eq!("texture".parse::<AnalysisType>().unwrap(), AnalysisType::TextureAdvanced);
        assert_eq!("chromatic".parse::<AnalysisType>().unwrap(), AnalysisType::ChromaticAnalysis);
        for analysis in AnalysisType::ALL {
            assert_eq!(analysis.as_str().parse::<AnalysisType>().unwrap(), analysis);
        }
    }

    #[test]
    fn unknown_type_is_unsupported() {
        let err = "orchestration".parse::<AnalysisType>().unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedAnalysis(ref name) if name == "orchestration"));
    }

    #[test]
    fn every_type_produces_a_report() {
        let score = make_score(vec![line("Flute", &[&[60, 62, 64, 65], &[67, 65, 64, 62], &[60]])]);
        let analyzer = HeuristicAnalyzer::default();
        for analysis in AnalysisType::ALL {
            let report = run_analysis(&score, analysis, &analyzer);
            assert_eq!(report.analysis, analysis);
            assert!(report.is_ok(), "{analysis} failed: {:?}", report.error);
            assert!(report.summary.is_some());
        }
    }

    #[test]
    fn failing_pass_sets_error() {
        let score = make_score(vec![Part::new("Empty")]);
        let report = run_analysis(&score, AnalysisType::Modulation, &HeuristicAnalyzer::default());
        assert!(!report.is_ok());
        assert!(report.result.is_none());
        assert!(report.error.unwrap().starts_with("modulation analysis failed"));
    }

    #[test]
    fn percentage_rounds_and_handles_zero() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(0, 0), 0.0);
    }
}
