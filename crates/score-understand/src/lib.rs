//! Score understanding for scorelens.
//!
//! Turns a parsed [`score_model::Score`] into typed analysis records: overall
//! key, per-part melodic features, a measure-by-measure harmonic reduction,
//! retrograde/inversion symmetry and a suite of single-purpose advanced
//! passes. Rendering (JSON, the text report, narrative payloads) happens at
//! the boundary.

pub mod advanced;
pub mod analyzer;
pub mod chord_templates;
pub mod chordify;
pub mod error;
pub mod harmony;
pub mod key;
pub mod melodic;
pub mod narrative;
pub mod overview;
pub mod report;
pub mod roman;
pub mod symmetry;
pub mod types;

pub use advanced::{run_analysis, AdvancedReport, AdvancedResult, AnalysisType};
pub use analyzer::{HeuristicAnalyzer, ScoreAnalyzer};
pub use error::{AnalysisError, Derivation, DerivationFailure};
pub use harmony::{HarmonicReduction, MeasureHarmony, Sonority};
pub use melodic::{MelodicOptions, MelodicRecord};
pub use narrative::{AgentMode, CompletionSettings, NarrativeError, NarrativeRequest, TextCompletion};
pub use overview::{Comparison, GeneralInfo, PianoRoll, ScoreOverview};
pub use report::{render_report, report_file_name, Report};
pub use symmetry::{SymmetryMode, SymmetryResult, SymmetryStatus};
pub use types::{ChordQuality, Key, KeyDetection, KeyMode, KeyProfile};

use std::sync::Arc;

use score_model::Score;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Engine-wide settings, fixed for the engine's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    pub key_profile: KeyProfile,
    /// Frame used when a symmetry request does not name one.
    pub symmetry_mode: SymmetryMode,
}

/// What to compute in a full analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Parts fed to the harmonic reduction; empty skips it.
    pub harmonic_parts: Vec<usize>,
    pub melodic: MelodicOptions,
}

/// Full analysis of one score, the input of the text report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreAnalysis {
    pub title: String,
    pub general_info: GeneralInfo,
    pub melodic_analysis: Vec<MelodicRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harmonic_analysis: Option<HarmonicReduction>,
}

/// Stateless façade over a [`ScoreAnalyzer`].
///
/// Every call works on the score it is handed; nothing is cached between
/// requests.
pub struct ScoreUnderstandingEngine {
    analyzer: Arc<dyn ScoreAnalyzer>,
    options: EngineOptions,
}

impl ScoreUnderstandingEngine {
    /// Create with the heuristic analyzer for the configured key profile.
    pub fn new(options: EngineOptions) -> Self {
        Self {
            analyzer: Arc::new(HeuristicAnalyzer::new(options.key_profile)),
            options,
        }
    }

    /// Create with a custom analyzer (for testing or another backend).
    pub fn with_analyzer(analyzer: Arc<dyn ScoreAnalyzer>, options: EngineOptions) -> Self {
        Self { analyzer, options }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn overview(&self, score: &Score) -> ScoreOverview {
        info!(title = score.title(), parts = score.part_count(), "score overview");
        overview::overview(score, self.analyzer.as_ref())
    }

    /// General info, melodic features of every part and, when parts are
    /// selected, the harmonic reduction.
    pub fn analyze(&self, score: &Score, request: &AnalysisRequest) -> Result<ScoreAnalysis, AnalysisError> {
        info!(
            title = score.title(),
            harmonic_parts = ?request.harmonic_parts,
            melodic = ?request.melodic,
            "analyzing score"
        );

        let summary = overview::overview(score, self.analyzer.as_ref());
        let melodic_analysis = score
            .parts()
            .iter()
            .enumerate()
            .map(|(index, part)| self.analyzer.analyze_melody(part, index, request.melodic))
            .collect();
        let harmonic_analysis = if request.harmonic_parts.is_empty() {
            None
        } else {
            Some(self.analyzer.reduce_harmony(score, &request.harmonic_parts, None)?)
        };

        Ok(ScoreAnalysis {
            title: summary.title,
            general_info: summary.general_info,
            melodic_analysis,
            harmonic_analysis,
        })
    }

    /// Harmonic reduction of the selected parts, optionally against a fixed key.
    pub fn harmonic_reduction(
        &self,
        score: &Score,
        part_indices: &[usize],
        key: Option<Key>,
    ) -> Result<HarmonicReduction, AnalysisError> {
        info!(parts = ?part_indices, key = ?key.map(|k| k.label()), "harmonic reduction");
        self.analyzer.reduce_harmony(score, part_indices, key)
    }

    /// Symmetry of one part. The mode defaults to the configured one and the
    /// tonal axis to the estimated key of the whole score.
    pub fn symmetry(
        &self,
        score: &Score,
        part_index: usize,
        mode: Option<SymmetryMode>,
        tonic: Option<u8>,
    ) -> Result<SymmetryResult, AnalysisError> {
        let part = score.part(part_index).ok_or(AnalysisError::IndexOutOfRange {
            index: part_index,
            part_count: score.part_count(),
        })?;
        let mode = mode.unwrap_or(self.options.symmetry_mode);
        let tonic = match tonic {
            Some(pc) => pc % 12,
            None => self.analyzer.analyze_key(&score.note_events()).key.tonic,
        };
        info!(part = part_index, %mode, tonic, "symmetry analysis");

        Ok(self.analyzer.analyze_symmetry(
            &part.pitch_sequence(),
            &part.display_name(part_index),
            mode,
            tonic,
        ))
    }

    pub fn advanced(&self, score: &Score, analysis: AnalysisType) -> AdvancedReport {
        info!(%analysis, "advanced analysis");
        run_analysis(score, analysis, self.analyzer.as_ref())
    }

    pub fn piano_roll(&self, score: &Score) -> PianoRoll {
        info!(title = score.title(), "piano roll");
        overview::piano_roll(score)
    }

    pub fn compare(&self, score: &Score, instrument_indices: &[usize]) -> Comparison {
        info!(instruments = ?instrument_indices, "instrument comparison");
        overview::compare(score, instrument_indices)
    }

    /// Assemble what a [`TextCompletion`] backend needs to narrate the score.
    pub fn narrative_request(
        &self,
        score: &Score,
        prompt: &str,
        mode: AgentMode,
    ) -> Result<NarrativeRequest, NarrativeError> {
        info!(%mode, prompt_len = prompt.len(), "narrative request");
        NarrativeRequest::new(overview::piano_roll(score), prompt, mode)
    }
}

impl Default for ScoreUnderstandingEngine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}
