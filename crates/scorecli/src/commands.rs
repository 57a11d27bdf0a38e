//! Command implementations. Each returns the text to print on stdout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use score_model::Score;
use score_understand::narrative::SYSTEM_PROMPT;
use score_understand::{
    render_report, report_file_name, AgentMode, AnalysisRequest, AnalysisType, CompletionSettings,
    EngineOptions, KeyProfile, MelodicOptions, NarrativeError, ScoreUnderstandingEngine,
    SymmetryMode,
};
use scoreconf::{ConfigSources, ScoreConfig};
use serde::Serialize;
use tracing::info;

/// Engine options from the `[analysis]` section.
pub fn engine_options(config: &ScoreConfig) -> Result<EngineOptions> {
    let key_profile = config
        .analysis
        .key_profile
        .parse::<KeyProfile>()
        .map_err(|e: String| anyhow!(e))
        .context("invalid analysis.key_profile")?;
    let symmetry_mode = config
        .analysis
        .symmetry_mode
        .parse::<SymmetryMode>()
        .map_err(|e: String| anyhow!(e))
        .context("invalid analysis.symmetry_mode")?;
    Ok(EngineOptions {
        key_profile,
        symmetry_mode,
    })
}

fn load(path: &Path) -> Result<Score> {
    score_model::load_score(path).with_context(|| format!("failed to load score {}", path.display()))
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to encode JSON")
}

pub fn overview(engine: &ScoreUnderstandingEngine, path: &Path) -> Result<String> {
    let score = load(path)?;
    to_json(&engine.overview(&score))
}

pub struct AnalyzeArgs {
    pub parts: Vec<usize>,
    pub melodic: MelodicOptions,
    pub report: bool,
    /// Directory to save the text report in.
    pub save_dir: Option<PathBuf>,
}

pub fn analyze(engine: &ScoreUnderstandingEngine, path: &Path, args: AnalyzeArgs) -> Result<String> {
    let score = load(path)?;
    // no feature flags means every feature
    let melodic = if args.melodic.any() { args.melodic } else { MelodicOptions::all() };
    let request = AnalysisRequest {
        harmonic_parts: args.parts,
        melodic,
    };
    let analysis = engine.analyze(&score, &request)?;

    if let Some(dir) = &args.save_dir {
        let name = report_file_name(&analysis.title, chrono::Local::now().naive_local());
        let target = dir.join(name);
        std::fs::write(&target, render_report(&analysis))
            .with_context(|| format!("failed to write report {}", target.display()))?;
        info!(path = %target.display(), "report saved");
    }

    if args.report {
        Ok(render_report(&analysis))
    } else {
        to_json(&analysis)
    }
}

pub fn advanced(engine: &ScoreUnderstandingEngine, path: &Path, analysis: &str) -> Result<String> {
    let analysis = analysis.parse::<AnalysisType>()?;
    let score = load(path)?;
    to_json(&engine.advanced(&score, analysis))
}

pub fn symmetry(
    engine: &ScoreUnderstandingEngine,
    path: &Path,
    part: usize,
    mode: Option<&str>,
    tonic: Option<u8>,
) -> Result<String> {
    let mode = mode
        .map(|m| m.parse::<SymmetryMode>().map_err(|e| anyhow!(e)))
        .transpose()?;
    let score = load(path)?;
    to_json(&engine.symmetry(&score, part, mode, tonic)?)
}

pub fn piano_roll(engine: &ScoreUnderstandingEngine, path: &Path) -> Result<String> {
    let score = load(path)?;
    to_json(&engine.piano_roll(&score))
}

pub fn compare(engine: &ScoreUnderstandingEngine, path: &Path, parts: &[usize]) -> Result<String> {
    let score = load(path)?;
    to_json(&engine.compare(&score, parts))
}

/// A chat completion ready for an OpenAI-compatible endpoint.
#[derive(Debug, Serialize)]
pub struct PreparedCompletion<'a> {
    pub mode: AgentMode,
    pub api_url: &'a str,
    pub model: &'a str,
    pub system: &'static str,
    pub user: String,
    pub settings: CompletionSettings,
}

pub fn narrative(
    engine: &ScoreUnderstandingEngine,
    config: &ScoreConfig,
    path: &Path,
    prompt: &str,
    agent: Option<&str>,
) -> Result<String> {
    let mode = agent
        .unwrap_or(&config.narrative.default_agent)
        .parse::<AgentMode>()
        .map_err(|e: String| anyhow!(e))?;
    let endpoint = config.narrative.endpoint(&mode.to_string());
    if let Some(missing) = endpoint.missing() {
        return Err(NarrativeError::IncompleteConfig { mode, missing }.into());
    }

    let score = load(path)?;
    let request = engine.narrative_request(&score, prompt, mode)?;
    let prepared = PreparedCompletion {
        mode,
        api_url: &endpoint.api_url,
        model: &endpoint.model,
        system: SYSTEM_PROMPT,
        user: request.user_message()?,
        settings: CompletionSettings {
            temperature: config.narrative.temperature,
            max_tokens: config.narrative.max_tokens,
            timeout: Duration::from_secs(config.narrative.timeout_secs),
        },
    };
    to_json(&prepared)
}

pub fn show_config(config: &ScoreConfig, sources: &ConfigSources) -> String {
    let mut output = String::new();
    for file in &sources.files {
        output.push_str(&format!("# file: {}\n", file.display()));
    }
    for var in &sources.env_overrides {
        output.push_str(&format!("# env: {var}\n"));
    }
    if !output.is_empty() {
        output.push('\n');
    }
    output.push_str(&config.to_toml());
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tempfile::TempDir;

    const DUO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="3.1">
  <movement-title>Duo Study</movement-title>
  <part-list>
    <score-part id="P1"><part-name>Oboe</part-name></score-part>
    <score-part id="P2"><part-name>Bassoon</part-name></score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes>
        <divisions>1</divisions>
        <time><beats>4</beats><beat-type>4</beat-type></time>
      </attributes>
      <note><pitch><step>E</step><octave>5</octave></pitch><duration>1</duration></note>
      <note><pitch><step>D</step><octave>5</octave></pitch><duration>1</duration></note>
      <note><pitch><step>C</step><octave>5</octave></pitch><duration>2</duration></note>
    </measure>
    <measure number="2">
      <note><pitch><step>D</step><octave>5</octave></pitch><duration>2</duration></note>
      <note><pitch><step>C</step><octave>5</octave></pitch><duration>2</duration></note>
    </measure>
  </part>
  <part id="P2">
    <measure number="1">
      <attributes><divisions>1</divisions></attributes>
      <note><pitch><step>C</step><octave>3</octave></pitch><duration>4</duration></note>
    </measure>
    <measure number="2">
      <note><pitch><step>G</step><octave>2</octave></pitch><duration>2</duration></note>
      <note><pitch><step>C</step><octave>3</octave></pitch><duration>2</duration></note>
    </measure>
  </part>
</score-partwise>
"#;

    fn write_score(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("duo.musicxml");
        std::fs::write(&path, DUO).unwrap();
        path
    }

    fn engine() -> ScoreUnderstandingEngine {
        ScoreUnderstandingEngine::new(engine_options(&ScoreConfig::default()).unwrap())
    }

    #[test]
    fn info_prints_overview_json() {
        let dir = TempDir::new().unwrap();
        let json: Value = serde_json::from_str(&overview(&engine(), &write_score(&dir)).unwrap()).unwrap();
        assert_eq!(json["title"], "Duo Study");
        assert_eq!(json["general_info"]["instrument_names"][1], "Bassoon");
        assert_eq!(json["general_info"]["total_measures"], 2);
    }

    #[test]
    fn analyze_renders_and_saves_report() {
        let dir = TempDir::new().unwrap();
        let args = AnalyzeArgs {
            parts: vec![0, 1],
            melodic: MelodicOptions::default(),
            report: true,
            save_dir: Some(dir.path().to_path_buf()),
        };
        let text = analyze(&engine(), &write_score(&dir), args).unwrap();
        assert!(text.contains("Instrument: Oboe\nMost common intervals:\n"), "{text}");
        assert!(text.contains(">>> HARMONIC REDUCTION ANALYSIS <<<"));

        let saved: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("Report_Duo_Study_"))
            .collect();
        assert_eq!(saved.len(), 1);
    }

    #[test]
    fn analyze_rejects_out_of_range_part() {
        let dir = TempDir::new().unwrap();
        let args = AnalyzeArgs {
            parts: vec![3],
            melodic: MelodicOptions::all(),
            report: false,
            save_dir: None,
        };
        let err = analyze(&engine(), &write_score(&dir), args).unwrap_err();
        assert!(err.to_string().contains("part index 3 out of range"), "{err}");
    }

    #[test]
    fn advanced_parses_type_first() {
        let dir = TempDir::new().unwrap();
        let path = write_score(&dir);
        let json: Value = serde_json::from_str(&advanced(&engine(), &path, "phrases").unwrap()).unwrap();
        assert_eq!(json["analysis"], "phrase_structure");
        assert_eq!(json["summary"], "Identified 2 phrases");

        let err = advanced(&engine(), &path, "orchestration").unwrap_err();
        assert_eq!(err.to_string(), "unsupported analysis type: orchestration");
    }

    #[test]
    fn symmetry_reports_short_line() {
        let dir = TempDir::new().unwrap();
        let text = symmetry(&engine(), &write_score(&dir), 1, Some("tonal"), Some(0)).unwrap();
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["status"], "insufficient_data");
        assert_eq!(json["part"], "Bassoon");
    }

    #[test]
    fn missing_file_has_context() {
        let err = overview(&engine(), Path::new("/nonexistent/score.musicxml")).unwrap_err();
        assert!(err.to_string().starts_with("failed to load score"), "{err}");
    }

    #[test]
    fn narrative_needs_endpoint_settings() {
        let dir = TempDir::new().unwrap();
        let config = ScoreConfig::default();
        let err = narrative(&engine(), &config, &write_score(&dir), "Describe it", None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "remote agent configuration incomplete: api_url, model"
        );
    }

    #[test]
    fn narrative_prepares_completion() {
        let dir = TempDir::new().unwrap();
        let mut config = ScoreConfig::default();
        config.narrative.local.model = "qwen2.5-7b".to_string();
        config.narrative.max_tokens = 800;

        let text = narrative(&engine(), &config, &write_score(&dir), "Compare the lines", Some("local")).unwrap();
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["mode"], "local");
        assert_eq!(json["model"], "qwen2.5-7b");
        assert_eq!(json["settings"]["max_tokens"], 800);
        assert_eq!(json["settings"]["timeout"], 120);
        let user = json["user"].as_str().unwrap();
        assert!(user.starts_with("Instruments: Oboe, Bassoon\n"), "{user}");
        assert!(user.contains("Analysis Prompt:\nCompare the lines"));
    }

    #[test]
    fn bad_config_values_are_reported() {
        let mut config = ScoreConfig::default();
        config.analysis.symmetry_mode = "fractal".to_string();
        let err = engine_options(&config).unwrap_err();
        assert_eq!(err.to_string(), "invalid analysis.symmetry_mode");
    }

    #[test]
    fn config_listing_names_sources() {
        let sources = ConfigSources {
            files: vec![PathBuf::from("/etc/scorelens/config.toml")],
            env_overrides: vec!["SCORELENS_AGENT".to_string()],
        };
        let text = show_config(&ScoreConfig::default(), &sources);
        assert!(text.starts_with("# file: /etc/scorelens/config.toml\n# env: SCORELENS_AGENT\n\n"));
        assert!(text.contains("[narrative.remote]"));
    }
}
