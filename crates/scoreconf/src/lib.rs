//! Layered configuration loading for scorelens.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins, key by key):
//! 1. `/etc/scorelens/config.toml` (system)
//! 2. `~/.config/scorelens/config.toml` (user)
//! 3. `./scorelens.toml` (local override, replaced by `--config PATH`)
//! 4. Environment variables (`SCORELENS_*`, plus `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [telemetry]
//! log_level = "info"
//!
//! [analysis]
//! key_profile = "krumhansl_kessler"
//! symmetry_mode = "tonal"
//!
//! [narrative]
//! default_agent = "remote"
//! temperature = 0.7
//! max_tokens = 2000
//! timeout_secs = 120
//!
//! [narrative.remote]
//! api_url = "https://api.openai.com/v1"
//! api_key = "sk-..."
//! model = "gpt-4o-mini"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use sections::{AgentEndpoint, AnalysisConfig, NarrativeConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete scorelens configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScoreConfig {
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub narrative: NarrativeConfig,
}

impl ScoreConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load with `config_path` standing in for `./scorelens.toml`.
    ///
    /// System and user configs still load first; env overrides apply last.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and return information about sources.
    pub fn load_with_sources() -> Result<(Self, ConfigSources), ConfigError> {
        Self::load_with_sources_from(None)
    }

    pub fn load_with_sources_from(config_path: Option<&Path>) -> Result<(Self, ConfigSources), ConfigError> {
        let (mut config, mut sources) =
            Self::load_files(&loader::discover_config_files_with_override(config_path))?;
        loader::apply_env_overrides(&mut config, &mut sources);
        Ok((config, sources))
    }

    /// Defaults overlaid with each file in order, without env overrides.
    pub fn load_files(paths: &[PathBuf]) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = ScoreConfig::default();
        for path in paths {
            loader::load_from_file(&mut config, path)?;
            sources.files.push(path.clone());
        }
        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        // Build TOML manually for nicer formatting
        let mut output = String::new();

        output.push_str("# scorelens configuration\n\n");

        output.push_str("[telemetry]\n");
        output.push_str(&format!("log_level = {:?}\n", self.telemetry.log_level));

        output.push_str("\n[analysis]\n");
        output.push_str(&format!("key_profile = {:?}\n", self.analysis.key_profile));
        output.push_str(&format!("symmetry_mode = {:?}\n", self.analysis.symmetry_mode));

        let narrative = &self.narrative;
        output.push_str("\n[narrative]\n");
        output.push_str(&format!("default_agent = {:?}\n", narrative.default_agent));
        output.push_str(&format!("temperature = {:?}\n", narrative.temperature));
        output.push_str(&format!("max_tokens = {}\n", narrative.max_tokens));
        output.push_str(&format!("timeout_secs = {}\n", narrative.timeout_secs));

        for (name, endpoint) in [("local", &narrative.local), ("remote", &narrative.remote)] {
            output.push_str(&format!("\n[narrative.{name}]\n"));
            output.push_str(&format!("api_url = {:?}\n", endpoint.api_url));
            output.push_str(&format!("api_key = {:?}\n", endpoint.api_key));
            output.push_str(&format!("model = {:?}\n", endpoint.model));
        }

        output
    }
}
