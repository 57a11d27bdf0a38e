//! Configuration sections.

use serde::{Deserialize, Serialize};

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// `tracing` filter directive, e.g. `info` or `score_understand=debug`.
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

/// Analysis engine settings.
///
/// Values stay as strings here; the engine parses them into its own types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// `krumhansl_kessler` or `aarden_essen`.
    /// Default: krumhansl_kessler
    #[serde(default = "AnalysisConfig::default_key_profile")]
    pub key_profile: String,

    /// `tonal` or `serial`.
    /// Default: tonal
    #[serde(default = "AnalysisConfig::default_symmetry_mode")]
    pub symmetry_mode: String,
}

impl AnalysisConfig {
    fn default_key_profile() -> String {
        "krumhansl_kessler".to_string()
    }

    fn default_symmetry_mode() -> String {
        "tonal".to_string()
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            key_profile: Self::default_key_profile(),
            symmetry_mode: Self::default_symmetry_mode(),
        }
    }
}

/// One OpenAI-compatible completion endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentEndpoint {
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
}

impl AgentEndpoint {
    /// Names of the required settings that are empty, `None` when complete.
    pub fn missing(&self) -> Option<String> {
        let missing: Vec<&str> = [("api_url", &self.api_url), ("model", &self.model)]
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect();
        (!missing.is_empty()).then(|| missing.join(", "))
    }
}

/// Narrative (AI text) settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeConfig {
    /// `local` or `remote`.
    /// Default: remote
    #[serde(default = "NarrativeConfig::default_agent")]
    pub default_agent: String,

    /// Default: 0.7
    #[serde(default = "NarrativeConfig::default_temperature")]
    pub temperature: f32,

    /// Default: 2000
    #[serde(default = "NarrativeConfig::default_max_tokens")]
    pub max_tokens: u32,

    /// Default: 120
    #[serde(default = "NarrativeConfig::default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "NarrativeConfig::default_local")]
    pub local: AgentEndpoint,

    #[serde(default)]
    pub remote: AgentEndpoint,
}

impl NarrativeConfig {
    fn default_agent() -> String {
        "remote".to_string()
    }

    fn default_temperature() -> f32 {
        0.7
    }

    fn default_max_tokens() -> u32 {
        2000
    }

    fn default_timeout_secs() -> u64 {
        120
    }

    fn default_local() -> AgentEndpoint {
        AgentEndpoint {
            api_url: "http://localhost:1234/v1".to_string(),
            api_key: "not-needed".to_string(),
            model: String::new(),
        }
    }

    /// Endpoint for an agent name; anything but `local` is the remote one.
    pub fn endpoint(&self, agent: &str) -> &AgentEndpoint {
        if agent.trim().eq_ignore_ascii_case("local") {
            &self.local
        } else {
            &self.remote
        }
    }
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            default_agent: Self::default_agent(),
            temperature: Self::default_temperature(),
            max_tokens: Self::default_max_tokens(),
            timeout_secs: Self::default_timeout_secs(),
            local: Self::default_local(),
            remote: AgentEndpoint::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_defaults() {
        assert_eq!(TelemetryConfig::default().log_level, "info");
    }

    #[test]
    fn test_analysis_defaults() {
        let analysis = AnalysisConfig::default();
        assert_eq!(analysis.key_profile, "krumhansl_kessler");
        assert_eq!(analysis.symmetry_mode, "tonal");
    }

    #[test]
    fn test_narrative_defaults() {
        let narrative = NarrativeConfig::default();
        assert_eq!(narrative.default_agent, "remote");
        assert_eq!(narrative.max_tokens, 2000);
        assert_eq!(narrative.timeout_secs, 120);
        assert_eq!(narrative.local.api_key, "not-needed");
    }

    #[test]
    fn test_missing_endpoint_fields() {
        let narrative = NarrativeConfig::default();
        assert_eq!(narrative.endpoint("remote").missing().as_deref(), Some("api_url, model"));
        assert_eq!(narrative.endpoint("LOCAL").missing().as_deref(), Some("model"));

        let complete = AgentEndpoint {
            api_url: "http://gpu:8000/v1".to_string(),
            api_key: String::new(),
            model: "mistral".to_string(),
        };
        assert_eq!(complete.missing(), None);
    }
}
