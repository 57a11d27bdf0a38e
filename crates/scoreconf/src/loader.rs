//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, ScoreConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "SCORELENS_";

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided, it replaces the local override. A missing CLI
/// path is still returned so loading reports it.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/scorelens/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("scorelens/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        files.push(path.to_path_buf());
        return files;
    }

    let local = PathBuf::from("scorelens.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file and lay its settings over `config`.
pub fn load_from_file(config: &mut ScoreConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(config, &contents, path)
}

fn parse_error(path: &Path, message: impl Into<String>) -> ConfigError {
    ConfigError::Parse {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn set_string(table: &toml::Table, key: &str, target: &mut String, path: &Path) -> Result<(), ConfigError> {
    match table.get(key) {
        None => Ok(()),
        Some(toml::Value::String(v)) => {
            *target = v.clone();
            Ok(())
        }
        Some(other) => Err(parse_error(path, format!("{key} must be a string, got {}", other.type_str()))),
    }
}

fn integer<T: TryFrom<i64>>(table: &toml::Table, key: &str, path: &Path) -> Result<Option<T>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(toml::Value::Integer(v)) => T::try_from(*v)
            .map(Some)
            .map_err(|_| parse_error(path, format!("{key} out of range: {v}"))),
        Some(other) => Err(parse_error(path, format!("{key} must be an integer, got {}", other.type_str()))),
    }
}

fn section<'a>(table: &'a toml::Table, key: &str, path: &Path) -> Result<Option<&'a toml::Table>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(toml::Value::Table(t)) => Ok(Some(t)),
        Some(other) => Err(parse_error(path, format!("[{key}] must be a table, got {}", other.type_str()))),
    }
}

/// Apply a TOML document over `config`; keys absent from the document keep
/// their current values.
pub(crate) fn apply_toml(config: &mut ScoreConfig, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table: toml::Table = contents
        .parse()
        .map_err(|e: toml::de::Error| parse_error(path, e.to_string()))?;

    if let Some(telemetry) = section(&table, "telemetry", path)? {
        set_string(telemetry, "log_level", &mut config.telemetry.log_level, path)?;
    }

    if let Some(analysis) = section(&table, "analysis", path)? {
        set_string(analysis, "key_profile", &mut config.analysis.key_profile, path)?;
        set_string(analysis, "symmetry_mode", &mut config.analysis.symmetry_mode, path)?;
    }

    if let Some(narrative) = section(&table, "narrative", path)? {
        let target = &mut config.narrative;
        set_string(narrative, "default_agent", &mut target.default_agent, path)?;
        match narrative.get("temperature") {
            None => {}
            Some(toml::Value::Float(v)) => target.temperature = *v as f32,
            Some(toml::Value::Integer(v)) => target.temperature = *v as f32,
            Some(other) => {
                return Err(parse_error(
                    path,
                    format!("temperature must be a number, got {}", other.type_str()),
                ))
            }
        }
        if let Some(v) = integer(narrative, "max_tokens", path)? {
            target.max_tokens = v;
        }
        if let Some(v) = integer(narrative, "timeout_secs", path)? {
            target.timeout_secs = v;
        }

        for (name, endpoint) in [("local", &mut target.local), ("remote", &mut target.remote)] {
            if let Some(agent) = section(narrative, name, path)? {
                set_string(agent, "api_url", &mut endpoint.api_url, path)?;
                set_string(agent, "api_key", &mut endpoint.api_key, path)?;
                set_string(agent, "model", &mut endpoint.model, path)?;
            }
        }
    }

    Ok(())
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut ScoreConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, env::vars());
}

/// Apply `SCORELENS_*` (and `RUST_LOG`) overrides from the given variables.
///
/// Unparseable numbers are ignored, leaving the earlier value in place.
pub fn apply_overrides_from(
    config: &mut ScoreConfig,
    sources: &mut ConfigSources,
    vars: impl IntoIterator<Item = (String, String)>,
) {
    let mut vars: Vec<(String, String)> = vars.into_iter().collect();
    // RUST_LOG wins over SCORELENS_LOG_LEVEL
    vars.sort_by_key(|(key, _)| key == "RUST_LOG");

    for (key, value) in vars {
        let applied = match key.strip_prefix(ENV_PREFIX) {
            Some("LOG_LEVEL") => {
                config.telemetry.log_level = value;
                true
            }
            Some("KEY_PROFILE") => {
                config.analysis.key_profile = value;
                true
            }
            Some("SYMMETRY_MODE") => {
                config.analysis.symmetry_mode = value;
                true
            }
            Some("AGENT") => {
                config.narrative.default_agent = value;
                true
            }
            Some("TEMPERATURE") => value.parse::<f32>().map(|v| config.narrative.temperature = v).is_ok(),
            Some("MAX_TOKENS") => value.parse::<u32>().map(|v| config.narrative.max_tokens = v).is_ok(),
            Some("TIMEOUT_SECS") => value.parse::<u64>().map(|v| config.narrative.timeout_secs = v).is_ok(),
            Some(rest) => apply_endpoint_override(config, rest, value),
            None if key == "RUST_LOG" => {
                config.telemetry.log_level = value;
                true
            }
            None => false,
        };
        if applied {
            sources.env_overrides.push(key);
        }
    }
}

/// `LOCAL_API_URL`, `REMOTE_MODEL`, ...
fn apply_endpoint_override(config: &mut ScoreConfig, name: &str, value: String) -> bool {
    let (endpoint, field) = if let Some(field) = name.strip_prefix("LOCAL_") {
        (&mut config.narrative.local, field)
    } else if let Some(field) = name.strip_prefix("REMOTE_") {
        (&mut config.narrative.remote, field)
    } else {
        return false;
    };

    match field {
        "API_URL" => endpoint.api_url = value,
        "API_KEY" => endpoint.api_key = value,
        "MODEL" => endpoint.model = value,
        _ => return false,
    }
    true
}
