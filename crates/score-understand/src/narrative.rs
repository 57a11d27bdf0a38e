//! Payload for AI-written narrative analysis.
//!
//! The engine only assembles what a text-completion backend needs: the
//! piano-roll notes, the user's prompt and which agent to use. Transport
//! lives behind [`TextCompletion`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::overview::{PianoRoll, PianoRollInstrument};

pub const SYSTEM_PROMPT: &str =
    "You are a music analysis expert. Provide detailed and well-structured analyses in Markdown format.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMode {
    Local,
    #[default]
    Remote,
}

impl fmt::Display for AgentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentMode::Local => write!(f, "local"),
            AgentMode::Remote => write!(f, "remote"),
        }
    }
}

impl FromStr for AgentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(AgentMode::Local),
            "remote" => Ok(AgentMode::Remote),
            other => Err(format!("unknown agent '{other}', expected local or remote")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NarrativeError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("failed to encode piano roll: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{mode} agent configuration incomplete: {missing}")]
    IncompleteConfig { mode: AgentMode, missing: String },
}

/// Sampling settings handed to the completion backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2000,
            timeout: Duration::from_secs(120),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeRequest {
    pub instruments: Vec<PianoRollInstrument>,
    pub prompt: String,
    pub mode: AgentMode,
}

impl NarrativeRequest {
    pub fn new(roll: PianoRoll, prompt: impl Into<String>, mode: AgentMode) -> Result<Self, NarrativeError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(NarrativeError::EmptyPrompt);
        }
        Ok(Self {
            instruments: roll.instruments,
            prompt,
            mode,
        })
    }

    /// Comma-separated instrument names, `Unknown` when there are none.
    pub fn instrument_names(&self) -> String {
        if self.instruments.is_empty() {
            return "Unknown".to_string();
        }
        self.instruments
            .iter()
            .map(|i| i.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Pretty-printed piano-roll notes.
    pub fn notes_json(&self) -> Result<String, NarrativeError> {
        Ok(serde_json::to_string_pretty(&self.instruments)?)
    }

    /// The user message sent alongside [`SYSTEM_PROMPT`].
    pub fn user_message(&self) -> Result<String, NarrativeError> {
        Ok(format!(
            "Instruments: {}\n\nPiano Roll Data (JSON):\n{}\n\nAnalysis Prompt:\n{}\n\n\
             Please provide a detailed and structured analysis in Markdown.",
            self.instrument_names(),
            self.notes_json()?,
            self.prompt
        ))
    }
}

/// A backend that turns a narrative request into prose.
pub trait TextCompletion: Send + Sync {
    fn complete(&self, request: &NarrativeRequest, settings: &CompletionSettings) -> Result<String, NarrativeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overview::PianoRollNote;
    use pretty_assertions::assert_eq;

    fn roll() -> PianoRoll {
        PianoRoll {
            instruments: vec![
                PianoRollInstrument {
                    name: "Violin".to_string(),
                    notes: vec![PianoRollNote {
                        pitch: 69,
                        name: "A4".to_string(),
                        start: 0.0,
                        duration: 1.0,
                        velocity: 64,
                    }],
                },
                PianoRollInstrument {
                    name: "Cello".to_string(),
                    notes: Vec::new(),
                },
            ],
        }
    }

    struct Echo;

    impl TextCompletion for Echo {
        fn complete(&self, request: &NarrativeRequest, settings: &CompletionSettings) -> Result<String, NarrativeError> {
            Ok(format!("{} @ {}", request.instrument_names(), settings.max_tokens))
        }
    }

    #[test]
    fn names_joined_or_unknown() {
        let request = NarrativeRequest::new(roll(), "Describe the form", AgentMode::Local).unwrap();
        assert_eq!(request.instrument_names(), "Violin, Cello");

        let empty = NarrativeRequest::new(PianoRoll { instruments: Vec::new() }, "x", AgentMode::Remote).unwrap();
        assert_eq!(empty.instrument_names(), "Unknown");
    }

    #[test]
    fn empty_prompt_rejected() {
        let result = NarrativeRequest::new(roll(), "   ", AgentMode::Remote);
        assert!(matches!(result, Err(NarrativeError::EmptyPrompt)));
    }

    #[test]
    fn user_message_embeds_pretty_notes() {
        let request = NarrativeRequest::new(roll(), "Describe the form", AgentMode::Remote).unwrap();
        let message = request.user_message().unwrap();
        assert!(message.starts_with("Instruments: Violin, Cello\n\nPiano Roll Data (JSON):\n[\n  {\n"));
        assert!(message.contains("\"name\": \"A4\""));
        assert!(message.ends_with(
            "Analysis Prompt:\nDescribe the form\n\nPlease provide a detailed and structured analysis in Markdown."
        ));
    }

    #[test]
    fn completion_backend_receives_request() {
        let request = NarrativeRequest::new(roll(), "Go", AgentMode::Local).unwrap();
        let text = Echo.complete(&request, &CompletionSettings::default()).unwrap();
        assert_eq!(text, "Violin, Cello @ 2000");
    }

    #[test]
    fn agent_mode_parsing() {
        assert_eq!("LOCAL".parse::<AgentMode>(), Ok(AgentMode::Local));
        assert_eq!(AgentMode::default(), AgentMode::Remote);
        assert!("cloud".parse::<AgentMode>().is_err());
    }
}
