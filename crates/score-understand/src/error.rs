use serde::{Deserialize, Serialize};

/// Request-level failures.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    InvalidScore(#[from] score_model::Error),

    #[error("part index {index} out of range (score has {part_count} parts)")]
    IndexOutOfRange { index: usize, part_count: usize },

    #[error("no parts selected")]
    EmptySelection,

    #[error("unsupported analysis type: {0}")]
    UnsupportedAnalysis(String),

    /// Too little material for a statistical pass; reported through result
    /// fields rather than aborting a request.
    #[error("insufficient data: {0}")]
    InsufficientData(String),
}

/// Why a chord name or roman numeral could not be derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum DerivationFailure {
    #[error("no chord template matches the pitch-class set")]
    NoTemplate,

    #[error("chord has no roman-numeral function")]
    NoRomanNumeral,

    #[error("sonority has no pitches")]
    EmptySonority,
}

/// Outcome of a per-sonority derivation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Derivation<T> {
    Derived { value: T },
    Failed { reason: DerivationFailure },
}

impl<T> Derivation<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Derivation::Derived { value } => Some(value),
            Derivation::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<DerivationFailure> {
        match self {
            Derivation::Derived { .. } => None,
            Derivation::Failed { reason } => Some(*reason),
        }
    }
}

impl<T> From<Result<T, DerivationFailure>> for Derivation<T> {
    fn from(result: Result<T, DerivationFailure>) -> Self {
        match result {
            Ok(value) => Derivation::Derived { value },
            Err(reason) => Derivation::Failed { reason },
        }
    }
}

impl Derivation<String> {
    /// The derived text, or `sentinel` when derivation failed.
    pub fn display_or(&self, sentinel: &str) -> String {
        self.value().cloned().unwrap_or_else(|| sentinel.to_string())
    }
}
