//! Retrograde, inversion and retrograde-inversion self-similarity of a
//! part's pitch-class line.
//!
//! Tonal mode mirrors pitches about the tonic (`2·tonic − p`). Serial mode
//! derives a row from the first distinct pitch classes and compares the line,
//! cyclically, against the row's zero-centered transformations.

use std::fmt;
use std::str::FromStr;

use score_model::PitchSequence;
use serde::{Deserialize, Serialize};

/// Minimum number of notes for a meaningful comparison.
pub const MIN_SYMMETRY_NOTES: usize = 4;

pub const TOO_SHORT_SUMMARY: &str = "Score too short for symmetry analysis";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymmetryMode {
    #[default]
    Tonal,
    Serial,
}

impl fmt::Display for SymmetryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymmetryMode::Tonal => write!(f, "tonal"),
            SymmetryMode::Serial => write!(f, "serial"),
        }
    }
}

impl FromStr for SymmetryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tonal" => Ok(SymmetryMode::Tonal),
            "serial" | "atonal" | "twelve_tone" | "dodecaphonic" => Ok(SymmetryMode::Serial),
            other => Err(format!("unknown symmetry mode '{other}', expected tonal or serial")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymmetryStatus {
    Complete,
    InsufficientData,
}

/// How well the line matches one transformation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformationMatch {
    /// Percentage of matching positions, two decimals.
    pub score: f64,
    pub matches: usize,
    /// 1-based measure numbers of matching positions, ascending, unique.
    pub measures: Vec<u32>,
}

/// A twelve-tone row and its zero-centered forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialRow {
    /// Pitch classes in order of first appearance, at most twelve.
    pub row: Vec<u8>,
    pub prime: Vec<u8>,
    pub inversion: Vec<u8>,
    pub retrograde: Vec<u8>,
    pub retrograde_inversion: Vec<u8>,
    /// `matrix[i][j] = (I0[i] + P0[j]) mod 12`.
    pub matrix: Vec<Vec<u8>>,
}

impl SerialRow {
    pub fn from_sequence(pitch_classes: &[u8]) -> Self {
        let mut row: Vec<u8> = Vec::with_capacity(12);
        for &pc in pitch_classes {
            if row.len() == 12 {
                break;
            }
            if !row.contains(&(pc % 12)) {
                row.push(pc % 12);
            }
        }

        let first = row.first().copied().unwrap_or(0);
        let prime: Vec<u8> = row.iter().map(|&pc| (pc + 12 - first) % 12).collect();
        let inversion: Vec<u8> = prime.iter().map(|&pc| (12 - pc) % 12).collect();
        let retrograde: Vec<u8> = prime.iter().rev().copied().collect();
        let retrograde_inversion: Vec<u8> = inversion.iter().rev().copied().collect();
        let matrix: Vec<Vec<u8>> = inversion
            .iter()
            .map(|&i| prime.iter().map(|&p| (i + p) % 12).collect())
            .collect();

        Self {
            row,
            prime,
            inversion,
            retrograde,
            retrograde_inversion,
            matrix,
        }
    }

    /// The sequence transposed so the row's first pitch class is 0.
    fn center(&self, pitch_classes: &[u8]) -> Vec<u8> {
        let first = self.row.first().copied().unwrap_or(0);
        pitch_classes.iter().map(|&pc| (pc % 12 + 12 - first) % 12).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymmetryResult {
    pub mode: SymmetryMode,
    pub status: SymmetryStatus,
    pub part: String,
    pub note_count: usize,
    /// Inversion axis pitch class in tonal mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tonic: Option<u8>,
    pub retrograde: TransformationMatch,
    pub inversion: TransformationMatch,
    pub retrograde_inversion: TransformationMatch,
    /// Reference the line was compared against for inversion: the mirrored
    /// line in tonal mode, I0 in serial mode.
    pub inverted_sequence: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<SerialRow>,
    pub summary: String,
}

impl SymmetryResult {
    fn insufficient(mode: SymmetryMode, part: String, note_count: usize, tonic: Option<u8>) -> Self {
        Self {
            mode,
            status: SymmetryStatus::InsufficientData,
            part,
            note_count,
            tonic,
            retrograde: TransformationMatch::default(),
            inversion: TransformationMatch::default(),
            retrograde_inversion: TransformationMatch::default(),
            inverted_sequence: Vec::new(),
            serial: None,
            summary: TOO_SHORT_SUMMARY.to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == SymmetryStatus::Complete
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mirror pitch classes about the tonic.
pub fn tonal_inversion(pitch_classes: &[u8], tonic: u8) -> Vec<u8> {
    let axis = 2 * (tonic as i32 % 12);
    pitch_classes
        .iter()
        .map(|&pc| (axis - pc as i32).rem_euclid(12) as u8)
        .collect()
}

/// Compare `line[i]` with `reference[i mod reference.len()]`.
fn compare(line: &[u8], reference: &[u8], sequence: &PitchSequence) -> TransformationMatch {
    if line.is_empty() || reference.is_empty() {
        return TransformationMatch::default();
    }
    let mut measures = Vec::new();
    let mut matches = 0;
    for (i, &pc) in line.iter().enumerate() {
        if pc == reference[i % reference.len()] {
            matches += 1;
            if let Some(measure) = sequence.measure_at(i) {
                measures.push(measure);
            }
        }
    }
    measures.sort_unstable();
    measures.dedup();
    TransformationMatch {
        score: round2(100.0 * matches as f64 / line.len() as f64),
        matches,
        measures,
    }
}

/// Analyze a pitch sequence for symmetry.
///
/// `tonic` is the inversion axis in tonal mode and ignored in serial mode.
pub fn analyze_sequence(
    sequence: &PitchSequence,
    part: impl Into<String>,
    mode: SymmetryMode,
    tonic: u8,
) -> SymmetryResult {
    let part = part.into();
    let tonic = match mode {
        SymmetryMode::Tonal => Some(tonic % 12),
        SymmetryMode::Serial => None,
    };
    if sequence.len() < MIN_SYMMETRY_NOTES {
        return SymmetryResult::insufficient(mode, part, sequence.len(), tonic);
    }

    let pcs = &sequence.pitch_classes;
    let (line, retrograde_ref, inversion_ref, ri_ref, serial) = match mode {
        SymmetryMode::Tonal => {
            let axis = tonic.unwrap_or(0);
            let reversed: Vec<u8> = pcs.iter().rev().copied().collect();
            let inverted = tonal_inversion(pcs, axis);
            let retrograde_inverted = tonal_inversion(&reversed, axis);
            (pcs.clone(), reversed, inverted, retrograde_inverted, None)
        }
        SymmetryMode::Serial => {
            let row = SerialRow::from_sequence(pcs);
            let line = row.center(pcs);
            (
                line,
                row.retrograde.clone(),
                row.inversion.clone(),
                row.retrograde_inversion.clone(),
                Some(row),
            )
        }
    };

    let retrograde = compare(&line, &retrograde_ref, sequence);
    let inversion = compare(&line, &inversion_ref, sequence);
    let retrograde_inversion = compare(&line, &ri_ref, sequence);
    let summary = format!(
        "Retrograde: {}%, Inversion: {}%, Retrograde-inversion: {}%",
        retrograde.score, inversion.score, retrograde_inversion.score
    );

    SymmetryResult {
        mode,
        status: SymmetryStatus::Complete,
        part,
        note_count: sequence.len(),
        tonic,
        retrograde,
        inversion,
        retrograde_inversion,
        inverted_sequence: inversion_ref,
        serial,
        summary,
    }
}
