use std::fmt;
use std::str::FromStr;

use score_model::pitch_class_name;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    Major,
    Minor,
}

impl fmt::Display for KeyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMode::Major => write!(f, "major"),
            KeyMode::Minor => write!(f, "minor"),
        }
    }
}

impl FromStr for KeyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" => Ok(KeyMode::Major),
            "minor" => Ok(KeyMode::Minor),
            other => Err(format!("unknown mode '{other}', expected major or minor")),
        }
    }
}

/// Major keys written with flats: F, Bb, Eb, Ab, Db, Gb.
const FLAT_MAJOR_TONICS: [u8; 6] = [1, 3, 5, 6, 8, 10];
/// Minor keys written with flats: D, G, C, F, Bb, Eb.
const FLAT_MINOR_TONICS: [u8; 6] = [0, 2, 3, 5, 7, 10];

const MAJOR_SCALE: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
const NATURAL_MINOR_SCALE: [u8; 7] = [0, 2, 3, 5, 7, 8, 10];

/// A tonal center: tonic pitch class plus mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    pub tonic: u8,
    pub mode: KeyMode,
}

impl Key {
    pub fn new(tonic: u8, mode: KeyMode) -> Self {
        Self {
            tonic: tonic % 12,
            mode,
        }
    }

    pub fn major(tonic: u8) -> Self {
        Self::new(tonic, KeyMode::Major)
    }

    pub fn minor(tonic: u8) -> Self {
        Self::new(tonic, KeyMode::Minor)
    }

    /// Whether pitch names in this key are spelled with flats.
    pub fn uses_flats(&self) -> bool {
        match self.mode {
            KeyMode::Major => FLAT_MAJOR_TONICS.contains(&self.tonic),
            KeyMode::Minor => FLAT_MINOR_TONICS.contains(&self.tonic),
        }
    }

    pub fn tonic_name(&self) -> &'static str {
        pitch_class_name(self.tonic, self.uses_flats())
    }

    /// `"C major"`, `"F# minor"`.
    pub fn label(&self) -> String {
        format!("{} {}", self.tonic_name(), self.mode)
    }

    /// Diatonic pitch classes; minor keys use the natural minor scale.
    pub fn scale_pitch_classes(&self) -> [u8; 7] {
        let steps = match self.mode {
            KeyMode::Major => MAJOR_SCALE,
            KeyMode::Minor => NATURAL_MINOR_SCALE,
        };
        steps.map(|step| (self.tonic + step) % 12)
    }
}

impl Default for Key {
    fn default() -> Self {
        Key::major(0)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyDetection {
    pub key: Key,
    /// Pearson correlation with the best-matching profile; 0 when indeterminate
    pub confidence: f64,
}

impl KeyDetection {
    /// Default key reported when nothing can be estimated.
    pub fn indeterminate() -> Self {
        Self {
            key: Key::default(),
            confidence: 0.0,
        }
    }

    pub fn label(&self) -> String {
        self.key.label()
    }
}

/// Key-profile weights used for correlation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyProfile {
    #[default]
    KrumhanslKessler,
    AardenEssen,
}

impl FromStr for KeyProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "krumhansl" | "krumhansl_kessler" => Ok(KeyProfile::KrumhanslKessler),
            "aarden" | "aarden_essen" => Ok(KeyProfile::AardenEssen),
            other => Err(format!("unknown key profile '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordQuality {
    Major,
    Minor,
    Diminished,
    Augmented,
    Suspended4,
    Suspended2,
    Dominant7,
    Major7,
    Minor7,
    MinorMajor7,
    Diminished7,
    HalfDiminished7,
    Add9,
    Power,
}

impl ChordQuality {
    /// Common name used in chord labels, e.g. `major triad`.
    pub fn common_name(&self) -> &'static str {
        match self {
            ChordQuality::Major => "major triad",
            ChordQuality::Minor => "minor triad",
            ChordQuality::Diminished => "diminished triad",
            ChordQuality::Augmented => "augmented triad",
            ChordQuality::Suspended4 => "suspended-fourth triad",
            ChordQuality::Suspended2 => "suspended-second triad",
            ChordQuality::Dominant7 => "dominant seventh chord",
            ChordQuality::Major7 => "major seventh chord",
            ChordQuality::Minor7 => "minor seventh chord",
            ChordQuality::MinorMajor7 => "minor-major seventh chord",
            ChordQuality::Diminished7 => "diminished seventh chord",
            ChordQuality::HalfDiminished7 => "half-diminished seventh chord",
            ChordQuality::Add9 => "added-ninth chord",
            ChordQuality::Power => "power chord",
        }
    }

    /// Qualities whose third lies a minor third above the root.
    pub fn has_minor_third(&self) -> bool {
        matches!(
            self,
            ChordQuality::Minor
                | ChordQuality::Diminished
                | ChordQuality::Minor7
                | ChordQuality::MinorMajor7
                | ChordQuality::Diminished7
                | ChordQuality::HalfDiminished7
        )
    }

    pub fn is_seventh(&self) -> bool {
        matches!(
            self,
            ChordQuality::Dominant7
                | ChordQuality::Major7
                | ChordQuality::Minor7
                | ChordQuality::MinorMajor7
                | ChordQuality::Diminished7
                | ChordQuality::HalfDiminished7
        )
    }

    /// Triads and sevenths built from stacked thirds.
    pub fn is_tertian(&self) -> bool {
        self.is_seventh()
            || matches!(
                self,
                ChordQuality::Major
                    | ChordQuality::Minor
                    | ChordQuality::Diminished
                    | ChordQuality::Augmented
            )
    }
}
