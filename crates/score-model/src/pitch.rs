use serde::{Deserialize, Serialize};

const NOTE_NAMES_SHARP: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
const NOTE_NAMES_FLAT: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Name of a pitch class (0–11), spelled with sharps or flats.
pub fn pitch_class_name(pitch_class: u8, use_flats: bool) -> &'static str {
    let idx = (pitch_class % 12) as usize;
    if use_flats {
        NOTE_NAMES_FLAT[idx]
    } else {
        NOTE_NAMES_SHARP[idx]
    }
}

/// Diatonic letter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    /// Position within the octave, C = 0 .. B = 6.
    pub fn index(self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 1,
            Step::E => 2,
            Step::F => 3,
            Step::G => 4,
            Step::A => 5,
            Step::B => 6,
        }
    }

    /// Semitones above C of the natural step.
    pub fn semitones(self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Step::C => 'C',
            Step::D => 'D',
            Step::E => 'E',
            Step::F => 'F',
            Step::G => 'G',
            Step::A => 'A',
            Step::B => 'B',
        }
    }

    pub fn from_letter(text: &str) -> Option<Self> {
        match text.trim() {
            "C" | "c" => Some(Step::C),
            "D" | "d" => Some(Step::D),
            "E" | "e" => Some(Step::E),
            "F" | "f" => Some(Step::F),
            "G" | "g" => Some(Step::G),
            "A" | "a" => Some(Step::A),
            "B" | "b" => Some(Step::B),
            _ => None,
        }
    }
}

/// Accidental attached to a spelled pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Accidental {
    Natural,
    Sharp,
    Flat,
    DoubleSharp,
    DoubleFlat,
    /// Triple accidentals and beyond.
    Other,
}

impl Accidental {
    pub fn name(self) -> &'static str {
        match self {
            Accidental::Natural => "natural",
            Accidental::Sharp => "sharp",
            Accidental::Flat => "flat",
            Accidental::DoubleSharp => "double-sharp",
            Accidental::DoubleFlat => "double-flat",
            Accidental::Other => "other",
        }
    }
}

/// A spelled pitch: letter, chromatic alteration and octave (C4 = middle C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    pub step: Step,
    pub alter: i8,
    pub octave: i8,
}

impl Pitch {
    pub fn new(step: Step, alter: i8, octave: i8) -> Self {
        Self {
            step,
            alter,
            octave,
        }
    }

    /// Spell a MIDI note number using sharps.
    pub fn from_midi(midi: u8) -> Self {
        const SPELLING: [(Step, i8); 12] = [
            (Step::C, 0),
            (Step::C, 1),
            (Step::D, 0),
            (Step::D, 1),
            (Step::E, 0),
            (Step::F, 0),
            (Step::F, 1),
            (Step::G, 0),
            (Step::G, 1),
            (Step::A, 0),
            (Step::A, 1),
            (Step::B, 0),
        ];
        let (step, alter) = SPELLING[(midi % 12) as usize];
        Self::new(step, alter, (midi / 12) as i8 - 1)
    }

    /// MIDI note number; may fall outside 0..=127 for exotic spellings.
    pub fn midi(&self) -> i32 {
        (self.octave as i32 + 1) * 12 + self.step.semitones() + self.alter as i32
    }

    pub fn pitch_class(&self) -> u8 {
        self.midi().rem_euclid(12) as u8
    }

    /// Steps above C0, used for generic (diatonic) interval sizes.
    pub fn diatonic_number(&self) -> i32 {
        self.octave as i32 * 7 + self.step.index()
    }

    pub fn accidental(&self) -> Accidental {
        match self.alter {
            0 => Accidental::Natural,
            1 => Accidental::Sharp,
            -1 => Accidental::Flat,
            2 => Accidental::DoubleSharp,
            -2 => Accidental::DoubleFlat,
            _ => Accidental::Other,
        }
    }

    /// Pitch name without octave, e.g. `C#`, `Bb`, `F##`.
    pub fn name(&self) -> String {
        let mut name = String::with_capacity(3);
        name.push(self.step.letter());
        let symbol = if self.alter > 0 { '#' } else { 'b' };
        for _ in 0..self.alter.unsigned_abs() {
            name.push(symbol);
        }
        name
    }

    /// Pitch name with octave, e.g. `C#4`.
    pub fn name_with_octave(&self) -> String {
        format!("{}{}", self.name(), self.octave)
    }
}
