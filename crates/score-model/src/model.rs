use serde::{Deserialize, Serialize};

use crate::pitch::Pitch;
use crate::{Error, Result};

/// Velocity assumed for events that carry no dynamics.
pub const DEFAULT_VELOCITY: u8 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl TimeSignature {
    pub fn new(numerator: u8, denominator: u8) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// `"3/4"` style label.
    pub fn ratio_string(&self) -> String {
        format!("{}/{}", self.numerator, self.denominator)
    }

    /// Bar length in quarter notes.
    pub fn bar_length(&self) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        self.numerator as f64 * 4.0 / self.denominator as f64
    }

    /// Counted beats per bar; compound meters group eighths in threes.
    pub fn beat_count(&self) -> u8 {
        let compound = self.denominator >= 8 && self.numerator > 3 && self.numerator % 3 == 0;
        if compound {
            self.numerator / 3
        } else {
            self.numerator
        }
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

/// Notated key signature as written in the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySignature {
    /// Sharps (positive) or flats (negative).
    pub fifths: i8,
    pub minor: bool,
}

impl KeySignature {
    /// Tonic pitch class implied by the signature and mode.
    pub fn tonic_pitch_class(&self) -> u8 {
        let major_tonic = (self.fifths as i32 * 7).rem_euclid(12);
        let tonic = if self.minor {
            major_tonic + 9
        } else {
            major_tonic
        };
        tonic.rem_euclid(12) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Note { pitch: Pitch },
    Chord { pitches: Vec<Pitch> },
    Rest,
}

/// One note, chord or rest, positioned relative to its measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Offset from the measure start, in quarter notes.
    pub offset: f64,
    /// Duration in quarter notes.
    pub duration: f64,
    pub velocity: Option<u8>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    pub fn note(offset: f64, duration: f64, pitch: Pitch) -> Self {
        Self {
            offset,
            duration,
            velocity: None,
            kind: EventKind::Note { pitch },
        }
    }

    pub fn chord(offset: f64, duration: f64, pitches: Vec<Pitch>) -> Self {
        Self {
            offset,
            duration,
            velocity: None,
            kind: EventKind::Chord { pitches },
        }
    }

    pub fn rest(offset: f64, duration: f64) -> Self {
        Self {
            offset,
            duration,
            velocity: None,
            kind: EventKind::Rest,
        }
    }

    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = Some(velocity.min(127));
        self
    }

    pub fn pitches(&self) -> &[Pitch] {
        match &self.kind {
            EventKind::Note { pitch } => std::slice::from_ref(pitch),
            EventKind::Chord { pitches } => pitches,
            EventKind::Rest => &[],
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self.kind, EventKind::Rest)
    }

    pub fn end(&self) -> f64 {
        self.offset + self.duration
    }

    /// Append a pitch, turning a single note into a chord.
    pub(crate) fn stack(&mut self, pitch: Pitch) {
        match &mut self.kind {
            EventKind::Note { pitch: first } => {
                self.kind = EventKind::Chord {
                    pitches: vec![*first, pitch],
                };
            }
            EventKind::Chord { pitches } => pitches.push(pitch),
            EventKind::Rest => self.kind = EventKind::Note { pitch },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// 1-based position within the part.
    pub number: u32,
    /// Absolute offset of the measure start within the part, in quarter notes.
    pub offset: f64,
    /// Length in quarter notes.
    pub duration: f64,
    pub events: Vec<Event>,
    #[serde(default)]
    pub repeat_start: bool,
    /// Total play count when the measure closes a repeat.
    #[serde(default)]
    pub repeat_end: Option<u32>,
}

impl Measure {
    pub fn new(number: u32, offset: f64, duration: f64) -> Self {
        Self {
            number,
            offset,
            duration,
            events: Vec::new(),
            repeat_start: false,
            repeat_end: None,
        }
    }

    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.events = events;
        self
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Count of note and chord events; a chord counts once.
    pub fn sounding_event_count(&self) -> usize {
        self.events.iter().filter(|e| !e.is_rest()).count()
    }

    /// Note events of this measure in document order, chords expanded.
    pub fn note_events(&self) -> Vec<NoteEvent> {
        let mut notes = Vec::new();
        for event in &self.events {
            let in_chord = matches!(event.kind, EventKind::Chord { .. });
            for pitch in event.pitches() {
                let midi = pitch.midi();
                if !(0..=127).contains(&midi) {
                    continue;
                }
                notes.push(NoteEvent {
                    pitch: *pitch,
                    midi: midi as u8,
                    pitch_class: pitch.pitch_class(),
                    offset: self.offset + event.offset,
                    duration: event.duration,
                    velocity: event.velocity.unwrap_or(DEFAULT_VELOCITY),
                    measure: self.number,
                    in_chord,
                });
            }
        }
        notes
    }
}

/// A single sounding pitch in absolute part time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub pitch: Pitch,
    pub midi: u8,
    pub pitch_class: u8,
    /// Absolute onset within the part, in quarter notes.
    pub offset: f64,
    pub duration: f64,
    pub velocity: u8,
    /// 1-based number of the measure the event starts in.
    pub measure: u32,
    /// True when the pitch belongs to a chord event.
    pub in_chord: bool,
}

impl NoteEvent {
    pub fn end(&self) -> f64 {
        self.offset + self.duration
    }
}

/// Pitch classes of a part's single-note line, index-aligned with the
/// measures they came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PitchSequence {
    pub pitch_classes: Vec<u8>,
    pub measures: Vec<u32>,
}

impl PitchSequence {
    pub fn len(&self) -> usize {
        self.pitch_classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitch_classes.is_empty()
    }

    /// Measure number of the note at `position`.
    pub fn measure_at(&self, position: usize) -> Option<u32> {
        self.measures.get(position).copied()
    }
}

impl FromIterator<(u8, u32)> for PitchSequence {
    fn from_iter<I: IntoIterator<Item = (u8, u32)>>(iter: I) -> Self {
        let (pitch_classes, measures) = iter.into_iter().unzip();
        Self {
            pitch_classes,
            measures,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: String,
    pub name: Option<String>,
    pub instrument: Option<String>,
    pub measures: Vec<Measure>,
}

impl Part {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            instrument: None,
            measures: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_measures(mut self, measures: Vec<Measure>) -> Self {
        self.measures = measures;
        self
    }

    /// Part name, or `Part {index + 1}` when the source gave none.
    pub fn display_name(&self, index: usize) -> String {
        self.label().unwrap_or_else(|| format!("Part {}", index + 1))
    }

    /// Trimmed, non-empty part name if the source provided one.
    pub fn label(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }

    pub fn measure_count(&self) -> usize {
        self.measures.len()
    }

    /// Note and chord events across all measures; a chord counts once.
    pub fn sounding_event_count(&self) -> usize {
        self.measures.iter().map(Measure::sounding_event_count).sum()
    }

    /// Flattened note events in absolute time, chords expanded.
    ///
    /// Sorted by onset; simultaneous events keep document order.
    pub fn note_events(&self) -> Vec<NoteEvent> {
        let mut notes: Vec<NoteEvent> = self.measures.iter().flat_map(Measure::note_events).collect();
        notes.sort_by(|a, b| a.offset.total_cmp(&b.offset));
        notes
    }

    /// Single-note events in document order; chord members are excluded.
    pub fn melodic_notes(&self) -> Vec<NoteEvent> {
        self.measures
            .iter()
            .flat_map(Measure::note_events)
            .filter(|note| !note.in_chord)
            .collect()
    }

    pub fn pitch_sequence(&self) -> PitchSequence {
        self.melodic_notes()
            .into_iter()
            .map(|note| (note.pitch_class, note.measure))
            .collect()
    }
}

/// A parsed, read-only score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Score {
    title: String,
    parts: Vec<Part>,
    key_signature: Option<KeySignature>,
    time_signatures: Vec<TimeSignature>,
}

impl Score {
    /// Build a score; a score without parts cannot be analyzed.
    pub fn new(title: impl Into<String>, parts: Vec<Part>) -> Result<Self> {
        if parts.is_empty() {
            return Err(Error::InvalidScore("score contains no parts".to_string()));
        }
        Ok(Self {
            title: title.into(),
            parts,
            key_signature: None,
            time_signatures: Vec::new(),
        })
    }

    pub fn with_key_signature(mut self, key_signature: KeySignature) -> Self {
        self.key_signature = Some(key_signature);
        self
    }

    /// Record time signatures in first-seen order, dropping repeats.
    pub fn with_time_signatures(mut self, signatures: impl IntoIterator<Item = TimeSignature>) -> Self {
        for signature in signatures {
            if !self.time_signatures.contains(&signature) {
                self.time_signatures.push(signature);
            }
        }
        self
    }

    pub(crate) fn replace_parts(mut self, parts: Vec<Part>) -> Self {
        self.parts = parts;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn part(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Display names of all parts, with positional fallbacks.
    pub fn part_names(&self) -> Vec<String> {
        self.parts
            .iter()
            .enumerate()
            .map(|(index, part)| part.display_name(index))
            .collect()
    }

    /// Number of measures in the first part.
    pub fn measure_count(&self) -> usize {
        self.parts.first().map(Part::measure_count).unwrap_or(0)
    }

    pub fn key_signature(&self) -> Option<KeySignature> {
        self.key_signature
    }

    pub fn time_signatures(&self) -> &[TimeSignature] {
        &self.time_signatures
    }

    pub fn first_time_signature(&self) -> Option<TimeSignature> {
        self.time_signatures.first().copied()
    }

    /// Note events of every part.
    pub fn note_events(&self) -> Vec<NoteEvent> {
        self.parts.iter().flat_map(Part::note_events).collect()
    }
}
