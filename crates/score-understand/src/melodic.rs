use score_model::{NoteEvent, Part, Pitch};
use serde::{Deserialize, Serialize};

/// Which melodic sub-features to compute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MelodicOptions {
    pub intervals: bool,
    pub direction: bool,
    pub rhythm: bool,
}

impl MelodicOptions {
    pub fn all() -> Self {
        Self {
            intervals: true,
            direction: true,
            rhythm: true,
        }
    }

    pub fn any(&self) -> bool {
        self.intervals || self.direction || self.rhythm
    }
}

/// A directed melodic interval between two spelled pitches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub semitones: i32,
    /// Directed label, e.g. `M2`, `m-3`, `P8`.
    pub label: String,
    /// Undirected label, e.g. `m3`.
    pub name: String,
}

/// Semitones above the lower note for major and perfect simple intervals.
const DIATONIC_SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

impl Interval {
    pub fn between(from: &Pitch, to: &Pitch) -> Self {
        let semitones = to.midi() - from.midi();
        let generic = to.diatonic_number() - from.diatonic_number();
        let descending = generic < 0 || (generic == 0 && semitones < 0);

        let steps = generic.abs();
        let travelled = semitones.abs();
        let simple = (steps % 7) as usize;
        let expected = DIATONIC_SEMITONES[simple] + 12 * (steps / 7);
        let delta = travelled - expected;

        let quality = if matches!(simple, 0 | 3 | 4) {
            match delta {
                0 => "P".to_string(),
                d if d > 0 => "A".repeat(d as usize),
                d => "d".repeat((-d) as usize),
            }
        } else {
            match delta {
                0 => "M".to_string(),
                -1 => "m".to_string(),
                d if d > 0 => "A".repeat(d as usize),
                d => "d".repeat((-d - 1) as usize),
            }
        };
        let number = steps + 1;
        let sign = if descending { "-" } else { "" };

        Self {
            semitones,
            label: format!("{quality}{sign}{number}"),
            name: format!("{quality}{number}"),
        }
    }
}

/// A label with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Count labels and order them most common first; equal counts keep
/// first-seen order.
pub fn count_labels<I, S>(labels: I) -> Vec<LabelCount>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts = first_seen_counts(labels);
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Count labels in first-seen order.
pub fn first_seen_counts<I, S>(labels: I) -> Vec<LabelCount>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: Vec<LabelCount> = Vec::new();
    for label in labels {
        let label = label.as_ref();
        match counts.iter_mut().find(|c| c.label == label) {
            Some(entry) => entry.count += 1,
            None => counts.push(LabelCount {
                label: label.to_string(),
                count: 1,
            }),
        }
    }
    counts
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionSummary {
    pub ascending: usize,
    pub descending: usize,
    /// `(ascending - descending) / (ascending + descending)`, 0 without moves.
    pub mean_direction: f64,
}

impl DirectionSummary {
    pub fn from_intervals(intervals: &[Interval]) -> Self {
        let ascending = intervals.iter().filter(|i| i.semitones > 0).count();
        let descending = intervals.iter().filter(|i| i.semitones < 0).count();
        let moves = ascending + descending;
        let mean_direction = if moves > 0 {
            (ascending as f64 - descending as f64) / moves as f64
        } else {
            0.0
        };
        Self {
            ascending,
            descending,
            mean_direction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RhythmValue {
    #[serde(rename = "Whole Note")]
    Whole,
    #[serde(rename = "Half Note")]
    Half,
    #[serde(rename = "Quarter Note")]
    Quarter,
    #[serde(rename = "Eighth Note")]
    Eighth,
    #[serde(rename = "Sixteenth Note")]
    Sixteenth,
    #[serde(rename = "Smaller value")]
    Smaller,
}

impl RhythmValue {
    /// Bucket a duration in quarter notes by inclusive lower bounds.
    pub fn classify(duration: f64) -> Self {
        if duration >= 4.0 {
            RhythmValue::Whole
        } else if duration >= 2.0 {
            RhythmValue::Half
        } else if duration >= 1.0 {
            RhythmValue::Quarter
        } else if duration >= 0.5 {
            RhythmValue::Eighth
        } else if duration >= 0.25 {
            RhythmValue::Sixteenth
        } else {
            RhythmValue::Smaller
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RhythmValue::Whole => "Whole Note",
            RhythmValue::Half => "Half Note",
            RhythmValue::Quarter => "Quarter Note",
            RhythmValue::Eighth => "Eighth Note",
            RhythmValue::Sixteenth => "Sixteenth Note",
            RhythmValue::Smaller => "Smaller value",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmSummary {
    pub values: Vec<LabelCount>,
    pub total_notes: usize,
    pub total_measures: usize,
    /// Notes per measure, 0 when the part has no measures.
    pub density: f64,
}

impl RhythmSummary {
    pub fn from_notes(notes: &[NoteEvent], total_measures: usize) -> Self {
        let values = count_labels(notes.iter().map(|n| RhythmValue::classify(n.duration).label()));
        let density = if total_measures > 0 {
            notes.len() as f64 / total_measures as f64
        } else {
            0.0
        };
        Self {
            values,
            total_notes: notes.len(),
            total_measures,
            density,
        }
    }
}

/// Melodic features of one part; unselected features are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MelodicRecord {
    pub part: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intervals: Option<Vec<LabelCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<DirectionSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rhythm: Option<RhythmSummary>,
}

/// Directed intervals between consecutive single notes.
pub fn melodic_intervals(notes: &[NoteEvent]) -> Vec<Interval> {
    notes
        .windows(2)
        .map(|pair| Interval::between(&pair[0].pitch, &pair[1].pitch))
        .collect()
}

/// Extract interval, direction and rhythm features from a part's melodic line.
pub fn analyze_part(part: &Part, index: usize, options: MelodicOptions) -> MelodicRecord {
    let notes = part.melodic_notes();
    let intervals = if options.intervals || options.direction {
        melodic_intervals(&notes)
    } else {
        Vec::new()
    };

    MelodicRecord {
        part: part.display_name(index),
        intervals: options
            .intervals
            .then(|| count_labels(intervals.iter().map(|i| i.label.as_str()))),
        direction: options
            .direction
            .then(|| DirectionSummary::from_intervals(&intervals)),
        rhythm: options
            .rhythm
            .then(|| RhythmSummary::from_notes(&notes, part.measure_count())),
    }
}
