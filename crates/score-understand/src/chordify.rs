use score_model::{NoteEvent, Part};

use crate::chord_templates::pitch_class_mask;

/// All pitches sounding over one stretch of a measure.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    /// Offset from the measure start, in quarter notes.
    pub onset: f64,
    pub duration: f64,
    /// Sounding notes, lowest first.
    pub notes: Vec<NoteEvent>,
}

impl Slice {
    /// Sorted, deduplicated pitch classes.
    pub fn pitch_classes(&self) -> Vec<u8> {
        let mut pcs: Vec<u8> = self.notes.iter().map(|n| n.pitch_class).collect();
        pcs.sort_unstable();
        pcs.dedup();
        pcs
    }

    pub fn pitch_class_mask(&self) -> u16 {
        pitch_class_mask(&self.pitch_classes())
    }

    pub fn bass_pitch_class(&self) -> Option<u8> {
        self.notes.first().map(|n| n.pitch_class)
    }

    pub fn midi_pitches(&self) -> Vec<u8> {
        self.notes.iter().map(|n| n.midi).collect()
    }
}

/// Chordify one measure across several parts.
///
/// The measure is cut at every note start and end; each stretch keeps the
/// notes sounding through it. Stretches with nothing sounding are rests and
/// are dropped. Parts lacking the measure contribute nothing.
pub fn chordify_measure(parts: &[&Part], measure_index: usize) -> Vec<Slice> {
    let mut notes: Vec<NoteEvent> = Vec::new();
    for part in parts {
        let Some(measure) = part.measures.get(measure_index) else {
            continue;
        };
        notes.extend(measure.note_events().into_iter().map(|mut note| {
            note.offset -= measure.offset;
            note
        }));
    }
    notes.retain(|note| note.duration > 0.0);
    if notes.is_empty() {
        return Vec::new();
    }

    let mut breakpoints: Vec<f64> = notes
        .iter()
        .flat_map(|note| [note.offset, note.end()])
        .collect();
    breakpoints.sort_by(f64::total_cmp);
    breakpoints.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

    let mut slices = Vec::new();
    for window in breakpoints.windows(2) {
        let (start, end) = (window[0], window[1]);
        let mut sounding: Vec<NoteEvent> = notes
            .iter()
            .filter(|note| note.offset <= start + 1e-9 && note.end() > start + 1e-9)
            .cloned()
            .collect();
        if sounding.is_empty() {
            continue;
        }
        sounding.sort_by_key(|note| note.midi);
        slices.push(Slice {
            onset: start,
            duration: end - start,
            notes: sounding,
        });
    }
    slices
}

#[cfg(test)]
mod tests {
    use super::*;
    use score_model::{Event, Measure, Pitch};

    fn part(events: Vec<Event>) -> Part {
        Part::new("P").with_measures(vec![Measure::new(1, 0.0, 4.0).with_events(events)])
    }

    #[test]
    fn slices_cut_at_every_boundary() {
        let upper = part(vec![
            Event::note(0.0, 2.0, Pitch::from_midi(64)),
            Event::note(2.0, 2.0, Pitch::from_midi(65)),
        ]);
        let lower = part(vec![Event::note(0.0, 4.0, Pitch::from_midi(48))]);
        let slices = chordify_measure(&[&upper, &lower], 0);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].midi_pitches(), vec![48, 64]);
        assert_eq!(slices[1].midi_pitches(), vec![48, 65]);
        assert_eq!(slices[1].onset, 2.0);
        assert_eq!(slices[0].bass_pitch_class(), Some(0));
    }

    #[test]
    fn rests_produce_no_slices() {
        let line = part(vec![
            Event::note(0.0, 1.0, Pitch::from_midi(60)),
            Event::rest(1.0, 2.0),
            Event::note(3.0, 1.0, Pitch::from_midi(62)),
        ]);
        let slices = chordify_measure(&[&line], 0);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[1].pitch_classes(), vec![2]);
    }

    #[test]
    fn missing_measure_is_empty() {
        let line = part(vec![Event::rest(0.0, 4.0)]);
        assert!(chordify_measure(&[&line], 3).is_empty());
        assert!(chordify_measure(&[&line], 0).is_empty());
    }
}
