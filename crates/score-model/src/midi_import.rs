//! Standard MIDI file import.
//!
//! Each track that carries notes becomes one part. Notes sharing both onset
//! and release collapse into a chord event; measures are cut using the first
//! time signature in the file (4/4 when none is present).

use std::collections::{BTreeMap, HashMap};

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

use crate::model::{Event, KeySignature, Measure, Part, Score, TimeSignature};
use crate::pitch::Pitch;
use crate::{Error, Result};

const DEFAULT_PPQ: u16 = 480;

#[derive(Debug, Clone)]
struct TrackNote {
    onset: u64,
    offset: u64,
    key: u8,
    velocity: u8,
}

#[derive(Debug, Default)]
struct TrackNotes {
    name: Option<String>,
    notes: Vec<TrackNote>,
}

/// Parse Standard MIDI file bytes.
pub fn parse_midi(data: &[u8]) -> Result<Score> {
    let smf = Smf::parse(data).map_err(|e| Error::InvalidScore(format!("invalid MIDI: {e}")))?;
    let ppq = match smf.header.timing {
        Timing::Metrical(ticks) => ticks.as_int().max(1),
        Timing::Timecode(_, _) => DEFAULT_PPQ,
    };

    let mut time_signatures: Vec<(u64, TimeSignature)> = Vec::new();
    let mut key_signature: Option<KeySignature> = None;
    let mut tracks = Vec::new();

    for track in &smf.tracks {
        let mut current_tick: u64 = 0;
        let mut parsed = TrackNotes::default();
        // (channel, key) -> stacked (onset, velocity) for overlapping notes
        let mut pending: HashMap<(u8, u8), Vec<(u64, u8)>> = HashMap::new();

        for event in track {
            current_tick += event.delta.as_int() as u64;
            match event.kind {
                TrackEventKind::Meta(MetaMessage::TrackName(bytes)) => {
                    let name = String::from_utf8_lossy(bytes).trim().to_string();
                    if !name.is_empty() {
                        parsed.name = Some(name);
                    }
                }
                TrackEventKind::Meta(MetaMessage::TimeSignature(num, denom_pow, _, _)) => {
                    if num > 0 && denom_pow < 8 {
                        time_signatures
                            .push((current_tick, TimeSignature::new(num, 1u8 << denom_pow)));
                    }
                }
                TrackEventKind::Meta(MetaMessage::KeySignature(fifths, minor)) => {
                    if key_signature.is_none() {
                        key_signature = Some(KeySignature { fifths, minor });
                    }
                }
                TrackEventKind::Midi { channel, message } => {
                    let ch = channel.as_int();
                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            pending
                                .entry((ch, key.as_int()))
                                .or_default()
                                .push((current_tick, vel.as_int()));
                        }
                        MidiMessage::NoteOff { key, .. } | MidiMessage::NoteOn { key, .. } => {
                            let slot = (ch, key.as_int());
                            if let Some((onset, velocity)) =
                                pending.get_mut(&slot).and_then(|stack| stack.pop())
                            {
                                parsed.notes.push(TrackNote {
                                    onset,
                                    offset: current_tick,
                                    key: slot.1,
                                    velocity,
                                });
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        // Notes still held at the end of the track close there.
        for ((_, key), stack) in pending {
            for (onset, velocity) in stack {
                parsed.notes.push(TrackNote {
                    onset,
                    offset: current_tick,
                    key,
                    velocity,
                });
            }
        }

        if !parsed.notes.is_empty() {
            tracks.push(parsed);
        }
    }

    time_signatures.sort_by_key(|(tick, _)| *tick);
    let bar = time_signatures
        .first()
        .map(|(_, signature)| *signature)
        .unwrap_or_default();
    let bar_ticks = (ppq as u64 * 4 * bar.numerator as u64 / bar.denominator.max(1) as u64).max(1);
    let end_tick = tracks
        .iter()
        .flat_map(|track| track.notes.iter().map(|note| note.offset.max(note.onset + 1)))
        .max()
        .unwrap_or(0);
    let measure_count = end_tick.div_ceil(bar_ticks).max(1);

    let parts = tracks
        .into_iter()
        .enumerate()
        .map(|(index, track)| build_part(index, track, ppq, bar_ticks, measure_count))
        .collect();

    tracing::debug!(ppq, measures = measure_count, "parsed MIDI");

    let mut score = Score::new("Untitled", parts)?
        .with_time_signatures(time_signatures.into_iter().map(|(_, signature)| signature));
    if let Some(key_signature) = key_signature {
        score = score.with_key_signature(key_signature);
    }
    Ok(score)
}

fn build_part(index: usize, track: TrackNotes, ppq: u16, bar_ticks: u64, measure_count: u64) -> Part {
    let quarters = |ticks: u64| ticks as f64 / ppq as f64;

    // Group by (onset, release) so struck-together notes become chords.
    let mut groups: BTreeMap<(u64, u64), Vec<(u8, u8)>> = BTreeMap::new();
    for note in &track.notes {
        groups
            .entry((note.onset, note.offset))
            .or_default()
            .push((note.key, note.velocity));
    }

    let mut measures: Vec<Measure> = (0..measure_count)
        .map(|m| Measure::new(m as u32 + 1, quarters(m * bar_ticks), quarters(bar_ticks)))
        .collect();

    for ((onset, offset), mut members) in groups {
        members.sort_by_key(|(key, _)| *key);
        members.dedup_by_key(|(key, _)| *key);
        let velocity = members.first().map(|(_, vel)| *vel).unwrap_or_default();
        let measure_index = ((onset / bar_ticks) as usize).min(measures.len() - 1);
        let start = quarters(onset - measure_index as u64 * bar_ticks);
        let duration = quarters(offset.saturating_sub(onset));

        let mut pitches: Vec<Pitch> = members.iter().map(|(key, _)| Pitch::from_midi(*key)).collect();
        let event = if pitches.len() == 1 {
            Event::note(start, duration, pitches.remove(0))
        } else {
            Event::chord(start, duration, pitches)
        };
        measures[measure_index].push(event.with_velocity(velocity));
    }

    let mut part = Part::new(format!("T{}", index + 1)).with_measures(measures);
    part.name = track.name;
    part
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_invalid() {
        let err = parse_midi(b"MThd\x00").unwrap_err();
        assert!(matches!(err, Error::InvalidScore(_)));
    }
}
