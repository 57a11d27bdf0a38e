use pretty_assertions::assert_eq;
use score_model::{parse_bytes, parse_midi, EventKind, KeySignature};

fn write_vlq(buf: &mut Vec<u8>, mut value: u32) {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.push(((value & 0x7F) as u8) | 0x80);
        value >>= 7;
    }
    bytes.reverse();
    buf.extend_from_slice(&bytes);
}

fn push_track(buf: &mut Vec<u8>, track: &[u8]) {
    buf.extend_from_slice(b"MTrk");
    buf.extend_from_slice(&(track.len() as u32).to_be_bytes());
    buf.extend_from_slice(track);
}

fn header(tracks: u16) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"MThd");
    buf.extend_from_slice(&6u32.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes());
    buf.extend_from_slice(&tracks.to_be_bytes());
    buf.extend_from_slice(&480u16.to_be_bytes());
    buf
}

/// Conductor track in 3/4 with a one-flat key, then a named piano track:
/// a C major chord, a half-note E4 and a G4 closed by a zero-velocity note-on.
fn make_waltz_midi() -> Vec<u8> {
    let mut buf = header(2);

    let mut conductor = Vec::new();
    conductor.extend_from_slice(&[0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20]);
    conductor.extend_from_slice(&[0x00, 0xFF, 0x58, 0x04, 0x03, 0x02, 0x18, 0x08]);
    conductor.extend_from_slice(&[0x00, 0xFF, 0x59, 0x02, 0xFF, 0x00]);
    conductor.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    push_track(&mut buf, &conductor);

    let mut piano = Vec::new();
    piano.extend_from_slice(&[0x00, 0xFF, 0x03, 0x05]);
    piano.extend_from_slice(b"Piano");
    piano.extend_from_slice(&[0x00, 0x90, 60, 100]);
    piano.extend_from_slice(&[0x00, 0x90, 64, 100]);
    piano.extend_from_slice(&[0x00, 0x90, 67, 100]);
    write_vlq(&mut piano, 480);
    piano.extend_from_slice(&[0x80, 60, 0]);
    piano.extend_from_slice(&[0x00, 0x80, 64, 0]);
    piano.extend_from_slice(&[0x00, 0x80, 67, 0]);
    piano.extend_from_slice(&[0x00, 0x90, 64, 80]);
    write_vlq(&mut piano, 960);
    piano.extend_from_slice(&[0x80, 64, 0]);
    piano.extend_from_slice(&[0x00, 0x90, 67, 70]);
    write_vlq(&mut piano, 480);
    piano.extend_from_slice(&[0x90, 67, 0]);
    piano.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    push_track(&mut buf, &piano);

    buf
}

#[test]
fn tracks_with_notes_become_named_parts() {
    let score = parse_midi(&make_waltz_midi()).expect("parse");
    assert_eq!(score.part_count(), 1);
    assert_eq!(score.part_names(), vec!["Piano"]);
    assert_eq!(score.title(), "Untitled");
    assert_eq!(
        score.key_signature(),
        Some(KeySignature {
            fifths: -1,
            minor: false
        })
    );
}

#[test]
fn measures_follow_first_time_signature() {
    let score = parse_midi(&make_waltz_midi()).expect("parse");
    let labels: Vec<String> = score
        .time_signatures()
        .iter()
        .map(|t| t.ratio_string())
        .collect();
    assert_eq!(labels, vec!["3/4"]);

    let measures = &score.parts()[0].measures;
    assert_eq!(measures.len(), 2);
    assert_eq!(measures[1].offset, 3.0);
    assert_eq!(measures[1].events.len(), 1);
    assert_eq!(measures[1].events[0].offset, 0.0);
}

#[test]
fn simultaneous_notes_become_a_chord() {
    let score = parse_midi(&make_waltz_midi()).expect("parse");
    let first = &score.parts()[0].measures[0];
    match &first.events[0].kind {
        EventKind::Chord { pitches } => {
            let names: Vec<String> = pitches.iter().map(|p| p.name_with_octave()).collect();
            assert_eq!(names, vec!["C4", "E4", "G4"]);
        }
        other => panic!("expected chord, got {other:?}"),
    }
    assert_eq!(first.events[0].velocity, Some(100));
}

#[test]
fn note_durations_in_quarters() {
    let score = parse_midi(&make_waltz_midi()).expect("parse");
    let melodic: Vec<(String, f64, f64, u8)> = score.parts()[0]
        .melodic_notes()
        .iter()
        .map(|n| (n.pitch.name_with_octave(), n.offset, n.duration, n.velocity))
        .collect();
    assert_eq!(
        melodic,
        vec![
            ("E4".to_string(), 1.0, 2.0, 80),
            ("G4".to_string(), 3.0, 1.0, 70),
        ]
    );
}

#[test]
fn held_notes_close_at_track_end_with_default_meter() {
    let mut buf = header(1);
    let mut track = Vec::new();
    track.extend_from_slice(&[0x00, 0x90, 61, 90]);
    write_vlq(&mut track, 1920 * 2);
    track.extend_from_slice(&[0xFF, 0x2F, 0x00]);
    push_track(&mut buf, &track);

    let score = parse_bytes(&buf, None).expect("sniffed midi");
    let notes = score.parts()[0].note_events();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].pitch.name(), "C#");
    assert_eq!(notes[0].duration, 8.0);
    assert_eq!(score.measure_count(), 2);
    assert_eq!(score.part_names(), vec!["Part 1"]);
}

#[test]
fn midi_without_notes_is_invalid() {
    let mut buf = header(1);
    push_track(&mut buf, &[0x00, 0xFF, 0x2F, 0x00]);
    assert!(matches!(
        parse_midi(&buf),
        Err(score_model::Error::InvalidScore(_))
    ));
}
