use std::io::Write;

use pretty_assertions::assert_eq;
use score_model::{load_score, parse_bytes, parse_musicxml, parse_mxl, EventKind, KeySignature};

const DUET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="3.1">
  <work><work-title>Work Title</work-title></work>
  <credit page="1">
    <credit-type>title</credit-type>
    <credit-words>Little Duet</credit-words>
  </credit>
  <part-list>
    <score-part id="P1">
      <part-name>Flute</part-name>
      <score-instrument id="P1-I1"><instrument-name>Flute</instrument-name></score-instrument>
    </score-part>
    <score-part id="P2"><part-name></part-name></score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes>
        <divisions>2</divisions>
        <key><fifths>-1</fifths><mode>major</mode></key>
        <time><beats>3</beats><beat-type>4</beat-type></time>
      </attributes>
      <direction><direction-type><dynamics><f/></dynamics></direction-type></direction>
      <note><pitch><step>F</step><octave>4</octave></pitch><duration>2</duration><type>quarter</type></note>
      <note><pitch><step>B</step><alter>-1</alter><octave>4</octave></pitch><duration>2</duration></note>
      <note><rest/><duration>2</duration></note>
    </measure>
    <measure number="2">
      <note><grace/><pitch><step>D</step><octave>5</octave></pitch><type>eighth</type></note>
      <note><pitch><step>C</step><octave>5</octave></pitch><duration>6</duration></note>
    </measure>
  </part>
  <part id="P2">
    <measure number="1">
      <attributes><divisions>1</divisions></attributes>
      <note><pitch><step>F</step><octave>3</octave></pitch><duration>3</duration></note>
      <note><chord/><pitch><step>A</step><octave>3</octave></pitch><duration>3</duration></note>
      <note><chord/><pitch><step>C</step><octave>4</octave></pitch><duration>3</duration></note>
    </measure>
    <measure number="2">
      <note><pitch><step>C</step><octave>3</octave></pitch><duration>3</duration></note>
    </measure>
  </part>
</score-partwise>
"#;

#[test]
fn reads_title_names_and_signatures() {
    let score = parse_musicxml(DUET).expect("parse");
    assert_eq!(score.title(), "Little Duet");
    assert_eq!(score.part_names(), vec!["Flute", "Part 2"]);
    assert_eq!(score.parts()[0].instrument.as_deref(), Some("Flute"));
    assert_eq!(score.measure_count(), 2);
    assert_eq!(
        score.key_signature(),
        Some(KeySignature {
            fifths: -1,
            minor: false
        })
    );
    let signatures: Vec<String> = score
        .time_signatures()
        .iter()
        .map(|t| t.ratio_string())
        .collect();
    assert_eq!(signatures, vec!["3/4"]);
}

#[test]
fn divisions_convert_to_quarter_offsets() {
    let score = parse_musicxml(DUET).expect("parse");
    let flute = score.parts()[0].note_events();
    let timeline: Vec<(String, f64, f64)> = flute
        .iter()
        .map(|n| (n.pitch.name_with_octave(), n.offset, n.duration))
        .collect();
    assert_eq!(
        timeline,
        vec![
            ("F4".to_string(), 0.0, 1.0),
            ("Bb4".to_string(), 1.0, 1.0),
            ("C5".to_string(), 3.0, 3.0),
        ]
    );
}

#[test]
fn dynamics_become_velocity() {
    let score = parse_musicxml(DUET).expect("parse");
    let flute = score.parts()[0].note_events();
    assert!(flute.iter().all(|n| n.velocity == 92));
    let bass = score.parts()[1].note_events();
    assert!(bass.iter().all(|n| n.velocity == 64));
}

#[test]
fn chord_elements_stack_into_one_event() {
    let score = parse_musicxml(DUET).expect("parse");
    let first = &score.parts()[1].measures[0];
    assert_eq!(first.events.len(), 1);
    match &first.events[0].kind {
        EventKind::Chord { pitches } => {
            let names: Vec<String> = pitches.iter().map(|p| p.name_with_octave()).collect();
            assert_eq!(names, vec!["F3", "A3", "C4"]);
        }
        other => panic!("expected chord, got {other:?}"),
    }
    assert_eq!(score.parts()[1].sounding_event_count(), 2);
}

#[test]
fn grace_notes_are_skipped() {
    let score = parse_musicxml(DUET).expect("parse");
    let second = &score.parts()[0].measures[1];
    assert_eq!(second.events.len(), 1);
    assert_eq!(second.offset, 3.0);
}

#[test]
fn backup_aligns_second_voice() {
    let xml = r#"
<score-partwise version="3.1">
  <part-list><score-part id="P1"><part-name>Piano</part-name></score-part></part-list>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions></attributes>
      <note><pitch><step>E</step><octave>5</octave></pitch><duration>4</duration><voice>1</voice></note>
      <backup><duration>4</duration></backup>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>2</duration><voice>2</voice></note>
      <note><pitch><step>G</step><octave>3</octave></pitch><duration>2</duration><voice>2</voice></note>
    </measure>
  </part>
</score-partwise>
"#;
    let score = parse_musicxml(xml).expect("parse");
    let onsets: Vec<(i32, f64)> = score.parts()[0]
        .note_events()
        .iter()
        .map(|n| (n.midi as i32, n.offset))
        .collect();
    assert_eq!(onsets, vec![(76, 0.0), (60, 0.0), (55, 2.0)]);
}

#[test]
fn repeat_barlines_are_recorded() {
    let xml = r#"
<score-partwise version="3.1">
  <movement-title>Round</movement-title>
  <part-list><score-part id="P1"/></part-list>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions></attributes>
      <barline location="left"><repeat direction="forward"/></barline>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration></note>
    </measure>
    <measure number="2">
      <note><pitch><step>D</step><octave>4</octave></pitch><duration>4</duration></note>
      <barline location="right"><repeat direction="backward"/></barline>
    </measure>
  </part>
</score-partwise>
"#;
    let score = parse_musicxml(xml).expect("parse");
    assert_eq!(score.title(), "Round");
    assert_eq!(score.part_names(), vec!["Part 1"]);
    let measures = &score.parts()[0].measures;
    assert!(measures[0].repeat_start);
    assert_eq!(measures[1].repeat_end, Some(2));

    let expanded = score.expand_repeats();
    assert_eq!(expanded.measure_count(), 4);
}

#[test]
fn untitled_when_no_title_elements() {
    let xml = r#"<score-partwise><part-list/><part id="P1"><measure/></part></score-partwise>"#;
    let score = parse_musicxml(xml).expect("parse");
    assert_eq!(score.title(), "Untitled");
}

#[test]
fn malformed_xml_is_invalid_score() {
    let err = parse_musicxml("<score-partwise><part>").unwrap_err();
    assert!(matches!(err, score_model::Error::InvalidScore(_)));
}

const WITH_DOCTYPE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 4.0 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="4.0">
  <movement-title>Exported Sketch</movement-title>
  <part-list><score-part id="P1"><part-name>Violin</part-name></score-part></part-list>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions></attributes>
      <note><pitch><step>G</step><octave>4</octave></pitch><duration>4</duration></note>
    </measure>
  </part>
</score-partwise>
"#;

#[test]
fn doctype_declaration_is_accepted() {
    let score = parse_musicxml(WITH_DOCTYPE).expect("doctype should parse");
    assert_eq!(score.title(), "Exported Sketch");
    assert_eq!(score.part_names(), vec!["Violin"]);
    let notes = score.parts()[0].note_events();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].midi, 67);
}

#[test]
fn mxl_container_with_doctype_is_followed() {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    writer.start_file("META-INF/container.xml", options).unwrap();
    writer
        .write_all(
            br#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE container>
<container><rootfiles><rootfile full-path="sketch.musicxml"/></rootfiles></container>"#,
        )
        .unwrap();
    writer.start_file("decoy.xml", options).unwrap();
    writer.write_all(DUET.as_bytes()).unwrap();
    writer.start_file("sketch.musicxml", options).unwrap();
    writer.write_all(WITH_DOCTYPE.as_bytes()).unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let score = parse_mxl(&bytes).expect("mxl");
    assert_eq!(score.title(), "Exported Sketch");
}

#[test]
fn mxl_archive_follows_container_rootfile() {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    writer.start_file("META-INF/container.xml", options).unwrap();
    writer
        .write_all(
            br#"<container><rootfiles><rootfile full-path="music/duet.xml"/></rootfiles></container>"#,
        )
        .unwrap();
    writer.start_file("music/duet.xml", options).unwrap();
    writer.write_all(DUET.as_bytes()).unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let score = parse_mxl(&bytes).expect("mxl");
    assert_eq!(score.title(), "Little Duet");

    let sniffed = parse_bytes(&bytes, None).expect("sniffed");
    assert_eq!(sniffed.part_count(), 2);
}

#[test]
fn load_score_dispatches_on_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("duet.musicxml");
    std::fs::write(&path, DUET).unwrap();

    let score = load_score(&path).expect("load");
    assert_eq!(score.part_count(), 2);
}
