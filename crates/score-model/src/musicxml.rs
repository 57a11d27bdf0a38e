//! MusicXML (`score-partwise`) and compressed MXL import.

use std::collections::HashMap;
use std::io::Read;

use roxmltree::{Document, Node, ParsingOptions};
use zip::ZipArchive;

use crate::model::{Event, KeySignature, Measure, Part, Score, TimeSignature};
use crate::pitch::{Pitch, Step};
use crate::{Error, Result};

const DEFAULT_TITLE: &str = "Untitled";

/// Exported MusicXML nearly always carries a `<!DOCTYPE score-partwise ...>`.
fn parse_document(xml: &str) -> std::result::Result<Document<'_>, roxmltree::Error> {
    Document::parse_with_options(
        xml,
        ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        },
    )
}

/// Parse an uncompressed MusicXML document.
pub fn parse_musicxml(xml: &str) -> Result<Score> {
    let doc = parse_document(xml).map_err(|e| Error::InvalidScore(e.to_string()))?;
    let root = doc.root_element();
    if root.has_tag_name("score-timewise") {
        return Err(Error::InvalidScore(
            "timewise MusicXML is not supported".to_string(),
        ));
    }
    if !root.has_tag_name("score-partwise") {
        return Err(Error::InvalidScore(format!(
            "unexpected root element <{}>",
            root.tag_name().name()
        )));
    }

    let headers = read_part_list(&root);
    let mut key_signature = None;
    let mut time_signatures = Vec::new();
    let mut parts = Vec::new();

    for part_node in root
        .children()
        .filter(|node| node.is_element() && node.has_tag_name("part"))
    {
        let id = part_node.attribute("id").unwrap_or_default().to_string();
        let mut part = Part::new(id.clone());
        if let Some(header) = headers.get(&id) {
            part.name = header.name.clone();
            part.instrument = header.instrument.clone();
        }
        let reader = PartReader::read(&part_node);
        if key_signature.is_none() {
            key_signature = reader.key_signature;
        }
        time_signatures.extend(reader.time_signatures);
        part.measures = reader.measures;
        parts.push(part);
    }

    let title = read_title(&root);
    tracing::debug!(title = %title, parts = parts.len(), "parsed MusicXML");

    let mut score = Score::new(title, parts)?.with_time_signatures(time_signatures);
    if let Some(key_signature) = key_signature {
        score = score.with_key_signature(key_signature);
    }
    Ok(score)
}

/// Parse a compressed `.mxl` archive.
pub fn parse_mxl(data: &[u8]) -> Result<Score> {
    let xml = read_mxl_archive(data)?;
    parse_musicxml(&xml)
}

#[derive(Debug, Default)]
struct PartHeader {
    name: Option<String>,
    instrument: Option<String>,
}

fn read_part_list(root: &Node) -> HashMap<String, PartHeader> {
    let mut headers = HashMap::new();
    let Some(part_list) = child(root, "part-list") else {
        return headers;
    };
    for score_part in part_list
        .children()
        .filter(|node| node.is_element() && node.has_tag_name("score-part"))
    {
        let Some(id) = score_part.attribute("id") else {
            continue;
        };
        let name = child_text(&score_part, "part-name")
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        let instrument = child(&score_part, "score-instrument")
            .and_then(|node| child_text(&node, "instrument-name"))
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        headers.insert(id.to_string(), PartHeader { name, instrument });
    }
    headers
}

/// `credit[credit-type=title]`, then `work-title`, then `movement-title`.
fn read_title(root: &Node) -> String {
    let credit_title = root
        .children()
        .filter(|node| node.is_element() && node.has_tag_name("credit"))
        .find(|credit| child_text(credit, "credit-type") == Some("title"))
        .and_then(|credit| child_text(&credit, "credit-words"));
    let work_title = child(root, "work").and_then(|work| child_text(&work, "work-title"));
    let movement_title = child_text(root, "movement-title");

    credit_title
        .or(work_title)
        .or(movement_title)
        .filter(|text| !text.is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_string()
}

/// Walks one `<part>` element, tracking the divisions, time signature and
/// dynamics state that carry across measures.
struct PartReader {
    measures: Vec<Measure>,
    key_signature: Option<KeySignature>,
    time_signatures: Vec<TimeSignature>,
    divisions: f64,
    time: TimeSignature,
    velocity: Option<u8>,
}

impl PartReader {
    fn read(part: &Node) -> Self {
        let mut reader = Self {
            measures: Vec::new(),
            key_signature: None,
            time_signatures: Vec::new(),
            divisions: 1.0,
            time: TimeSignature::default(),
            velocity: None,
        };
        let mut offset = 0.0;
        for measure in part
            .children()
            .filter(|node| node.is_element() && node.has_tag_name("measure"))
        {
            let number = reader.measures.len() as u32 + 1;
            let parsed = reader.read_measure(&measure, number, offset);
            offset += parsed.duration;
            reader.measures.push(parsed);
        }
        reader
    }

    fn read_measure(&mut self, node: &Node, number: u32, offset: f64) -> Measure {
        let implicit = node
            .attribute("implicit")
            .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "yes" | "true"));
        let mut measure = Measure::new(number, offset, 0.0);
        let mut cursor: f64 = 0.0;
        let mut furthest: f64 = 0.0;
        let mut last_sounding: Option<usize> = None;

        for element in node.children().filter(|n| n.is_element()) {
            match element.tag_name().name() {
                "attributes" => self.read_attributes(&element),
                "direction" => self.read_direction(&element),
                "sound" => self.read_sound(&element),
                "barline" => read_barline(&element, &mut measure),
                "backup" => {
                    cursor = (cursor - self.duration_of(&element)).max(0.0);
                    last_sounding = None;
                }
                "forward" => {
                    cursor += self.duration_of(&element);
                    furthest = furthest.max(cursor);
                    last_sounding = None;
                }
                "note" => {
                    if child(&element, "grace").is_some() {
                        continue;
                    }
                    let is_chord = child(&element, "chord").is_some();
                    let mut duration = self.duration_of(&element);
                    if duration <= 0.0 {
                        duration = infer_note_duration(&element).unwrap_or(0.0);
                    }
                    let pitch = read_pitch(&element);

                    match (is_chord, pitch, last_sounding) {
                        (true, Some(pitch), Some(index)) => {
                            measure.events[index].stack(pitch);
                        }
                        (_, Some(pitch), _) => {
                            let mut event = Event::note(cursor, duration, pitch);
                            event.velocity = self.velocity;
                            last_sounding = Some(measure.events.len());
                            measure.events.push(event);
                        }
                        (true, None, _) => {}
                        (false, None, _) => {
                            measure.events.push(Event::rest(cursor, duration));
                            last_sounding = None;
                        }
                    }

                    if !is_chord {
                        cursor += duration;
                        furthest = furthest.max(cursor);
                    }
                }
                _ => {}
            }
        }

        let bar_length = self.time.bar_length();
        measure.duration = if implicit || bar_length <= 0.0 {
            furthest
        } else {
            furthest.max(bar_length)
        };
        measure
    }

    fn read_attributes(&mut self, node: &Node) {
        if let Some(divisions) = child_text(node, "divisions").and_then(|t| t.parse::<f64>().ok()) {
            if divisions > 0.0 {
                self.divisions = divisions;
            } else {
                tracing::warn!(divisions, "ignoring non-positive divisions");
            }
        }
        if let Some(key) = child(node, "key") {
            if let Some(fifths) = child_text(&key, "fifths").and_then(|t| t.parse::<i8>().ok()) {
                let minor = child_text(&key, "mode") == Some("minor");
                if self.key_signature.is_none() {
                    self.key_signature = Some(KeySignature { fifths, minor });
                }
            }
        }
        if let Some(time) = child(node, "time") {
            let beats = child_text(&time, "beats").and_then(parse_beats);
            let beat_type = child_text(&time, "beat-type").and_then(|t| t.parse::<u8>().ok());
            if let (Some(beats), Some(beat_type)) = (beats, beat_type) {
                if beats > 0 && beat_type > 0 {
                    self.time = TimeSignature::new(beats, beat_type);
                    self.time_signatures.push(self.time);
                }
            }
        }
    }

    fn read_direction(&mut self, node: &Node) {
        if let Some(sound) = child(node, "sound") {
            self.read_sound(&sound);
        }
        for direction_type in node
            .children()
            .filter(|n| n.is_element() && n.has_tag_name("direction-type"))
        {
            if let Some(velocity) =
                parse_dynamics_mark(&direction_type).or_else(|| parse_dynamics_words(&direction_type))
            {
                self.velocity = Some(velocity);
            }
        }
    }

    fn read_sound(&mut self, sound: &Node) {
        if let Some(velocity) = sound.attribute("dynamics").and_then(parse_sound_dynamics) {
            self.velocity = Some(velocity);
        }
    }

    /// `<duration>` converted to quarter notes.
    fn duration_of(&self, node: &Node) -> f64 {
        child_text(node, "duration")
            .and_then(|text| text.parse::<f64>().ok())
            .map(|value| value.max(0.0) / self.divisions)
            .unwrap_or(0.0)
    }
}

fn read_barline(node: &Node, measure: &mut Measure) {
    let Some(repeat) = child(node, "repeat") else {
        return;
    };
    match repeat.attribute("direction") {
        Some("forward") => measure.repeat_start = true,
        Some("backward") => {
            let times = repeat
                .attribute("times")
                .and_then(|t| t.trim().parse::<u32>().ok())
                .unwrap_or(2);
            measure.repeat_end = Some(times.max(1));
        }
        _ => {}
    }
}

fn read_pitch(note: &Node) -> Option<Pitch> {
    let pitch = child(note, "pitch")?;
    let step = child_text(&pitch, "step").and_then(Step::from_letter)?;
    let octave = child_text(&pitch, "octave").and_then(|t| t.parse::<i8>().ok())?;
    let alter = child_text(&pitch, "alter")
        .and_then(|t| t.parse::<f64>().ok())
        .map(|alter| alter.round() as i8)
        .unwrap_or(0);
    Some(Pitch::new(step, alter, octave))
}

/// Duration from `<type>`, dots and tuplet ratio when `<duration>` is absent.
fn infer_note_duration(node: &Node) -> Option<f64> {
    let note_type = child_text(node, "type")?.to_ascii_lowercase();
    let mut duration = match note_type.as_str() {
        "maxima" => 32.0,
        "long" => 16.0,
        "breve" => 8.0,
        "whole" => 4.0,
        "half" => 2.0,
        "quarter" => 1.0,
        "eighth" => 0.5,
        "16th" => 0.25,
        "32nd" => 0.125,
        "64th" => 0.0625,
        "128th" => 0.031_25,
        "256th" => 0.015_625,
        _ => return None,
    };

    let dots = node
        .children()
        .filter(|n| n.is_element() && n.has_tag_name("dot"))
        .count();
    let mut add = duration / 2.0;
    for _ in 0..dots {
        duration += add;
        add /= 2.0;
    }

    if let Some(time_mod) = child(node, "time-modification") {
        let actual = child_text(&time_mod, "actual-notes").and_then(|t| t.parse::<f64>().ok());
        let normal = child_text(&time_mod, "normal-notes").and_then(|t| t.parse::<f64>().ok());
        if let (Some(actual), Some(normal)) = (actual, normal) {
            if actual > 0.0 && normal > 0.0 {
                duration = duration * normal / actual;
            }
        }
    }

    Some(duration)
}

/// Sums additive meters such as `3+2`.
fn parse_beats(text: &str) -> Option<u8> {
    let mut sum: u32 = 0;
    let mut any = false;
    for part in text.split('+') {
        if let Ok(value) = part.trim().parse::<u32>() {
            sum += value;
            any = true;
        }
    }
    any.then(|| sum.min(u8::MAX as u32) as u8)
}

/// `<sound dynamics>` is a percentage of forte (90).
fn parse_sound_dynamics(value: &str) -> Option<u8> {
    let percent = value.trim().parse::<f64>().ok()?;
    if percent < 0.0 {
        return None;
    }
    Some((percent * 90.0 / 100.0).round().clamp(0.0, 127.0) as u8)
}

fn parse_dynamics_mark(direction_type: &Node) -> Option<u8> {
    let dynamics = child(direction_type, "dynamics")?;
    for mark in dynamics.children().filter(|n| n.is_element()) {
        let name = mark.tag_name().name();
        if name == "other-dynamics" {
            if let Some(velocity) = mark.text().and_then(dynamics_velocity) {
                return Some(velocity);
            }
            continue;
        }
        if let Some(velocity) = dynamics_velocity(name) {
            return Some(velocity);
        }
    }
    None
}

fn parse_dynamics_words(direction_type: &Node) -> Option<u8> {
    direction_type
        .children()
        .filter(|n| n.is_element() && n.has_tag_name("words"))
        .filter_map(|words| words.text())
        .find_map(dynamics_velocity)
}

fn dynamics_velocity(mark: &str) -> Option<u8> {
    let mark = mark.trim().trim_end_matches('.').to_ascii_lowercase();
    let velocity = match mark.as_str() {
        "pppp" => 16,
        "ppp" => 24,
        "pp" => 34,
        "p" => 46,
        "mp" => 58,
        "mf" => 74,
        "f" => 92,
        "ff" => 108,
        "fff" => 120,
        "ffff" => 127,
        "sfz" | "sf" | "fz" => 112,
        _ => return None,
    };
    Some(velocity)
}

fn read_mxl_archive(data: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(std::io::Cursor::new(data))
        .map_err(|e| Error::InvalidScore(format!("invalid MXL archive: {e}")))?;

    let mut container = String::new();
    let has_container = match archive.by_name("META-INF/container.xml") {
        Ok(mut entry) => entry.read_to_string(&mut container).is_ok(),
        Err(_) => false,
    };

    if has_container {
        let rootfile = parse_document(&container).ok().and_then(|doc| {
            doc.descendants()
                .find(|node| node.has_tag_name("rootfile"))
                .and_then(|node| node.attribute("full-path"))
                .map(str::to_string)
        });
        if let Some(full_path) = rootfile {
            if let Ok(mut entry) = archive.by_name(&full_path) {
                let mut xml = String::new();
                entry
                    .read_to_string(&mut xml)
                    .map_err(|e| Error::InvalidScore(format!("unreadable {full_path}: {e}")))?;
                return Ok(xml);
            }
            tracing::warn!(full_path = %full_path, "MXL rootfile missing, scanning archive");
        }
    }

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| Error::InvalidScore(e.to_string()))?;
        let name = entry.name().to_string();
        if name.ends_with(".xml") && !name.starts_with("META-INF/") {
            let mut xml = String::new();
            entry
                .read_to_string(&mut xml)
                .map_err(|e| Error::InvalidScore(format!("unreadable {name}: {e}")))?;
            return Ok(xml);
        }
    }

    Err(Error::InvalidScore(
        "MXL archive has no MusicXML payload".to_string(),
    ))
}

fn child<'a, 'input>(node: &Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.has_tag_name(name))
}

fn child_text<'a>(node: &Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name).and_then(|n| n.text()).map(str::trim)
}
