//! Symbolic score model for scorelens.
//!
//! Parses MusicXML (plain or compressed `.mxl`) and Standard MIDI files into a
//! uniform, read-only [`Score`]: parts, measures and note/chord/rest events
//! anchored in quarter-note time. Everything downstream consumes this model
//! rather than any file format.
//!
//! ```no_run
//! let score = score_model::load_score("chorale.musicxml".as_ref()).unwrap();
//! for (index, part) in score.parts().iter().enumerate() {
//!     println!("{}: {} notes", part.display_name(index), part.note_events().len());
//! }
//! ```

pub mod midi_import;
pub mod model;
pub mod musicxml;
pub mod pitch;
pub mod repeats;

use std::path::{Path, PathBuf};

pub use midi_import::parse_midi;
pub use model::{
    Event, EventKind, KeySignature, Measure, NoteEvent, Part, PitchSequence, Score,
    TimeSignature, DEFAULT_VELOCITY,
};
pub use musicxml::{parse_musicxml, parse_mxl};
pub use pitch::{pitch_class_name, Accidental, Pitch, Step};

/// Errors from loading or modeling a score.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input could not be modeled as a score (bad syntax, no parts, ...).
    #[error("invalid score: {0}")]
    InvalidScore(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Load a score from disk, choosing the parser from the file extension.
pub fn load_score(path: &Path) -> Result<Score> {
    let data = std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    tracing::debug!(path = %path.display(), bytes = data.len(), "loading score");
    parse_bytes(&data, extension.as_deref())
}

/// Parse score bytes with an optional extension hint.
///
/// Without a hint the content is sniffed: MIDI header, then XML text, then
/// a zip archive.
pub fn parse_bytes(data: &[u8], extension: Option<&str>) -> Result<Score> {
    match extension {
        Some("mxl") => parse_mxl(data),
        Some("mid") | Some("midi") => parse_midi(data),
        Some("musicxml") | Some("xml") => parse_musicxml(as_utf8(data)?),
        _ => {
            if data.starts_with(b"MThd") {
                return parse_midi(data);
            }
            if data.starts_with(b"PK") {
                return parse_mxl(data);
            }
            parse_musicxml(as_utf8(data)?)
        }
    }
}

fn as_utf8(data: &[u8]) -> Result<&str> {
    std::str::from_utf8(data)
        .map_err(|e| Error::InvalidScore(format!("MusicXML is not valid UTF-8: {e}")))
}
