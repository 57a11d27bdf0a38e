//! Plain-text score report.

use std::fmt;

use chrono::NaiveDateTime;

use crate::harmony::HarmonicReduction;
use crate::melodic::MelodicRecord;
use crate::ScoreAnalysis;

const INTERVAL_EXAMPLES: [(&str, &str); 16] = [
    ("P1", "Unison (same note repeated)"),
    ("m2", "Minor second ascending"),
    ("m-2", "Minor second descending"),
    ("M2", "Major second ascending"),
    ("M-2", "Major second descending"),
    ("m3", "Minor third ascending"),
    ("m-3", "Minor third descending"),
    ("P4", "Perfect fourth ascending"),
    ("P-4", "Perfect fourth descending"),
    ("P5", "Perfect fifth ascending"),
    ("P-5", "Perfect fifth descending"),
    ("m6", "Minor sixth ascending"),
    ("M6", "Major sixth ascending"),
    ("m-7", "Minor seventh descending"),
    ("P8", "Perfect octave ascending"),
    ("P-8", "Perfect octave descending"),
];

/// Display adapter that writes the report for an analysis.
pub struct Report<'a>(pub &'a ScoreAnalysis);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let analysis = self.0;
        let info = &analysis.general_info;

        f.write_str("=== SCORE REPORT ===\n\n")?;
        writeln!(f, "Title: {}\n", analysis.title)?;

        f.write_str(">>> GENERAL INFORMATION <<<\n")?;
        writeln!(f, "Total number of instruments: {}", info.total_instruments)?;
        f.write_str("Instruments:\n")?;
        for name in &info.instrument_names {
            writeln!(f, "- {name}")?;
        }
        writeln!(f, "\nOverall key: {}", info.overall_key)?;
        writeln!(f, "Number of measures: {}", info.total_measures)?;
        f.write_str("Time signature(s):\n")?;
        for signature in &info.time_signatures {
            writeln!(f, "- {signature}")?;
        }
        f.write_str("\nNotes per instrument:\n")?;
        for entry in &info.notes_per_instrument {
            writeln!(f, "- {}: {} notes", entry.instrument, entry.notes)?;
        }

        f.write_str("\n\n>>> MELODIC ANALYSIS <<<\n")?;
        for record in &analysis.melodic_analysis {
            write_melodic(f, record)?;
        }

        if let Some(reduction) = analysis
            .harmonic_analysis
            .as_ref()
            .filter(|r| !r.selected_instruments.is_empty())
        {
            write_harmonic(f, reduction)?;
        }

        write_legend(f)
    }
}

fn write_melodic(f: &mut fmt::Formatter<'_>, record: &MelodicRecord) -> fmt::Result {
    writeln!(f, "\nInstrument: {}", record.part)?;

    if let Some(intervals) = record.intervals.as_ref().filter(|i| !i.is_empty()) {
        f.write_str("Most common intervals:\n")?;
        for entry in intervals {
            writeln!(f, "- {}: {} times", entry.label, entry.count)?;
        }
    }

    if let Some(direction) = &record.direction {
        f.write_str("Melodic direction:\n")?;
        writeln!(f, "- Ascending: {}", direction.ascending)?;
        writeln!(f, "- Descending: {}", direction.descending)?;
        writeln!(f, "- Mean direction: {:.2}", direction.mean_direction)?;
    }

    if let Some(rhythm) = &record.rhythm {
        f.write_str("Rhythm:\n")?;
        for entry in &rhythm.values {
            writeln!(f, "- {}: {} times", entry.label, entry.count)?;
        }
        writeln!(f, "- Average density: {:.2} notes per measure", rhythm.density)?;
    }
    Ok(())
}

fn write_harmonic(f: &mut fmt::Formatter<'_>, reduction: &HarmonicReduction) -> fmt::Result {
    f.write_str("\n\n>>> HARMONIC REDUCTION ANALYSIS <<<\n")?;
    f.write_str("Selected instruments:\n")?;
    for name in &reduction.selected_instruments {
        writeln!(f, "- {name}")?;
    }
    writeln!(f, "\nReduction key: {}", reduction.reduction_key)?;
    writeln!(f, "Number of measures in reduction: {}", reduction.chord_report.len())?;

    f.write_str("\nChords per measure:\n")?;
    for measure in &reduction.chord_report {
        write!(f, "\nMeasure {}: {}", measure.measure, measure.chords.join(", "))?;
    }

    f.write_str("\n\nTonal functions per measure:\n")?;
    for measure in &reduction.chord_report {
        write!(f, "\nMeasure {}: {}", measure.measure, measure.tonal_functions.join(", "))?;
    }
    Ok(())
}

fn write_legend(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("\n\n>>> INTERVAL EXPLANATION <<<\n")?;
    f.write_str("\nMelodic intervals are represented by codes composed of a letter and a number:\n\n")?;
    f.write_str("P = Perfect\nM = Major\nm = Minor\n\n")?;
    f.write_str("Examples:\n")?;
    for (code, meaning) in INTERVAL_EXAMPLES {
        writeln!(f, "- {code} → {meaning}")?;
    }
    f.write_str("\n")?;
    f.write_str(
        "Melodic direction indicates the number of ascending and descending movements recorded, \
         as well as the general trend (mean direction):\n",
    )?;
    f.write_str("- Positive value → ascending trend\n")?;
    f.write_str("- Negative value → descending trend\n")?;
    f.write_str("- Value close to zero → no predominant trend\n")
}

/// Render the full text report.
pub fn render_report(analysis: &ScoreAnalysis) -> String {
    Report(analysis).to_string()
}

/// `Report_<Title>_<YYYY-MM-DD_HH-MM>.txt`, spaces in the title become `_`.
pub fn report_file_name(title: &str, timestamp: NaiveDateTime) -> String {
    let title = if title.trim().is_empty() { "Score" } else { title };
    format!(
        "Report_{}_{}.txt",
        title.replace(' ', "_"),
        timestamp.format("%Y-%m-%d_%H-%M")
    )
}
