//! scorecli - score analysis from the command line
//!
//! Subcommands:
//! - `scorecli info <file>` - Title, instruments, key and meter
//! - `scorecli analyze <file>` - Melodic features and harmonic reduction
//! - `scorecli advanced <file> <type>` - One advanced analysis pass
//! - `scorecli symmetry <file>` - Retrograde/inversion symmetry of a part
//! - `scorecli piano-roll <file>` - Notes of every part in absolute time
//! - `scorecli compare <file> --parts 0,1` - Selected parts side by side
//! - `scorecli narrative <file> --prompt ...` - Prepare an AI narrative request
//! - `scorecli config` - Show the effective configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use score_understand::{MelodicOptions, ScoreUnderstandingEngine};
use scoreconf::ScoreConfig;
use tracing::debug;

mod commands;

#[derive(Parser)]
#[command(name = "scorecli")]
#[command(about = "Melodic, harmonic and structural analysis of MusicXML and MIDI scores")]
#[command(version)]
struct Cli {
    /// Config file used instead of ./scorelens.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter (overrides telemetry.log_level)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Title, instruments, overall key and time signatures
    Info {
        /// MusicXML, MXL or MIDI file
        file: PathBuf,
    },

    /// Melodic analysis of every part plus an optional harmonic reduction
    Analyze {
        file: PathBuf,

        /// Part indices for the harmonic reduction (e.g. 0,1)
        #[arg(short, long, value_delimiter = ',')]
        parts: Vec<usize>,

        /// Interval counts
        #[arg(long)]
        intervals: bool,

        /// Ascending/descending motion
        #[arg(long)]
        direction: bool,

        /// Rhythmic values and density
        #[arg(long)]
        rhythm: bool,

        /// Print the text report instead of JSON
        #[arg(long)]
        report: bool,

        /// Also save the text report in this directory
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Run one advanced analysis pass
    Advanced {
        file: PathBuf,

        /// cadences, modulation, voice_leading, dissonance, harmonic_functions,
        /// phrase_structure, texture_advanced, chromatic_analysis, symmetry, statistics
        analysis: String,
    },

    /// Retrograde, inversion and retrograde-inversion similarity of one part
    Symmetry {
        file: PathBuf,

        /// Part index
        #[arg(short, long, default_value = "0")]
        part: usize,

        /// tonal or serial (default from config)
        #[arg(short, long)]
        mode: Option<String>,

        /// Inversion axis pitch class (default: estimated tonic)
        #[arg(short, long)]
        tonic: Option<u8>,
    },

    /// Every part's notes in absolute time, repeats expanded
    PianoRoll { file: PathBuf },

    /// Notes of selected parts side by side
    Compare {
        file: PathBuf,

        /// Part indices (e.g. 0,2)
        #[arg(short, long, value_delimiter = ',', required = true)]
        parts: Vec<usize>,
    },

    /// Prepare a chat completion asking for a narrative analysis
    Narrative {
        file: PathBuf,

        /// What the analysis should focus on
        #[arg(long)]
        prompt: String,

        /// local or remote (default from config)
        #[arg(long)]
        agent: Option<String>,
    },

    /// Show the effective configuration and where it came from
    Config,
}

fn init_tracing(filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) =
        ScoreConfig::load_with_sources_from(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(cli.log_level.as_deref().unwrap_or(&config.telemetry.log_level));
    debug!(files = ?sources.files, env = ?sources.env_overrides, "configuration loaded");

    let engine = ScoreUnderstandingEngine::new(commands::engine_options(&config)?);

    let output = match cli.command {
        Commands::Info { file } => commands::overview(&engine, &file)?,
        Commands::Analyze {
            file,
            parts,
            intervals,
            direction,
            rhythm,
            report,
            save,
        } => commands::analyze(
            &engine,
            &file,
            commands::AnalyzeArgs {
                parts,
                melodic: MelodicOptions {
                    intervals,
                    direction,
                    rhythm,
                },
                report,
                save_dir: save,
            },
        )?,
        Commands::Advanced { file, analysis } => commands::advanced(&engine, &file, &analysis)?,
        Commands::Symmetry {
            file,
            part,
            mode,
            tonic,
        } => commands::symmetry(&engine, &file, part, mode.as_deref(), tonic)?,
        Commands::PianoRoll { file } => commands::piano_roll(&engine, &file)?,
        Commands::Compare { file, parts } => commands::compare(&engine, &file, &parts)?,
        Commands::Narrative {
            file,
            prompt,
            agent,
        } => commands::narrative(&engine, &config, &file, &prompt, agent.as_deref())?,
        Commands::Config => commands::show_config(&config, &sources),
    };

    println!("{output}");
    Ok(())
}
