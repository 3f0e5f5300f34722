//! chordsplit - spread MIDI chords across channels
//!
//! Reads a Standard MIDI File, moves every chord note onto its own channel
//! playing the chord's instrument, and writes the result next to the input.

use anyhow::{bail, Context, Result};
use chordconf::{ConfigSources, SplitConfig};
use chordsplit::{split_midi, ChordSettings};
use clap::Parser;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "chordsplit")]
#[command(about = "Split MIDI chords so each note plays on its own channel")]
#[command(version)]
struct Cli {
    /// Standard MIDI File to read
    #[arg(short, long, default_value = "./input.mid")]
    input: PathBuf,

    /// Where to write the result (default: input path plus the configured suffix)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum start distance in ticks for notes to form a chord
    #[arg(long)]
    tolerance: Option<u64>,

    /// Smallest number of simultaneous notes treated as a chord
    #[arg(long)]
    min_notes: Option<usize>,

    /// Config file to use instead of ./chordsplit.toml
    #[arg(short, long, env = "CHORDSPLIT_CONFIG")]
    config: Option<PathBuf>,

    /// Plan the split without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Print the split report as JSON on stdout
    #[arg(long)]
    report: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = load_config(&cli)?;
    init_logging(&config.logging.level);
    debug!(
        files = ?sources.files,
        env = ?sources.env_overrides,
        "configuration loaded"
    );

    if cli.print_config {
        print!("{}", config.to_toml());
        return Ok(());
    }

    run(&cli, &config)
}

/// Config files and environment first, then command line flags on top.
fn load_config(cli: &Cli) -> Result<(SplitConfig, ConfigSources)> {
    let (mut config, sources) = SplitConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    if let Some(tolerance) = cli.tolerance {
        config.chords.tolerance_ticks = tolerance;
    }
    if let Some(min_notes) = cli.min_notes {
        config.chords.min_notes = min_notes;
    }
    config.validate()?;

    Ok((config, sources))
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // stdout is reserved for --report and --print-config
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli, config: &SplitConfig) -> Result<()> {
    let settings = ChordSettings {
        tolerance_ticks: config.chords.tolerance_ticks,
        min_notes: config.chords.min_notes,
    };

    let input = std::fs::read(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    info!(path = %cli.input.display(), bytes = input.len(), "read input");

    let output = split_midi(&input, &settings)
        .with_context(|| format!("Failed to split {}", cli.input.display()))?;

    if !output.report.is_lossless() {
        warn!(
            dropped = output.report.dropped.len(),
            "some chord notes could not be placed"
        );
    }

    if !output.report.is_monophonic() {
        warn!(
            channels = ?output.report.overlapping_channels,
            "overlapping notes remain on some channels"
        );
    }

    if cli.report {
        println!("{}", serde_json::to_string_pretty(&output.report)?);
    }

    if cli.dry_run {
        info!("dry run, nothing written");
        return Ok(());
    }

    let out_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input, &config.output.suffix));

    if out_path.exists() && !config.output.overwrite {
        bail!(
            "{} already exists and output.overwrite is false",
            out_path.display()
        );
    }

    std::fs::write(&out_path, &output.midi)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;
    // keep stdout parseable when it carries the JSON report
    if cli.report {
        eprintln!("Wrote: {}", out_path.display());
    } else {
        println!("Wrote: {}", out_path.display());
    }

    Ok(())
}

/// `song.mid` with suffix `.split.mid` becomes `song.mid.split.mid`.
fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let mut path = OsString::from(input.as_os_str());
    path.push(suffix);
    PathBuf::from(path)
}
