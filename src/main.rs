//! phototidy - quarantine duplicate photos and sort the rest into dated folders.
//!
//! Usage:
//!   phototidy dedupe SOURCE [-q DIR]     Move duplicates into a quarantine directory
//!   phototidy organize SOURCE [-d DIR]   Sort files into DD.MM.YYYY / YYYY folders
//!   phototidy --help                     Show help

use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use phototidy_core::{CollisionPolicy, OriginalSelection, Phase, Progress, TidyConfig};
use phototidy_ops::{BatchMode, BatchOutcome, BatchSummary, Classification, Pipeline};

/// Exit status for a batch that finished with failed moves under `--strict`.
const PARTIAL_FAILURE_EXIT_CODE: i32 = 2;

#[derive(Parser)]
#[command(
    name = "phototidy",
    version,
    about = "Parallel duplicate quarantine and date-folder organizer",
    long_about = "phototidy hashes or timestamps every file under a directory on a \
                  worker pool, then moves duplicates into a quarantine directory or \
                  sorts files into dated folders."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Move files with duplicate content into a quarantine directory
    Dedupe {
        /// Directory to scan
        source: PathBuf,

        /// Quarantine directory (defaults to SOURCE/duplicates)
        #[arg(short, long, value_name = "DIR")]
        quarantine: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Sort files into dated folders by modification time
    Organize {
        /// Directory to scan
        source: PathBuf,

        /// Root of the dated folders (defaults to SOURCE/sorted)
        #[arg(short, long, value_name = "DIR")]
        dest: Option<PathBuf>,

        /// Minimum files on one date for a DD.MM.YYYY folder
        #[arg(short, long, value_name = "N")]
        threshold: Option<usize>,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Number of worker threads (default: host parallelism)
    #[arg(short = 'j', long, value_name = "N")]
    workers: Option<usize>,

    /// Report what would move without touching anything
    #[arg(long)]
    dry_run: bool,

    /// What to do when a name is already taken at the destination
    #[arg(long, value_enum)]
    collision: Option<CollisionArg>,

    /// Keep the first duplicate hashed instead of the lowest path
    #[arg(long)]
    arrival_order: bool,

    /// File-name glob to ignore (repeatable)
    #[arg(long = "ignore", value_name = "PATTERN")]
    ignore: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Exit with status 2 if any move failed
    #[arg(long)]
    strict: bool,

    /// Hide progress bars
    #[arg(long)]
    no_progress: bool,

    /// TOML config file; command-line flags take precedence
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CollisionArg {
    AutoRename,
    Skip,
    Overwrite,
}

impl From<CollisionArg> for CollisionPolicy {
    fn from(arg: CollisionArg) -> Self {
        match arg {
            CollisionArg::AutoRename => Self::AutoRename,
            CollisionArg::Skip => Self::Skip,
            CollisionArg::Overwrite => Self::Overwrite,
        }
    }
}

/// Values accepted from `--config`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct FileConfig {
    workers: Option<usize>,
    threshold: Option<usize>,
    quarantine: Option<PathBuf>,
    destination: Option<PathBuf>,
    ignore: Vec<String>,
    collision: Option<CollisionPolicy>,
    original_selection: Option<OriginalSelection>,
    follow_symlinks: bool,
    include_hidden: Option<bool>,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (mode, source, destination, threshold, common) = match cli.command {
        Command::Dedupe {
            source,
            quarantine,
            common,
        } => (BatchMode::Dedupe, source, quarantine, None, common),
        Command::Organize {
            source,
            dest,
            threshold,
            common,
        } => (BatchMode::Organize, source, dest, threshold, common),
    };

    let config = build_config(mode, source, destination, threshold, &common)?;
    let pipeline = Pipeline::new(config).context("Invalid configuration")?;

    let observer = (!common.no_progress).then(|| spawn_progress(pipeline.subscribe()));

    let result = match mode {
        BatchMode::Dedupe => pipeline.dedupe(),
        BatchMode::Organize => pipeline.organize(),
    };

    // Closing the channel lets the observer thread finish.
    drop(pipeline);
    if let Some(handle) = observer {
        let _ = handle.join();
    }

    let summary = result.context("Batch failed")?;
    tracing::info!(%mode, outcome = ?summary.outcome(), "done");

    match common.format {
        OutputFormat::Text => print_summary(&summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    if common.strict && matches!(summary.outcome(), BatchOutcome::PartialFailure { .. }) {
        std::process::exit(PARTIAL_FAILURE_EXIT_CODE);
    }

    Ok(())
}

/// Install a stderr subscriber so stdout stays clean for JSON output.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

/// Merge command-line flags over the optional config file.
fn build_config(
    mode: BatchMode,
    source: PathBuf,
    destination: Option<PathBuf>,
    threshold: Option<usize>,
    common: &CommonArgs,
) -> Result<TidyConfig> {
    let file = match &common.config {
        Some(path) => load_file_config(path)?,
        None => FileConfig::default(),
    };

    let destination = match mode {
        BatchMode::Dedupe => destination
            .or(file.quarantine)
            .unwrap_or_else(|| source.join("duplicates")),
        BatchMode::Organize => destination
            .or(file.destination)
            .unwrap_or_else(|| source.join("sorted")),
    };

    let original_selection = if common.arrival_order {
        OriginalSelection::ArrivalOrder
    } else {
        file.original_selection.unwrap_or_default()
    };

    let ignore_patterns = if common.ignore.is_empty() {
        file.ignore
    } else {
        common.ignore.clone()
    };

    let mut builder = TidyConfig::builder();
    builder
        .source_root(source)
        .destination_root(destination)
        .workers(common.workers.or(file.workers).unwrap_or(0))
        .ignore_patterns(ignore_patterns)
        .follow_symlinks(file.follow_symlinks)
        .include_hidden(file.include_hidden.unwrap_or(true))
        .original_selection(original_selection)
        .collision(
            common
                .collision
                .map(CollisionPolicy::from)
                .or(file.collision)
                .unwrap_or_default(),
        )
        .dry_run(common.dry_run);
    if let Some(threshold) = threshold.or(file.threshold) {
        builder.date_group_threshold(threshold);
    }

    builder.build().context("Invalid configuration")
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
}

/// Render progress events as one bar per phase.
fn spawn_progress(mut rx: broadcast::Receiver<Progress>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut current: Option<(Phase, ProgressBar)> = None;

        loop {
            let progress = match rx.blocking_recv() {
                Ok(progress) => progress,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };

            let bar = match &current {
                Some((phase, bar)) if *phase == progress.phase => bar.clone(),
                _ => {
                    if let Some((_, old)) = current.take() {
                        old.finish_and_clear();
                    }
                    let bar = phase_bar(progress.phase, progress.total);
                    current = Some((progress.phase, bar.clone()));
                    bar
                }
            };
            bar.set_position(progress.completed);
        }

        if let Some((_, bar)) = current {
            bar.finish_and_clear();
        }
    })
}

fn phase_bar(phase: Phase, total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "  {spinner:.cyan} {msg} [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining)",
    )
    .map(|style| style.progress_chars("━╸─").tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar.set_message(capitalize(&phase.to_string()));
    bar.enable_steady_tick(std::time::Duration::from_millis(80));
    bar
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Print the human-readable batch report.
fn print_summary(summary: &BatchSummary) {
    let relocation = &summary.relocation;

    println!();
    println!("{}", "─".repeat(70));
    match summary.mode {
        BatchMode::Dedupe => println!(" Duplicate Report"),
        BatchMode::Organize => println!(" Organize Report"),
    }
    println!("{}", "─".repeat(70));
    println!();
    println!(
        " Scanned {} files under {} in {:.2}s",
        summary.files_scanned,
        summary.source_root.display(),
        summary.elapsed.as_secs_f64()
    );

    match &summary.classification {
        Classification::Duplicates(report) => {
            if report.has_duplicates() {
                println!(
                    " Found {} duplicate groups ({} duplicates)",
                    report.groups.len(),
                    report.duplicate_count()
                );
            } else {
                println!(" No duplicate files found.");
            }
        }
        Classification::Dates(report) => {
            let folders = report.folders();
            println!(
                " {} files across {} folders (threshold {})",
                report.file_count(),
                folders.len(),
                report.threshold
            );
            for (label, count) in &folders {
                println!("   {:<12} {:>8} files", label.to_string(), count);
            }
        }
    }

    if relocation.succeeded() > 0 || !relocation.is_success() {
        println!(
            " {} ({}) into {}",
            relocation.summary(),
            format_size(relocation.bytes_moved),
            summary.destination_root.display()
        );
    }

    if !relocation.errors.is_empty() {
        println!();
        println!(" Failed moves:");
        for error in &relocation.errors {
            println!("   {}", error);
        }
    }

    if !summary.skipped.is_empty() {
        println!();
        println!(" Skipped (unreadable):");
        for path in &summary.skipped {
            println!("   {}", path.display());
        }
    }

    let other_warnings = summary.warnings.len().saturating_sub(summary.skipped.len());
    if other_warnings > 0 {
        println!();
        println!(" {} warning(s) during scan", other_warnings);
    }

    if relocation.dry_run {
        println!();
        println!(" Dry run: nothing was moved.");
    }
    println!();
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
