mod playbook;

use anyhow::{bail, Context, Result};
use cfgdiff_common::{default_cache_dir, load_config, AppConfig, ComparisonTarget, ConfigFormat, Side};
use cfgdiff_core::{
    DirectoryWalker, FileComparator, FileComparison, FileReportSink, HashCache, TracingObserver,
    WalkState, WalkSummary,
};
use clap::{Args, Parser, Subcommand};
use playbook::{parse_extra_var, CloudEngine, PlaybookCommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cfgdiff")]
#[command(author = "cfgdiff Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Compare service configuration files across two deployments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two files or two directories
    Compare(CompareArgs),

    /// Pull configuration files from Podman or OCP with ansible-playbook
    Pull(PullArgs),
}

#[derive(Args)]
struct CompareArgs {
    /// Origin file or directory
    #[arg(long)]
    origin: PathBuf,

    /// Destination file or directory
    #[arg(long)]
    destination: PathBuf,

    /// Report file when comparing two files
    #[arg(short, long, default_value = "output.txt")]
    output: PathBuf,

    /// Skip format detection: ini, yaml, json or text
    #[arg(short, long)]
    format: Option<ConfigFormat>,

    /// Pick the differ from the file extension when both names agree
    #[arg(long)]
    by_extension: bool,

    /// Directory for per-file reports when comparing directories
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// Do not walk destination against origin
    #[arg(long)]
    no_reverse: bool,

    /// Ignore patterns (can be specified multiple times)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// Follow symbolic links
    #[arg(short = 'L', long)]
    follow_symlinks: bool,

    /// Keep file hashes in the platform cache directory between runs
    #[arg(long)]
    persist_cache: bool,

    /// Configuration file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PullArgs {
    /// Ansible inventory hosts file
    #[arg(long, default_value = "hosts")]
    inventory: PathBuf,

    /// Service engine the configuration is collected from
    #[arg(long, value_enum, default_value_t = CloudEngine::Ocp)]
    cloud_engine: CloudEngine,

    /// Restrict the play to these hosts
    #[arg(long)]
    limit: Option<String>,

    /// Extra variable as name=value (can be specified multiple times)
    #[arg(long = "extra-var", value_parser = parse_extra_var)]
    extra_vars: Vec<(String, String)>,

    /// Playbook to run instead of the engine's default
    #[arg(long)]
    playbook: Option<PathBuf>,

    /// Enable Ansible verbosity
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    // Initialize tracing to stderr (so reports and JSON go cleanly to stdout)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compare(args) => run_compare(args),
        Commands::Pull(args) => run_pull(args),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run_compare(args: CompareArgs) -> Result<()> {
    let loaded = load_config(args.config.as_deref())?;
    if loaded.exists {
        info!("Loaded configuration from {}", loaded.path.display());
    }
    let mut config = loaded.config;

    config.ignore_patterns.extend(args.ignore);
    if args.follow_symlinks {
        config.follow_symlinks = true;
    }
    if args.no_reverse {
        config.reverse = false;
    }
    if args.report_dir.is_some() {
        config.report_dir = args.report_dir;
    }
    if args.format.is_some() {
        config.format_override = args.format;
    }
    if args.persist_cache && config.cache_dir.is_none() {
        config.cache_dir = Some(default_cache_dir()?);
    }

    let origin_is_dir = fs::metadata(&args.origin)
        .with_context(|| format!("Origin path does not exist: {}", args.origin.display()))?
        .is_dir();
    let destination_is_dir = fs::metadata(&args.destination)
        .with_context(|| format!("Destination path does not exist: {}", args.destination.display()))?
        .is_dir();

    let comparator = build_comparator(&config, args.by_extension);
    match (origin_is_dir, destination_is_dir) {
        (false, false) => compare_files(&args.origin, &args.destination, &args.output, &comparator, args.json),
        (true, true) => compare_directories(&args.origin, &args.destination, config, comparator, args.json),
        _ => bail!(
            "Origin and destination must both be files or both be directories: {} vs {}",
            args.origin.display(),
            args.destination.display()
        ),
    }
}

/// Comparator shared by both modes; every difference is also logged.
fn build_comparator(config: &AppConfig, by_extension: bool) -> FileComparator {
    FileComparator::new()
        .with_format(config.format_override)
        .with_extension_hint(by_extension)
        .with_observer(Box::new(TracingObserver))
}

#[derive(Serialize)]
struct JsonFileReport<'a> {
    origin: String,
    destination: String,
    output: Option<String>,
    #[serde(flatten)]
    comparison: &'a FileComparison,
}

fn compare_files(
    origin: &Path,
    destination: &Path,
    output: &Path,
    comparator: &FileComparator,
    json: bool,
) -> Result<()> {
    info!("Comparing:");
    info!("  Origin:      {}", origin.display());
    info!("  Destination: {}", destination.display());

    let target = ComparisonTarget::new(origin, destination);
    let comparison = comparator.compare_and_write(&target, &FileReportSink, output)?;

    let written = !comparison.report.is_empty();
    if written {
        info!("Report written to {}", output.display());
    }

    if json {
        let report = JsonFileReport {
            origin: origin.to_string_lossy().to_string(),
            destination: destination.to_string_lossy().to_string(),
            output: written.then(|| output.to_string_lossy().to_string()),
            comparison: &comparison,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if written {
        print!("{}", comparison.report.render());
    } else {
        println!("No differences found");
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonDirectoryReport<'a> {
    origin: String,
    destination: String,
    report_dir: String,
    summary: WalkSummary,
    #[serde(flatten)]
    state: &'a WalkState,
}

fn compare_directories(
    origin: &Path,
    destination: &Path,
    config: AppConfig,
    comparator: FileComparator,
    json: bool,
) -> Result<()> {
    info!("Comparing:");
    info!("  Origin:      {}", origin.display());
    info!("  Destination: {}", destination.display());

    // Hashes only outlive the run when a cache directory is configured
    let hash_cache = match config.cache_dir.clone() {
        Some(cache_path) => {
            info!("Using cache directory: {}", cache_path.display());
            HashCache::persistent(cache_path)?
        }
        None => HashCache::in_memory(),
    };

    let walker = DirectoryWalker::new(config)
        .with_comparator(comparator)
        .with_hash_cache(hash_cache);
    let state = walker.process_directories(origin, destination)?;
    walker.persist_cache()?;

    let summary = state.summary();
    if json {
        let report = JsonDirectoryReport {
            origin: origin.to_string_lossy().to_string(),
            destination: destination.to_string_lossy().to_string(),
            report_dir: walker.report_dir().to_string_lossy().to_string(),
            summary,
            state: &state,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n{}", "=".repeat(80));
    println!("Comparison Results");
    println!("{}", "=".repeat(80));

    for path in state.missing_from(Side::Destination) {
        println!("  <<   {}", path.display());
    }
    for path in state.missing_from(Side::Origin) {
        println!("  >>   {}", path.display());
    }
    for path in &state.wrong_type {
        println!("  <>   {}", path.display());
    }
    for path in &state.content_different {
        println!("  !=   {}", path.display());
    }
    for (path, reason) in &state.failures {
        println!("  ??   {} ({})", path.display(), reason);
    }

    println!("\n{}", "=".repeat(80));
    println!("Summary:");
    println!("  Origin only:      {} (<<)", state.missing_from(Side::Destination).count());
    println!("  Destination only: {} (>>)", state.missing_from(Side::Origin).count());
    println!("  Wrong type:       {} (<>)", summary.wrong_type);
    println!("  Different:        {} (!=)", summary.content_different);
    println!("  Failed:           {} (??)", summary.failures);
    if summary.content_different > 0 {
        println!("  Reports:          {}", walker.report_dir().display());
    }
    println!("{}", "=".repeat(80));
    Ok(())
}

fn run_pull(args: PullArgs) -> Result<()> {
    let mut command = PlaybookCommand::new(args.inventory, args.cloud_engine)
        .with_limit(args.limit)
        .with_verbose(args.verbose);
    if let Some(playbook) = args.playbook {
        command = command.with_playbook(playbook);
    }
    for (name, value) in &args.extra_vars {
        command.add_extra_var(name, value)?;
    }

    command.run()?;
    info!("Configuration pulled");
    Ok(())
}
