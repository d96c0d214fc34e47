//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use kbimport_core::{
    ImportResult, ProgressReporter, import_config_file, list_config_files, run_all,
    verify_config_file,
};
use kbimport_knowledge::SyncOptions;

/// Default directory scanned for source configurations.
const DEFAULT_CONFIG_DIR: &str = "config";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// kbimport: publish tabular files, websites and event listings into a
/// knowledge store.
#[derive(Parser)]
#[command(
    name = "kbimport",
    version,
    about = "Import data into a remote knowledge store using source configuration files.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Import one configuration, or every configuration in the config directory.
    Run {
        /// Path to a specific configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory holding `.json` / `.toml` configurations.
        #[arg(long, default_value = DEFAULT_CONFIG_DIR)]
        config_dir: PathBuf,
    },

    /// List the configuration files in the config directory.
    List {
        /// Directory holding `.json` / `.toml` configurations.
        #[arg(long, default_value = DEFAULT_CONFIG_DIR)]
        config_dir: PathBuf,
    },

    /// Check the knowledge store connection and that the source yields data.
    Verify {
        /// Configuration file to verify.
        file: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "kbimport=info",
        1 => "kbimport=debug",
        _ => "kbimport=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            config: Some(config),
            ..
        } => cmd_run_one(&config).await,
        Command::Run {
            config: None,
            config_dir,
        } => cmd_run_all(&config_dir).await,
        Command::List { config_dir } => cmd_list(&config_dir),
        Command::Verify { file } => cmd_verify(&file).await,
    }
}

async fn cmd_run_one(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(eyre!("configuration file {} not found", path.display()));
    }
    println!("Processing configuration: {}", path.display());

    let reporter = CliProgress::new();
    let result = import_config_file(path, SyncOptions::default(), &reporter).await?;
    drop(reporter);

    print_summary(path, &result);
    Ok(())
}

async fn cmd_run_all(dir: &Path) -> Result<()> {
    info!(dir = %dir.display(), "processing all configurations");

    let reporter = CliProgress::new();
    let summary = run_all(dir, SyncOptions::default(), &reporter).await?;
    drop(reporter);

    if summary.total() == 0 {
        println!("No configuration files found.");
        return Ok(());
    }

    for (path, result) in &summary.succeeded {
        print_summary(path, result);
    }
    for (path, err) in &summary.failed {
        println!("Failed to process configuration {}: {err}", path.display());
    }

    if summary.failed.is_empty() {
        Ok(())
    } else {
        Err(eyre!(
            "{} of {} configurations failed",
            summary.failed.len(),
            summary.total()
        ))
    }
}

fn cmd_list(dir: &Path) -> Result<()> {
    let files = list_config_files(dir)?;
    println!("Available configuration files:");
    for file in files {
        if let Some(name) = file.file_name() {
            println!("- {}", name.to_string_lossy());
        }
    }
    Ok(())
}

async fn cmd_verify(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(eyre!("configuration file {} not found", path.display()));
    }
    println!("Verifying configuration file {}", path.display());

    let report = verify_config_file(path).await?;
    println!("  Collection: {}", report.collection);
    println!("  Data:       {}", report.data);
    println!("Verification complete.");
    Ok(())
}

fn print_summary(path: &Path, result: &ImportResult) {
    println!();
    println!("  Configuration: {}", path.display());
    println!("  Source:        {}", result.source);
    println!("  Collection:    {}", result.report.collection_id);
    println!("  Records:       {}", result.records);
    println!("  Uploaded:      {}", result.report.uploaded);
    println!("  Skipped:       {}", result.report.skipped);
    println!("  Failed:        {}", result.report.failed.len());
    println!("  Mean tokens:   {:.1}", result.report.average_tokens);
    println!("  Time:          {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn document(&self, file_name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Uploading [{current}/{total}] {file_name}"));
    }

    fn done(&self, result: &ImportResult) {
        self.spinner.set_message(format!(
            "Imported {} of {} records",
            result.report.uploaded, result.records
        ));
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.spinner.finish_and_clear();
    }
}
