//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use gridsync_artifacts::serialize_artifact;
use gridsync_core::pipeline::{
    ProgressReporter, SilentProgress, SyncReport, build_schedule, sync_schedule,
};
use gridsync_core::resolver::resolve_context;
use gridsync_shared::{
    AppConfig, EnvOverrides, NormalizeMode, SeasonType, SyncConfig, init_config, init_config_at,
    load_config, load_config_from,
};
use gridsync_transport::HttpTransport;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// gridsync: keep a local NFL schedule artifact in sync with the scoreboard API.
#[derive(Parser)]
#[command(
    name = "gridsync",
    version,
    about = "Resolve the current NFL week and write a compact, stable schedule.json.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.gridsync/gridsync.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Explicit context pins. Only honored when all three are given.
#[derive(Args, Debug, Default)]
pub(crate) struct PinArgs {
    /// Season year, e.g. 2025.
    #[arg(long, env = "YEAR")]
    pub year: Option<i32>,

    /// Season type: 1|2|3 or preseason|regular|post.
    #[arg(long, env = "TYPE")]
    pub season_type: Option<SeasonType>,

    /// Week number within the season type.
    #[arg(long, env = "WEEK")]
    pub week: Option<u32>,
}

impl From<&PinArgs> for EnvOverrides {
    fn from(args: &PinArgs) -> Self {
        Self {
            year: args.year,
            season_type: args.season_type,
            week: args.week,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch the current schedule and write it if it changed.
    Sync {
        /// Artifact path (defaults to the configured output path).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Normalization mode: filter or flatten.
        #[arg(short, long)]
        mode: Option<NormalizeMode>,

        /// Print the normalized JSON to stdout instead of writing it.
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        pins: PinArgs,
    },

    /// Print the resolved (year, season type, week) and where it came from.
    Resolve {
        #[command(flatten)]
        pins: PinArgs,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "gridsync=info",
        1 => "gridsync=debug",
        _ => "gridsync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Sync {
            out,
            mode,
            dry_run,
            pins,
        } => cmd_sync(config_path, out, mode, dry_run, &pins).await,
        Command::Resolve { pins } => cmd_resolve(config_path, &pins).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Merge the config file with command-line flags.
fn sync_config(
    path: Option<&Path>,
    out: Option<PathBuf>,
    mode: Option<NormalizeMode>,
) -> Result<SyncConfig> {
    let mut config = SyncConfig::from(&load_app_config(path)?);
    if let Some(out) = out {
        config.output_path = out;
    }
    if let Some(mode) = mode {
        config.mode = mode;
    }
    config.validate()?;
    Ok(config)
}

async fn cmd_sync(
    config_path: Option<&Path>,
    out: Option<PathBuf>,
    mode: Option<NormalizeMode>,
    dry_run: bool,
    pins: &PinArgs,
) -> Result<()> {
    let config = sync_config(config_path, out, mode)?;
    let transport = HttpTransport::from_config(&config)?;
    let overrides = EnvOverrides::from(pins);
    let now = Utc::now();

    info!(
        path = %config.output_path.display(),
        mode = ?config.mode,
        dry_run,
        "starting schedule sync"
    );

    if dry_run {
        let built = build_schedule(&transport, &config, &overrides, now, &SilentProgress).await;
        let bytes = serialize_artifact(&built.artifact)?;
        print!("{}", String::from_utf8_lossy(&bytes));
        info!(
            context = %built.context,
            events = built.event_count(),
            bytes = bytes.len(),
            "dry run, nothing written"
        );
        return Ok(());
    }

    let reporter = CliProgress::new();
    let report = sync_schedule(&transport, &config, &overrides, now, &reporter)
        .await
        .wrap_err("schedule sync failed")?;

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &SyncReport) {
    let status = if report.outcome.changed {
        "written"
    } else {
        "unchanged"
    };
    println!();
    println!("  Schedule {status}");
    println!(
        "  Context:  {} ({})",
        report.context, report.context_source
    );
    println!(
        "  Events:   {} via {}{}",
        report.event_count,
        report.strategy,
        if report.scanned { " (scan)" } else { "" }
    );
    println!(
        "  Size:     {} bytes{}",
        report.outcome.bytes,
        if report.outcome.over_budget {
            " (over budget)"
        } else {
            ""
        }
    );
    println!("  SHA-256:  {}", report.outcome.sha256);
    println!("  Path:     {}", report.outcome.path.display());
    println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

async fn cmd_resolve(config_path: Option<&Path>, pins: &PinArgs) -> Result<()> {
    let config = sync_config(config_path, None, None)?;
    let transport = HttpTransport::from_config(&config)?;
    let resolution =
        resolve_context(&transport, &config, Utc::now(), &EnvOverrides::from(pins)).await;

    let ctx = resolution.context;
    println!(
        "year={} seasontype={} week={} source={}",
        ctx.year,
        ctx.season_type.code(),
        ctx.week,
        resolution.source
    );
    Ok(())
}

fn cmd_config_init(config_path: Option<&Path>) -> Result<()> {
    let path = match config_path {
        Some(p) => {
            init_config_at(p)?;
            p.to_path_buf()
        }
        None => init_config()?,
    };
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_app_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
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
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _report: &SyncReport) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
