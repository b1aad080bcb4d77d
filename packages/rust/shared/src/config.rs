//! Application configuration for gridsync.
//!
//! User config lives at `~/.gridsync/gridsync.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GridsyncError, Result};
use crate::types::{Context, SeasonType};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "gridsync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".gridsync";

/// Public scoreboard endpoint.
pub const DEFAULT_BASE_URL: &str =
    "https://site.api.espn.com/apis/site/v2/sports/football/nfl/scoreboard";

/// Highest week probed by the scan fallback (regular season plus playoff rounds).
pub const DEFAULT_SCAN_MAX_WEEK: u32 = 21;

/// A week counts as fresh if one of its games kicks off no earlier than this
/// many hours before now.
pub const DEFAULT_FRESHNESS_HOURS: i64 = 24;

/// Upper bound for `freshness_hours` (one leap year).
pub const MAX_FRESHNESS_HOURS: i64 = 24 * 366;

/// Downstream payload ceiling in bytes.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 100_000;

// ---------------------------------------------------------------------------
// Config structs (matching gridsync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Scoreboard API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Season calendar heuristics.
    #[serde(default)]
    pub season: SeasonConfig,

    /// Week scan fallback.
    #[serde(default)]
    pub scan: ScanConfig,

    /// Artifact output.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Scoreboard endpoint; query parameters are appended per request.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_timeout_secs() -> u64 {
    20
}

/// `[season]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonConfig {
    /// First month (1-12) of the active league window.
    #[serde(default = "default_window_start")]
    pub window_start_month: u32,

    /// Last month (1-12) of the active window; may wrap past December.
    #[serde(default = "default_window_end")]
    pub window_end_month: u32,

    /// Context used outside the active window when the API gives no hint.
    #[serde(default = "default_offseason_fallback")]
    pub offseason_fallback: Context,
}

impl Default for SeasonConfig {
    fn default() -> Self {
        Self {
            window_start_month: default_window_start(),
            window_end_month: default_window_end(),
            offseason_fallback: default_offseason_fallback(),
        }
    }
}

fn default_window_start() -> u32 {
    9
}
fn default_window_end() -> u32 {
    2
}
fn default_offseason_fallback() -> Context {
    // Championship round of the 2024 postseason.
    Context::new(2024, SeasonType::Post, 5)
}

/// How the scan fallback picks a week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanPolicy {
    /// The first week with any events wins.
    FirstNonEmpty,
    /// The first week with an upcoming (or just-played) game wins.
    PreferFresh,
}

/// `[scan]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Candidate weeks are `1..=max_week`.
    #[serde(default = "default_scan_max_week")]
    pub max_week: u32,

    /// Season type queried for every candidate week.
    #[serde(default = "default_scan_season_type")]
    pub season_type: SeasonType,

    /// Freshness window in hours for [`ScanPolicy::PreferFresh`].
    #[serde(default = "default_freshness_hours")]
    pub freshness_hours: i64,

    #[serde(default = "default_scan_policy")]
    pub policy: ScanPolicy,

    /// Under `prefer-fresh`, fall back to the first non-empty week when no
    /// fresh week exists.
    #[serde(default = "default_true")]
    pub stale_fallback: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_week: default_scan_max_week(),
            season_type: default_scan_season_type(),
            freshness_hours: default_freshness_hours(),
            policy: default_scan_policy(),
            stale_fallback: true,
        }
    }
}

fn default_scan_max_week() -> u32 {
    DEFAULT_SCAN_MAX_WEEK
}
fn default_scan_season_type() -> SeasonType {
    SeasonType::Regular
}
fn default_freshness_hours() -> i64 {
    DEFAULT_FRESHNESS_HOURS
}
fn default_scan_policy() -> ScanPolicy {
    ScanPolicy::PreferFresh
}
fn default_true() -> bool {
    true
}

/// Normalization mode for the artifact's events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMode {
    /// Allowlisted projection plus `lastUpdated`; fits the payload ceiling.
    #[default]
    Filter,
    /// Upstream `events` entries kept verbatim (including non-objects), no timestamp.
    Flatten,
}

impl std::str::FromStr for NormalizeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "filter" => Ok(Self::Filter),
            "flatten" => Ok(Self::Flatten),
            other => Err(format!(
                "invalid mode '{other}': expected 'filter' or 'flatten'"
            )),
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Artifact path, relative paths resolve against the working directory.
    #[serde(default = "default_output_path")]
    pub path: String,

    #[serde(default)]
    pub mode: NormalizeMode,

    /// Warn when the serialized artifact exceeds this many bytes.
    #[serde(default = "default_max_payload")]
    pub max_payload_bytes: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            mode: NormalizeMode::default(),
            max_payload_bytes: default_max_payload(),
        }
    }
}

fn default_output_path() -> String {
    "data/schedule.json".into()
}
fn default_max_payload() -> usize {
    DEFAULT_MAX_PAYLOAD_BYTES
}

// ---------------------------------------------------------------------------
// Sync config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration for one sync run, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub window_start_month: u32,
    pub window_end_month: u32,
    pub offseason_fallback: Context,
    pub scan_max_week: u32,
    pub scan_season_type: SeasonType,
    pub freshness_hours: i64,
    pub scan_policy: ScanPolicy,
    pub stale_fallback: bool,
    pub output_path: PathBuf,
    pub mode: NormalizeMode,
    pub max_payload_bytes: usize,
}

impl SyncConfig {
    /// Whether `month` (1-12) falls inside the active league window.
    pub fn in_season_window(&self, month: u32) -> bool {
        let (start, end) = (self.window_start_month, self.window_end_month);
        if start <= end {
            (start..=end).contains(&month)
        } else {
            month >= start || month <= end
        }
    }

    /// Reject values that would make the pipeline misbehave.
    pub fn validate(&self) -> Result<()> {
        for (name, month) in [
            ("window_start_month", self.window_start_month),
            ("window_end_month", self.window_end_month),
        ] {
            if !(1..=12).contains(&month) {
                return Err(GridsyncError::config(format!(
                    "{name} must be between 1 and 12, got {month}"
                )));
            }
        }
        if self.scan_max_week == 0 {
            return Err(GridsyncError::config("scan max_week must be at least 1"));
        }
        if !(1..=MAX_FRESHNESS_HOURS).contains(&self.freshness_hours) {
            return Err(GridsyncError::config(format!(
                "scan freshness_hours must be between 1 and {MAX_FRESHNESS_HOURS}, got {}",
                self.freshness_hours
            )));
        }
        if self.timeout_secs == 0 {
            return Err(GridsyncError::config("api timeout_secs must be at least 1"));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for SyncConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.api.base_url.clone(),
            timeout_secs: config.api.timeout_secs,
            window_start_month: config.season.window_start_month,
            window_end_month: config.season.window_end_month,
            offseason_fallback: config.season.offseason_fallback,
            scan_max_week: config.scan.max_week,
            scan_season_type: config.scan.season_type,
            freshness_hours: config.scan.freshness_hours,
            scan_policy: config.scan.policy,
            stale_fallback: config.scan.stale_fallback,
            output_path: PathBuf::from(&config.output.path),
            mode: config.output.mode,
            max_payload_bytes: config.output.max_payload_bytes,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.gridsync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| GridsyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.gridsync/gridsync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| GridsyncError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| GridsyncError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = config_file_path()?;
    init_config_at(&path)?;
    Ok(path)
}

/// Write a default config file at `path`, creating parent directories.
pub fn init_config_at(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| GridsyncError::io(dir, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| GridsyncError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| GridsyncError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(())
}
