//! Shared types, error model, and configuration for gridsync.
//!
//! This crate is the foundation depended on by all other gridsync crates.
//! It provides:
//! - [`GridsyncError`] and [`TransportError`], the error model
//! - Domain types ([`Context`], [`SeasonType`], [`ScheduleArtifact`], [`Event`])
//! - Configuration ([`AppConfig`], [`SyncConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, NormalizeMode, OutputConfig, ScanConfig, ScanPolicy, SeasonConfig,
    SyncConfig, config_dir, config_file_path, init_config, init_config_at, load_config,
    load_config_from,
};
pub use error::{GridsyncError, Result, TransportError};
pub use types::{
    Competition, Competitor, Context, EnvOverrides, Event, HomeAway, Link, RawDocument, Record,
    ScheduleArtifact, ScheduleEvent, SeasonInfo, SeasonType, Status, StatusType, Team, WeekInfo,
};
