//! End-to-end sync: resolve context → retrieve → scan fallback → normalize → commit.

use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use gridsync_artifacts::{CommitOutcome, carry_forward_timestamp, commit, normalize};
use gridsync_shared::{Context, EnvOverrides, GridsyncError, Result, ScheduleArtifact, SyncConfig};
use gridsync_transport::ScoreboardSource;

use crate::resolver::{ContextSource, resolve_context};
use crate::retriever::{event_count, retrieve, scan_weeks};

/// A normalized schedule plus how it was obtained.
#[derive(Debug, Clone)]
pub struct BuiltSchedule {
    pub artifact: ScheduleArtifact,
    /// Context the artifact describes (after any scan adjustment).
    pub context: Context,
    pub context_source: ContextSource,
    /// Query strategy that produced the events, e.g. `week` or `scan:week`.
    pub strategy: String,
    /// Whether the scan fallback ran.
    pub scanned: bool,
}

impl BuiltSchedule {
    pub fn event_count(&self) -> usize {
        self.artifact.events.len()
    }
}

/// Result of [`sync_schedule`].
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub context: Context,
    pub context_source: ContextSource,
    pub strategy: String,
    pub scanned: bool,
    pub event_count: usize,
    pub outcome: CommitOutcome,
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the run completes.
    fn done(&self, report: &SyncReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _report: &SyncReport) {}
}

/// Produce the normalized schedule for `now` without touching disk.
///
/// Never fails: network and data problems degrade to fallbacks, and the
/// worst case is an empty schedule for the resolved context.
pub async fn build_schedule<S: ScoreboardSource>(
    source: &S,
    config: &SyncConfig,
    overrides: &EnvOverrides,
    now: DateTime<Utc>,
    progress: &dyn ProgressReporter,
) -> BuiltSchedule {
    progress.phase("Resolving current week");
    let resolution = resolve_context(source, config, now, overrides).await;
    let mut context = resolution.context;

    progress.phase("Fetching events");
    let retrieval = retrieve(source, &context, now.date_naive()).await;
    let mut strategy = retrieval
        .query
        .map_or_else(|| "none".to_string(), |q| q.strategy().to_string());
    let mut doc = retrieval.doc;
    let mut scanned = false;

    if doc.as_ref().is_none_or(|d| event_count(d) == 0) {
        progress.phase("Scanning weeks");
        scanned = true;
        match scan_weeks(source, &context, config, now).await {
            Some(hit) => {
                info!(from = %context, to = %hit.context, fresh = hit.fresh, "scan fallback found events");
                context = hit.context;
                strategy = format!("scan:{}", hit.query.strategy());
                doc = Some(hit.doc);
            }
            None => {
                warn!(%context, "no events found in scan window, writing empty schedule");
            }
        }
    }

    progress.phase("Normalizing payload");
    let artifact = normalize(doc.as_ref(), &context, config.mode, now);

    BuiltSchedule {
        artifact,
        context,
        context_source: resolution.source,
        strategy,
        scanned,
    }
}

/// Run the full sync and commit the artifact to `config.output_path`.
///
/// Only local filesystem failures are returned as errors.
#[instrument(skip_all, fields(path = %config.output_path.display(), mode = ?config.mode))]
pub async fn sync_schedule<S: ScoreboardSource>(
    source: &S,
    config: &SyncConfig,
    overrides: &EnvOverrides,
    now: DateTime<Utc>,
    progress: &dyn ProgressReporter,
) -> Result<SyncReport> {
    let start = Instant::now();

    // Fail on an unwritable destination before spending any requests.
    ensure_parent_dir(&config.output_path)?;

    let mut built = build_schedule(source, config, overrides, now, progress).await;

    progress.phase("Writing schedule");
    carry_forward_timestamp(&mut built.artifact, &config.output_path);
    let outcome = commit(&built.artifact, &config.output_path, config.max_payload_bytes)?;

    let report = SyncReport {
        context: built.context,
        context_source: built.context_source,
        strategy: built.strategy.clone(),
        scanned: built.scanned,
        event_count: built.event_count(),
        outcome,
        elapsed: start.elapsed(),
    };

    progress.done(&report);

    info!(
        context = %report.context,
        source = %report.context_source,
        strategy = %report.strategy,
        events = report.event_count,
        changed = report.outcome.changed,
        elapsed_ms = report.elapsed.as_millis(),
        "sync complete"
    );

    Ok(report)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| GridsyncError::io(parent, e))
        }
        _ => Ok(()),
    }
}
