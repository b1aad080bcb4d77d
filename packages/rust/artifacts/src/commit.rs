//! Idempotent, atomic replacement of the schedule artifact on disk.
//!
//! The artifact is rewritten only when its serialized bytes differ from what
//! is already on disk, so unchanged upstream data never touches the file's
//! mtime. A write goes to a temporary file in the target's directory and is
//! renamed into place; the temporary file is removed on every failure path.

use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use gridsync_shared::{GridsyncError, Result, ScheduleArtifact};

/// Result of a [`commit`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The artifact path.
    pub path: PathBuf,
    /// Whether the file was (re)written.
    pub changed: bool,
    /// Serialized size in bytes.
    pub bytes: usize,
    /// Hex SHA-256 of the serialized artifact.
    pub sha256: String,
    /// Whether the size exceeded the payload ceiling.
    pub over_budget: bool,
}

/// Serialize the artifact deterministically: struct field order, two-space
/// indentation, trailing newline.
pub fn serialize_artifact(doc: &ScheduleArtifact) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(doc)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Write `doc` to `target` unless the file already holds identical bytes.
///
/// Creates the parent directory if needed. Any error here is a local
/// environment failure and is returned to the caller.
#[instrument(skip_all, fields(path = %target.display()))]
pub fn commit(
    doc: &ScheduleArtifact,
    target: &Path,
    max_payload_bytes: usize,
) -> Result<CommitOutcome> {
    let bytes = serialize_artifact(doc)?;
    let sha256 = format!("{:x}", Sha256::digest(&bytes));
    let over_budget = bytes.len() > max_payload_bytes;

    if over_budget {
        warn!(
            bytes = bytes.len(),
            max = max_payload_bytes,
            "artifact exceeds payload ceiling"
        );
    }

    let changed = write_if_changed(target, &bytes)?;

    if changed {
        info!(bytes = bytes.len(), sha256 = %sha256, "artifact written");
    } else {
        info!("artifact unchanged");
    }

    Ok(CommitOutcome {
        path: target.to_path_buf(),
        changed,
        bytes: bytes.len(),
        sha256,
        over_budget,
    })
}

/// Reuse the `lastUpdated` stamp of the artifact already at `target` when
/// that stamp is the only difference, so an unchanged schedule stays
/// byte-identical across runs.
pub fn carry_forward_timestamp(doc: &mut ScheduleArtifact, target: &Path) {
    if doc.last_updated.is_none() {
        return;
    }
    let Some(existing) = read_existing(target) else {
        return;
    };
    let Some(prior_stamp) = serde_json::from_slice::<serde_json::Value>(&existing)
        .ok()
        .and_then(|v| v.get("lastUpdated")?.as_str().map(str::to_owned))
    else {
        return;
    };

    let mut candidate = doc.clone();
    candidate.last_updated = Some(prior_stamp);
    if serialize_artifact(&candidate).is_ok_and(|bytes| bytes == existing) {
        debug!("schedule unchanged, keeping previous lastUpdated");
        *doc = candidate;
    }
}

/// Replace `target` with `bytes` atomically. Returns `false` without touching
/// the file when its current contents are identical.
fn write_if_changed(target: &Path, bytes: &[u8]) -> Result<bool> {
    if read_existing(target).is_some_and(|existing| existing == bytes) {
        return Ok(false);
    }

    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| GridsyncError::io(&parent, e))?;

    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("schedule.json");
    let temp = TempFile {
        path: parent.join(format!(".{file_name}.tmp-{}", std::process::id())),
        keep: false,
    };

    let mut file = File::create(&temp.path).map_err(|e| GridsyncError::io(&temp.path, e))?;
    file.write_all(bytes)
        .map_err(|e| GridsyncError::io(&temp.path, e))?;
    file.sync_all()
        .map_err(|e| GridsyncError::io(&temp.path, e))?;
    drop(file);

    temp.persist(target)?;
    Ok(true)
}

/// Current contents of `target`, or `None` if it is missing or unreadable.
fn read_existing(target: &Path) -> Option<Vec<u8>> {
    match std::fs::read(target) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            debug!(path = %target.display(), error = %e, "existing artifact unreadable");
            None
        }
    }
}

/// Temporary sibling file, deleted on drop unless persisted.
struct TempFile {
    path: PathBuf,
    keep: bool,
}

impl TempFile {
    fn persist(mut self, target: &Path) -> Result<()> {
        std::fs::rename(&self.path, target).map_err(|e| GridsyncError::io(target, e))?;
        self.keep = true;
        Ok(())
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.keep {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
