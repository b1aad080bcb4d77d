//! Schedule artifact production: payload normalization and on-disk commit.
//!
//! This crate provides:
//! - [`normalize`]: reshape a raw scoreboard document into [`ScheduleArtifact`]
//! - [`commit`]: byte-compare and atomically replace the artifact file
//!
//! [`ScheduleArtifact`]: gridsync_shared::ScheduleArtifact

pub mod commit;
pub mod normalize;

pub use commit::{CommitOutcome, carry_forward_timestamp, commit, serialize_artifact};
pub use normalize::normalize;
