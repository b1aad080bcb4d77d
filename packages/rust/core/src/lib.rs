//! Schedule sync orchestration for gridsync.
//!
//! This crate ties together context resolution, event retrieval with the
//! week-scan fallback, normalization and the atomic commit into one
//! end-to-end workflow (`sync_schedule`).

pub mod pipeline;
pub mod resolver;
pub mod retriever;

#[cfg(test)]
mod test_support;
