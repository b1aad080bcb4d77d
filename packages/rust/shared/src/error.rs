//! Error types for gridsync.
//!
//! Library crates use [`GridsyncError`] via `thiserror`. Single-request
//! failures are reported as [`TransportError`] and are always recovered by
//! the caller. The CLI wraps everything with `color-eyre`.

use std::path::PathBuf;

/// Top-level error type for gridsync operations.
///
/// Only local-environment failures travel this far; data-quality and network
/// problems are absorbed by the fallback chains in `gridsync-core`.
#[derive(Debug, thiserror::Error)]
pub enum GridsyncError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A transport failure that could not be recovered (e.g. the HTTP client
    /// itself could not be built).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The artifact could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure of a single scoreboard request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection, DNS, TLS or timeout failure.
    #[error("{url}: request failed: {message}")]
    Request { url: String, message: String },

    /// The server answered with a non-2xx status.
    #[error("{url}: HTTP {status}")]
    Status { url: String, status: u16 },

    /// The body was not a JSON document.
    #[error("{url}: invalid JSON: {message}")]
    Decode { url: String, message: String },

    /// The body exceeded the configured response cap.
    #[error("{url}: response too large ({len} bytes, max {max})")]
    TooLarge { url: String, len: u64, max: u64 },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, GridsyncError>;

impl GridsyncError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
