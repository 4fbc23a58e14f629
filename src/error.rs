//! Error types for probewire.

use thiserror::Error;

/// Main error type for all probewire operations.
///
/// Per-frame protocol violations and per-connection I/O failures never
/// surface here: the worker contains them and keeps serving. Only startup
/// failures and a crashed worker reach the caller.
#[derive(Debug, Error)]
pub enum ProbewireError {
    /// The control endpoint could not be created at startup.
    #[error("cannot bind control endpoint {endpoint}: {source}")]
    Bind {
        /// Socket path (POSIX) or loopback address (Windows) that failed.
        endpoint: String,
        /// Underlying socket error.
        source: std::io::Error,
    },

    /// The worker task panicked or was aborted before `stop()` completed.
    #[error("server worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Result type alias using ProbewireError.
pub type Result<T> = std::result::Result<T, ProbewireError>;
