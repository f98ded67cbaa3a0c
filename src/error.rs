//! Error types for pqbench
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Benchmark engine error types
#[derive(Error, Debug)]
pub enum Error {
    /// Bad input shape or range, surfaced verbatim to the caller
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing algorithm, task, or result
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate algorithm name (distinct from generic validation)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No usable crypto backend at all - fatal to the requesting task
    #[error("Crypto backend unavailable: {0}\nInstall liboqs or construct the engine in simulated mode")]
    BackendUnavailable(String),

    /// One native call failed - counted as a failed round, execution continues
    #[error("Backend call failed: {0}")]
    BackendCall(String),

    /// Degenerate statistical input (e.g. variance of a single sample)
    #[error("Statistics error: {0}")]
    Statistics(String),

    /// Dispatch queue closed (receiver dropped)
    #[error("Dispatch queue closed (receiver dropped)")]
    QueueClosed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
