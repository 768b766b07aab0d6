//! Daemon error types.

use scalper_domain::DomainError;
use scalper_exec::ExecError;
use thiserror::Error;

/// Daemon-level errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Execution error
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// API server error
    #[error("API error: {0}")]
    Api(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
