//! Execution layer error types.

use thiserror::Error;

/// Errors that can occur talking to the brokerage.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Positions or instruments could not be fetched (includes timeouts
    /// and malformed responses). The cycle is skipped.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Order was rejected, failed in transport, or timed out
    #[error(
        "Order failed{}: {message}",
        status.map(|s| format!(" (status {s})")).unwrap_or_default()
    )]
    Order {
        /// HTTP-style status when the upstream answered
        status: Option<u16>,
        /// Upstream or transport message
        message: String,
    },

    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] scalper_domain::DomainError),
}

impl ExecError {
    /// Order failure without an upstream status.
    pub fn order(message: impl Into<String>) -> Self {
        ExecError::Order { status: None, message: message.into() }
    }
}

/// Result type for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;
