//! Storage layer errors

use thiserror::Error;

/// Errors that can occur in the tracking store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No tracking state exists for the symbol
    #[error("Symbol not tracked: {symbol}")]
    NotTracked {
        /// Instrument symbol
        symbol: String,
    },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
