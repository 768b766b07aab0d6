//! Value Objects for the Scalper Domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain errors for value object and configuration validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Price must be positive
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Quantity must be non-zero where a position is required
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Scalping configuration rejected (original config is kept)
    #[error("Invalid scalping config: {0}")]
    InvalidConfig(String),

    /// Session boundaries out of order
    #[error("Invalid time: {0}")]
    InvalidTime(String),
}

// =============================================================================
// Price
// =============================================================================

/// Price represents a positive decimal quote
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    /// Create a new Price with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPrice` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidPrice(format!("Price must be positive, got {value}")));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Round `value` to the nearest multiple of `step`.
///
/// Midpoints round away from zero, so `52.525` with a `0.05` step becomes
/// `52.55`. A non-positive step returns `value` unchanged. Returns `None`
/// if the result does not fit in a `Decimal`.
///
/// # Examples
/// ```
/// # use scalper_domain::value_objects::round_to_step;
/// # use rust_decimal_macros::dec;
/// assert_eq!(round_to_step(dec!(61.23), dec!(0.05)), Some(dec!(61.25)));
/// assert_eq!(round_to_step(dec!(61.22), dec!(0.05)), Some(dec!(61.20)));
/// ```
pub fn round_to_step(value: Decimal, step: Decimal) -> Option<Decimal> {
    if step <= Decimal::ZERO {
        return Some(value);
    }
    let steps = value
        .checked_div(step)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    steps.checked_mul(step).map(|rounded| rounded.normalize())
}

// =============================================================================
// Side
// =============================================================================

/// Side represents the position direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Long position (bought, profits when price rises)
    Long,
    /// Short position (sold, profits when price falls)
    Short,
}

impl Side {
    /// Derive the side from a signed quantity.
    ///
    /// Returns `None` for a flat (zero) quantity.
    pub fn from_signed_quantity(quantity: i64) -> Option<Self> {
        match quantity.signum() {
            1 => Some(Side::Long),
            -1 => Some(Side::Short),
            _ => None,
        }
    }

    /// Get the exit action for this side
    ///
    /// Long → Sell, Short → Buy
    pub fn exit_action(&self) -> OrderSide {
        match self {
            Side::Long => OrderSide::Sell,
            Side::Short => OrderSide::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// OrderSide represents the order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    /// Buy order
    Buy,
    /// Sell order
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
