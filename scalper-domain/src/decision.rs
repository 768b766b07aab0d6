//! Exit decisions produced by the rule engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position is being (partly) closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    /// P&L reached the profit target
    ProfitTarget,
    /// Loss reached the stop loss
    StopLoss,
    /// P&L reached the partial-profit threshold
    PartialProfit,
    /// Price pulled back from the watermark while in profit
    TrailingStop,
    /// Premium fell below the floor while in profit
    LowPremium,
    /// Session reached the square-off time
    ForceSquareOff,
}

impl ExitReason {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::ProfitTarget => "PROFIT_TARGET",
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::PartialProfit => "PARTIAL_PROFIT",
            ExitReason::TrailingStop => "TRAILING_STOP",
            ExitReason::LowPremium => "LOW_PREMIUM",
            ExitReason::ForceSquareOff => "FORCE_SQUARE_OFF",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one position for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitDecision {
    /// Keep the position
    None,
    /// Close part of the position; tracking continues
    Partial {
        /// Units to close
        quantity: u64,
        /// Rule that fired
        reason: ExitReason,
    },
    /// Close the whole position; tracking ends once acknowledged
    Full {
        /// Units to close
        quantity: u64,
        /// Rule that fired
        reason: ExitReason,
    },
}

impl ExitDecision {
    /// Whether an order must be submitted.
    pub fn is_exit(&self) -> bool {
        !matches!(self, ExitDecision::None)
    }

    /// Units to close (0 for `None`).
    pub fn quantity(&self) -> u64 {
        match self {
            ExitDecision::None => 0,
            ExitDecision::Partial { quantity, .. } | ExitDecision::Full { quantity, .. } => {
                *quantity
            }
        }
    }

    /// Rule that fired, if any.
    pub fn reason(&self) -> Option<ExitReason> {
        match self {
            ExitDecision::None => None,
            ExitDecision::Partial { reason, .. } | ExitDecision::Full { reason, .. } => {
                Some(*reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_accessors() {
        let full = ExitDecision::Full { quantity: 100, reason: ExitReason::StopLoss };
        assert!(full.is_exit());
        assert_eq!(full.quantity(), 100);
        assert_eq!(full.reason(), Some(ExitReason::StopLoss));

        assert!(!ExitDecision::None.is_exit());
        assert_eq!(ExitDecision::None.quantity(), 0);
        assert_eq!(ExitDecision::None.reason(), None);
    }

    #[test]
    fn test_reason_serialization_matches_label() {
        for reason in [
            ExitReason::ProfitTarget,
            ExitReason::StopLoss,
            ExitReason::PartialProfit,
            ExitReason::TrailingStop,
            ExitReason::LowPremium,
            ExitReason::ForceSquareOff,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{}\"", reason.as_str()));
        }
    }
}
