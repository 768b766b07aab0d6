//! Session clock.
//!
//! Classifies a wall-clock instant into a trading-session phase using the
//! boundaries and timezone of a [`ScalpingConfig`]. Pure functions only.
//!
//! ```text
//!   PreOpen   |   Active    | AwaitingSquareOff |  PastSquareOff
//! ------------+-------------+-------------------+----------------->
//!        trading_start  trading_end      square_off_time
//! ```

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ScalpingConfig;

/// Trading-session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    /// Before `trading_start`
    PreOpen,
    /// `trading_start <= now < trading_end`: exit rules are evaluated
    Active,
    /// `trading_end <= now < square_off_time`: positions are held
    AwaitingSquareOff,
    /// `now >= square_off_time`: every open position is liquidated
    PastSquareOff,
}

impl SessionPhase {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::PreOpen => "pre_open",
            SessionPhase::Active => "active",
            SessionPhase::AwaitingSquareOff => "awaiting_square_off",
            SessionPhase::PastSquareOff => "past_square_off",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a local time-of-day.
pub fn classify(config: &ScalpingConfig, now_local: NaiveTime) -> SessionPhase {
    if now_local >= config.square_off_time {
        SessionPhase::PastSquareOff
    } else if now_local >= config.trading_end {
        SessionPhase::AwaitingSquareOff
    } else if now_local >= config.trading_start {
        SessionPhase::Active
    } else {
        SessionPhase::PreOpen
    }
}

/// Classify a UTC instant after converting it into the configured timezone.
pub fn classify_utc(config: &ScalpingConfig, now: DateTime<Utc>) -> SessionPhase {
    classify(config, now.with_timezone(&config.timezone).time())
}

// =============================================================================
// Tests
// =============================================================================
