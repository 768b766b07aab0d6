//! Scalping configuration.
//!
//! Process-wide exit-rule parameters. Read by every monitor cycle and
//! mutable through the admin API via [`ScalpingConfigPatch`].
//!
//! All percentage fields are decimal fractions (`0.25` = 25%).

use chrono::NaiveTime;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::value_objects::{DomainError, Side};

// =============================================================================
// ScalpingConfig
// =============================================================================

/// Exit-rule and session parameters.
///
/// # Invariants
/// - All percentage and fraction fields are non-negative
/// - `0 < partial_exit_fraction <= 1`
/// - `stop_tick_size > 0`
/// - `trading_start < trading_end <= square_off_time`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalpingConfig {
    /// Full exit once P&L reaches this fraction of entry (0.25 = 25%)
    pub profit_target_pct: Decimal,
    /// Full exit once loss reaches this fraction of entry
    pub stop_loss_pct: Decimal,
    /// Full exit on this pullback from the watermark, while in profit
    pub trailing_stop_pct: Decimal,
    /// Premium floor for the low-premium exit
    pub min_premium: Decimal,
    /// P&L percent (in percent units, 5 = 5%) required by the low-premium exit
    pub low_premium_min_pnl_pct: Decimal,
    /// Fraction of the profit target at which the partial exit fires
    pub partial_trigger_ratio: Decimal,
    /// Fraction of the open quantity closed by the partial exit
    pub partial_exit_fraction: Decimal,
    /// Default stop multiplier applied to the average price of long positions
    pub long_stop_multiplier: Decimal,
    /// Default stop multiplier applied to the average price of short positions
    pub short_stop_multiplier: Decimal,
    /// Price step the default stop is rounded to
    pub stop_tick_size: Decimal,
    /// Largest position (in lots) the operator expects to hold
    pub max_position_lots: u32,
    /// Timezone the session boundaries are expressed in
    pub timezone: Tz,
    /// Start of the active trading window
    pub trading_start: NaiveTime,
    /// End of the active trading window
    pub trading_end: NaiveTime,
    /// Forced square-off time
    pub square_off_time: NaiveTime,
}

impl Default for ScalpingConfig {
    fn default() -> Self {
        Self {
            profit_target_pct: dec!(0.25),
            stop_loss_pct: dec!(0.15),
            trailing_stop_pct: dec!(0.10),
            min_premium: dec!(10),
            low_premium_min_pnl_pct: dec!(5),
            partial_trigger_ratio: dec!(0.6),
            partial_exit_fraction: dec!(0.5),
            long_stop_multiplier: dec!(0.5),
            short_stop_multiplier: dec!(1.5),
            stop_tick_size: dec!(0.05),
            max_position_lots: 5,
            timezone: chrono_tz::Asia::Kolkata,
            trading_start: hm(9, 30),
            trading_end: hm(15, 0),
            square_off_time: hm(15, 15),
        }
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

impl ScalpingConfig {
    /// Check every invariant.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidConfig` naming the first violated field,
    /// or `DomainError::InvalidTime` if the session boundaries are out of order.
    pub fn validate(&self) -> Result<(), DomainError> {
        let non_negative = [
            ("profit_target_pct", self.profit_target_pct),
            ("stop_loss_pct", self.stop_loss_pct),
            ("trailing_stop_pct", self.trailing_stop_pct),
            ("min_premium", self.min_premium),
            ("low_premium_min_pnl_pct", self.low_premium_min_pnl_pct),
            ("partial_trigger_ratio", self.partial_trigger_ratio),
            ("long_stop_multiplier", self.long_stop_multiplier),
            ("short_stop_multiplier", self.short_stop_multiplier),
        ];
        for (field, value) in non_negative {
            if value < Decimal::ZERO {
                return Err(DomainError::InvalidConfig(format!(
                    "{field} must be non-negative, got {value}"
                )));
            }
        }

        if self.partial_exit_fraction <= Decimal::ZERO
            || self.partial_exit_fraction > Decimal::ONE
        {
            return Err(DomainError::InvalidConfig(format!(
                "partial_exit_fraction must be in (0, 1], got {}",
                self.partial_exit_fraction
            )));
        }

        if self.stop_tick_size <= Decimal::ZERO {
            return Err(DomainError::InvalidConfig(format!(
                "stop_tick_size must be positive, got {}",
                self.stop_tick_size
            )));
        }

        if self.trading_start >= self.trading_end {
            return Err(DomainError::InvalidTime(format!(
                "trading_start {} must be before trading_end {}",
                self.trading_start, self.trading_end
            )));
        }

        if self.trading_end > self.square_off_time {
            return Err(DomainError::InvalidTime(format!(
                "trading_end {} must not be after square_off_time {}",
                self.trading_end, self.square_off_time
            )));
        }

        Ok(())
    }

    /// Return a copy with `patch` applied, validated.
    ///
    /// The receiver is never modified, so a rejected patch leaves the
    /// current configuration in place.
    pub fn patched(&self, patch: &ScalpingConfigPatch) -> Result<Self, DomainError> {
        let mut next = self.clone();
        if let Some(v) = patch.profit_target_pct {
            next.profit_target_pct = v;
        }
        if let Some(v) = patch.stop_loss_pct {
            next.stop_loss_pct = v;
        }
        if let Some(v) = patch.trailing_stop_pct {
            next.trailing_stop_pct = v;
        }
        if let Some(v) = patch.min_premium {
            next.min_premium = v;
        }
        if let Some(v) = patch.max_position_lots {
            next.max_position_lots = v;
        }
        next.validate()?;
        Ok(next)
    }

    /// Default stop multiplier for a position side.
    pub fn stop_multiplier(&self, side: Side) -> Decimal {
        match side {
            Side::Long => self.long_stop_multiplier,
            Side::Short => self.short_stop_multiplier,
        }
    }
}

// =============================================================================
// ScalpingConfigPatch
// =============================================================================

/// Partial update to [`ScalpingConfig`].
///
/// Unspecified fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalpingConfigPatch {
    /// New profit target
    #[serde(default)]
    pub profit_target_pct: Option<Decimal>,
    /// New stop loss
    #[serde(default)]
    pub stop_loss_pct: Option<Decimal>,
    /// New trailing stop
    #[serde(default)]
    pub trailing_stop_pct: Option<Decimal>,
    /// New premium floor
    #[serde(default)]
    pub min_premium: Option<Decimal>,
    /// New position size ceiling in lots
    #[serde(default)]
    pub max_position_lots: Option<u32>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ScalpingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.profit_target_pct, dec!(0.25));
        assert_eq!(config.square_off_time, hm(15, 15));
    }

    #[test]
    fn test_patch_keeps_unspecified_fields() {
        let config = ScalpingConfig::default();
        let patch = ScalpingConfigPatch {
            stop_loss_pct: Some(dec!(0.2)),
            ..Default::default()
        };

        let next = config.patched(&patch).unwrap();

        assert_eq!(next.stop_loss_pct, dec!(0.2));
        assert_eq!(next.profit_target_pct, config.profit_target_pct);
        assert_eq!(next.trailing_stop_pct, config.trailing_stop_pct);
        assert_eq!(next.max_position_lots, config.max_position_lots);
    }

    #[test]
    fn test_patch_rejects_negative_percentage() {
        let config = ScalpingConfig::default();
        let patch = ScalpingConfigPatch {
            trailing_stop_pct: Some(dec!(-0.1)),
            ..Default::default()
        };

        let err = config.patched(&patch).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidConfig(msg) if msg.contains("trailing_stop_pct")
        ));
        // Receiver untouched
        assert_eq!(config.trailing_stop_pct, dec!(0.10));
    }

    #[test]
    fn test_validate_session_ordering() {
        let mut config = ScalpingConfig::default();
        config.trading_end = hm(9, 0);
        assert!(matches!(config.validate(), Err(DomainError::InvalidTime(_))));

        let mut config = ScalpingConfig::default();
        config.square_off_time = hm(14, 0);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, DomainError::InvalidTime(msg) if msg.contains("square_off_time")));

        // trading_end == square_off_time is allowed
        let mut config = ScalpingConfig::default();
        config.square_off_time = config.trading_end;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_partial_fraction_bounds() {
        let mut config = ScalpingConfig::default();
        config.partial_exit_fraction = Decimal::ZERO;
        assert!(config.validate().is_err());

        config.partial_exit_fraction = dec!(1.5);
        assert!(config.validate().is_err());

        config.partial_exit_fraction = Decimal::ONE;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_patch_deserializes_partial_json() {
        let patch: ScalpingConfigPatch =
            serde_json::from_str(r#"{"profit_target_pct": "0.3"}"#).unwrap();

        assert_eq!(patch.profit_target_pct, Some(dec!(0.3)));
        assert_eq!(patch.stop_loss_pct, None);
    }

    #[test]
    fn test_stop_multiplier_by_side() {
        let config = ScalpingConfig::default();
        assert_eq!(config.stop_multiplier(Side::Long), dec!(0.5));
        assert_eq!(config.stop_multiplier(Side::Short), dec!(1.5));
    }
}
