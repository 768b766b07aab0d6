//! Position snapshots.
//!
//! Upstream position groups and instrument metadata are merged into one
//! normalized [`PositionSnapshot`] per open symbol. Snapshots are rebuilt
//! every monitor cycle and never mutated afterwards.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::ScalpingConfig;
use crate::value_objects::{round_to_step, DomainError, Price, Side};

// =============================================================================
// Upstream records
// =============================================================================

/// Open positions reported under one underlying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderlyingPositions {
    /// Underlying name (e.g., NIFTY)
    pub underlying: String,
    /// Positions held on contracts of this underlying
    pub positions: Vec<RawPosition>,
}

/// One position row as reported by the brokerage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPosition {
    /// Instrument symbol
    pub symbol: String,
    /// Signed open quantity (negative = short)
    pub net_quantity: i64,
    /// Average entry price
    pub average_price: Decimal,
    /// Last traded price
    pub last_price: Decimal,
    /// Realized P&L
    pub realized_pnl: Decimal,
    /// Unrealized P&L
    pub unrealized_pnl: Decimal,
}

/// Reference data for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentInfo {
    /// Instrument symbol
    pub symbol: String,
    /// Contract expiry
    pub expiry: Option<NaiveDate>,
    /// Option strike
    pub strike: Option<Decimal>,
    /// Minimum tradable unit
    pub lot_size: Option<u32>,
    /// Instrument type (e.g., CE, PE, FUT)
    pub instrument_type: Option<String>,
}

// =============================================================================
// PositionSnapshot
// =============================================================================

/// Normalized per-symbol view of an open position.
///
/// # Invariants
/// - `lot_size`, when present, is > 0
/// - `|signed_quantity|` is assumed to be a multiple of `lot_size`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// Instrument symbol, unique within a cycle
    pub symbol: String,
    /// Underlying the position was reported under
    pub underlying: String,
    /// Signed quantity (negative = short, zero = flat)
    pub signed_quantity: i64,
    /// Average entry price
    pub avg_entry_price: Price,
    /// Last traded price
    pub last_traded_price: Price,
    /// Realized P&L reported upstream
    pub realized_pnl: Decimal,
    /// Unrealized P&L reported upstream
    pub unrealized_pnl: Decimal,
    /// Lot size (absent when instrument metadata is missing)
    pub lot_size: Option<u32>,
    /// Contract expiry
    pub expiry: Option<NaiveDate>,
    /// Option strike
    pub strike: Option<Decimal>,
    /// Instrument type
    pub instrument_type: Option<String>,
    /// Stop derived from the average price and direction
    pub default_stop_loss: Decimal,
}

impl PositionSnapshot {
    /// Create a snapshot with no instrument metadata and a zero default stop.
    ///
    /// Mostly useful for tests and stubs; the monitor builds snapshots with
    /// [`build_snapshots`].
    pub fn new(
        symbol: impl Into<String>,
        signed_quantity: i64,
        avg_entry_price: Price,
        last_traded_price: Price,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            underlying: String::new(),
            signed_quantity,
            avg_entry_price,
            last_traded_price,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            lot_size: None,
            expiry: None,
            strike: None,
            instrument_type: None,
            default_stop_loss: Decimal::ZERO,
        }
    }

    /// Set the lot size.
    pub fn with_lot_size(mut self, lot_size: u32) -> Self {
        self.lot_size = (lot_size > 0).then_some(lot_size);
        self
    }

    /// Position direction, `None` when flat.
    pub fn side(&self) -> Option<Side> {
        Side::from_signed_quantity(self.signed_quantity)
    }

    /// Whether the position is flat.
    pub fn is_flat(&self) -> bool {
        self.signed_quantity == 0
    }

    /// Absolute open quantity.
    pub fn abs_quantity(&self) -> u64 {
        self.signed_quantity.unsigned_abs()
    }

    /// Open quantity expressed in lots, when the lot size is known.
    pub fn lots(&self) -> Option<u64> {
        self.lot_size.map(|lot| self.abs_quantity() / u64::from(lot))
    }
}

/// Default stop for a position: average price times the side's multiplier,
/// rounded to the configured tick.
///
/// # Errors
/// Returns `DomainError::InvalidPrice` if the stop overflows a `Decimal`.
pub fn default_stop_loss(
    config: &ScalpingConfig,
    side: Side,
    avg_entry_price: Price,
) -> Result<Decimal, DomainError> {
    avg_entry_price
        .as_decimal()
        .checked_mul(config.stop_multiplier(side))
        .and_then(|stop| round_to_step(stop, config.stop_tick_size))
        .ok_or_else(|| {
            DomainError::InvalidPrice(format!("default stop for {avg_entry_price} overflows"))
        })
}

/// Merge upstream position groups with instrument metadata.
///
/// Rows with zero quantity are dropped. Missing metadata leaves the
/// dependent fields empty; the row is kept.
///
/// # Errors
/// Returns `DomainError::InvalidPrice` if an open row carries a
/// non-positive average or last price, or one too large to derive a stop
/// from (malformed upstream data).
pub fn build_snapshots(
    groups: &[UnderlyingPositions],
    instruments: &[InstrumentInfo],
    config: &ScalpingConfig,
) -> Result<Vec<PositionSnapshot>, DomainError> {
    let by_symbol: HashMap<&str, &InstrumentInfo> =
        instruments.iter().map(|info| (info.symbol.as_str(), info)).collect();

    let mut snapshots = Vec::new();

    for group in groups {
        for raw in &group.positions {
            let Some(side) = Side::from_signed_quantity(raw.net_quantity) else {
                continue;
            };

            let avg_entry_price = Price::new(raw.average_price).map_err(|e| {
                DomainError::InvalidPrice(format!("{}: average price: {e}", raw.symbol))
            })?;
            let last_traded_price = Price::new(raw.last_price).map_err(|e| {
                DomainError::InvalidPrice(format!("{}: last price: {e}", raw.symbol))
            })?;

            let stop_loss = default_stop_loss(config, side, avg_entry_price)
                .map_err(|e| DomainError::InvalidPrice(format!("{}: {e}", raw.symbol)))?;
            let info = by_symbol.get(raw.symbol.as_str());

            snapshots.push(PositionSnapshot {
                symbol: raw.symbol.clone(),
                underlying: group.underlying.clone(),
                signed_quantity: raw.net_quantity,
                avg_entry_price,
                last_traded_price,
                realized_pnl: raw.realized_pnl,
                unrealized_pnl: raw.unrealized_pnl,
                lot_size: info.and_then(|i| i.lot_size).filter(|lot| *lot > 0),
                expiry: info.and_then(|i| i.expiry),
                strike: info.and_then(|i| i.strike),
                instrument_type: info.and_then(|i| i.instrument_type.clone()),
                default_stop_loss: stop_loss,
            });
        }
    }

    Ok(snapshots)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn raw(symbol: &str, qty: i64, avg: Decimal, ltp: Decimal) -> RawPosition {
        RawPosition {
            symbol: symbol.to_string(),
            net_quantity: qty,
            average_price: avg,
            last_price: ltp,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
        }
    }

    fn info(symbol: &str, lot: u32) -> InstrumentInfo {
        InstrumentInfo {
            symbol: symbol.to_string(),
            expiry: NaiveDate::from_ymd_opt(2024, 3, 28),
            strike: Some(dec!(22000)),
            lot_size: Some(lot),
            instrument_type: Some("CE".to_string()),
        }
    }

    #[test]
    fn test_build_joins_metadata_and_flattens_groups() {
        let groups = vec![
            UnderlyingPositions {
                underlying: "NIFTY".to_string(),
                positions: vec![raw("NIFTY24MAR22000CE", 100, dec!(120), dec!(126))],
            },
            UnderlyingPositions {
                underlying: "BANKNIFTY".to_string(),
                positions: vec![raw("BANKNIFTY24MAR47000PE", -30, dec!(200), dec!(190))],
            },
        ];
        let instruments = vec![info("NIFTY24MAR22000CE", 50), info("BANKNIFTY24MAR47000PE", 15)];

        let snapshots = build_snapshots(&groups, &instruments, &ScalpingConfig::default()).unwrap();

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].underlying, "NIFTY");
        assert_eq!(snapshots[0].lot_size, Some(50));
        assert_eq!(snapshots[0].lots(), Some(2));
        assert_eq!(snapshots[1].underlying, "BANKNIFTY");
        assert_eq!(snapshots[1].side(), Some(Side::Short));
        assert_eq!(snapshots[1].instrument_type.as_deref(), Some("CE"));
    }

    #[test]
    fn test_missing_metadata_keeps_row() {
        let groups = vec![UnderlyingPositions {
            underlying: "NIFTY".to_string(),
            positions: vec![raw("UNKNOWN", 50, dec!(80), dec!(82))],
        }];

        let snapshots = build_snapshots(&groups, &[], &ScalpingConfig::default()).unwrap();

        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].lot_size, None);
        assert_eq!(snapshots[0].expiry, None);
        assert_eq!(snapshots[0].lots(), None);
    }

    #[test]
    fn test_flat_rows_are_dropped_even_with_zero_prices() {
        let groups = vec![UnderlyingPositions {
            underlying: "NIFTY".to_string(),
            positions: vec![raw("CLOSED", 0, Decimal::ZERO, Decimal::ZERO)],
        }];

        let snapshots = build_snapshots(&groups, &[], &ScalpingConfig::default()).unwrap();
        assert!(snapshots.is_empty());
    }

    #[test]
    fn test_malformed_open_row_fails_build() {
        let groups = vec![UnderlyingPositions {
            underlying: "NIFTY".to_string(),
            positions: vec![raw("BROKEN", 50, dec!(100), Decimal::ZERO)],
        }];

        let result = build_snapshots(&groups, &[], &ScalpingConfig::default());
        assert!(matches!(result, Err(DomainError::InvalidPrice(msg)) if msg.contains("BROKEN")));
    }

    #[test]
    fn test_oversized_price_fails_build() {
        // Short stop is avg * 1.5, which does not fit
        let groups = vec![UnderlyingPositions {
            underlying: "NIFTY".to_string(),
            positions: vec![raw("HUGE", -50, Decimal::MAX, dec!(100))],
        }];

        let result = build_snapshots(&groups, &[], &ScalpingConfig::default());
        assert!(matches!(result, Err(DomainError::InvalidPrice(msg)) if msg.contains("HUGE")));
    }

    #[test]
    fn test_zero_lot_size_treated_as_absent() {
        let groups = vec![UnderlyingPositions {
            underlying: "NIFTY".to_string(),
            positions: vec![raw("ODD", 50, dec!(100), dec!(100))],
        }];

        let snapshots =
            build_snapshots(&groups, &[info("ODD", 0)], &ScalpingConfig::default()).unwrap();
        assert_eq!(snapshots[0].lot_size, None);
    }

    #[test]
    fn test_default_stop_loss_by_direction() {
        let config = ScalpingConfig::default();
        let avg = Price::new(dec!(123.3)).unwrap();

        // Long: 123.3 * 0.5 = 61.65
        assert_eq!(default_stop_loss(&config, Side::Long, avg).unwrap(), dec!(61.65));
        // Short: 123.3 * 1.5 = 184.95
        assert_eq!(default_stop_loss(&config, Side::Short, avg).unwrap(), dec!(184.95));

        // 101.1 * 0.5 = 50.55 stays, 101.13 * 0.5 = 50.565 rounds to 50.55
        let avg = Price::new(dec!(101.13)).unwrap();
        assert_eq!(default_stop_loss(&config, Side::Long, avg).unwrap(), dec!(50.55));
    }

    #[test]
    fn test_default_stop_loss_uses_configured_multiplier() {
        let mut config = ScalpingConfig::default();
        config.long_stop_multiplier = dec!(0.33);
        let avg = Price::new(dec!(100)).unwrap();

        // 33.00 exactly on the grid
        assert_eq!(default_stop_loss(&config, Side::Long, avg).unwrap(), dec!(33));
    }
}
