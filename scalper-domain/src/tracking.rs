//! Cross-cycle tracking state and watermark math (pure functions).
//!
//! # Watermarks
//!
//! - LONG: `high_watermark` only rises (best price seen)
//! - SHORT: `low_watermark` only falls (best price seen)
//!
//! Pullback measures how far the last price has retraced from the
//! watermark, in percent of the watermark.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::snapshot::PositionSnapshot;
use crate::value_objects::{Price, Side};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Mutable state kept for one open symbol between monitor cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionTrackingState {
    /// Entry reference captured at first sighting
    pub entry_price: Price,
    /// Highest last price seen (used for longs)
    pub high_watermark: Price,
    /// Lowest last price seen (used for shorts)
    pub low_watermark: Price,
    /// Whether the partial-profit exit has been acknowledged
    pub partial_exit_done: bool,
    /// When the symbol was first tracked
    pub first_seen_at: DateTime<Utc>,
}

impl PositionTrackingState {
    /// Start tracking from a snapshot.
    ///
    /// Entry comes from the average price; both watermarks start at the
    /// last traded price.
    pub fn from_snapshot(snapshot: &PositionSnapshot) -> Self {
        Self {
            entry_price: snapshot.avg_entry_price,
            high_watermark: snapshot.last_traded_price,
            low_watermark: snapshot.last_traded_price,
            partial_exit_done: false,
            first_seen_at: Utc::now(),
        }
    }

    /// Extend the favorable watermark for `side` toward `last_price`.
    ///
    /// Returns `true` if the watermark moved.
    pub fn observe(&mut self, side: Side, last_price: Price) -> bool {
        match side {
            Side::Long => {
                let next = extend_watermark(side, self.high_watermark, last_price);
                let moved = next != self.high_watermark;
                self.high_watermark = next;
                moved
            }
            Side::Short => {
                let next = extend_watermark(side, self.low_watermark, last_price);
                let moved = next != self.low_watermark;
                self.low_watermark = next;
                moved
            }
        }
    }

    /// Watermark relevant to `side`.
    pub fn watermark(&self, side: Side) -> Price {
        match side {
            Side::Long => self.high_watermark,
            Side::Short => self.low_watermark,
        }
    }
}

/// New watermark after observing `last_price`.
///
/// # Examples
///
/// ```
/// # use scalper_domain::tracking::extend_watermark;
/// # use scalper_domain::value_objects::{Price, Side};
/// # use rust_decimal_macros::dec;
/// let high = Price::new(dec!(130)).unwrap();
/// let next = extend_watermark(Side::Long, high, Price::new(dec!(120)).unwrap());
/// assert_eq!(next, high); // never falls for a long
/// ```
pub fn extend_watermark(side: Side, watermark: Price, last_price: Price) -> Price {
    match side {
        Side::Long => watermark.max(last_price),
        Side::Short => watermark.min(last_price),
    }
}

/// Direction-adjusted P&L in percent of `entry`.
///
/// - LONG: `(last - entry) / entry * 100`
/// - SHORT: `(entry - last) / entry * 100`
///
/// `None` if the result does not fit in a `Decimal`.
pub fn pnl_percent(side: Side, entry: Price, last_price: Price) -> Option<Decimal> {
    let entry = entry.as_decimal();
    let last = last_price.as_decimal();
    let gain = match side {
        Side::Long => last.checked_sub(entry)?,
        Side::Short => entry.checked_sub(last)?,
    };
    percent_of(gain, entry)
}

/// Retracement from the watermark in percent of the watermark.
///
/// - LONG: `(high - last) / high * 100`
/// - SHORT: `(last - low) / low * 100`
///
/// `None` if the result does not fit in a `Decimal`.
pub fn pullback_percent(side: Side, watermark: Price, last_price: Price) -> Option<Decimal> {
    let mark = watermark.as_decimal();
    let last = last_price.as_decimal();
    let retrace = match side {
        Side::Long => mark.checked_sub(last)?,
        Side::Short => last.checked_sub(mark)?,
    };
    percent_of(retrace, mark)
}

fn percent_of(part: Decimal, whole: Decimal) -> Option<Decimal> {
    part.checked_div(whole)?.checked_mul(HUNDRED)
}

// =============================================================================
// Tests
// =============================================================================
