//! Exit Rule Ladder
//!
//! Every cycle, each open position runs through a fixed ladder of rules.
//! The first rule that matches decides; later rules are not consulted.
//!
//! ```text
//! 1. Profit target   pnl >= target                     → Full
//! 2. Stop loss       pnl <= -stop                      → Full
//! 3. Partial profit  pnl >= target * trigger_ratio     → Partial
//!                    (once, position of at least 2 lots)
//! 4. Trailing stop   pnl > 0 and pullback >= trailing  → Full
//! 5. Low premium     ltp < floor and pnl > min_pnl     → Full
//! ```
//!
//! Percent fields of the config are fractions; the comparisons above run
//! in percent units (`0.25` → `25`). A position whose numbers overflow
//! `Decimal` is skipped for the cycle.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use scalper_domain::{
    pnl_percent, pullback_percent, ExitDecision, ExitReason, PositionSnapshot,
    PositionTrackingState, ScalpingConfig, Side,
};
use tracing::{debug, warn};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Evaluate the rule ladder for one position.
///
/// Extends the tracking watermark before any rule runs; that is the only
/// change made to `state`. Acknowledgement-dependent changes (clearing the
/// state, setting `partial_exit_done`) belong to the caller.
///
/// A flat snapshot returns [`ExitDecision::None`] without touching `state`.
pub fn evaluate(
    snapshot: &PositionSnapshot,
    state: &mut PositionTrackingState,
    config: &ScalpingConfig,
) -> ExitDecision {
    let Some(side) = snapshot.side() else {
        return ExitDecision::None;
    };

    state.observe(side, snapshot.last_traded_price);

    ladder(snapshot, side, state, config).unwrap_or_else(|| {
        warn!(
            symbol = %snapshot.symbol,
            entry = %state.entry_price,
            ltp = %snapshot.last_traded_price,
            "Exit rules overflowed, skipping position this cycle"
        );
        ExitDecision::None
    })
}

/// The rules proper. `None` means an intermediate value overflowed.
fn ladder(
    snapshot: &PositionSnapshot,
    side: Side,
    state: &PositionTrackingState,
    config: &ScalpingConfig,
) -> Option<ExitDecision> {
    let abs_qty = snapshot.abs_quantity();
    let ltp = snapshot.last_traded_price;

    let pnl = pnl_percent(side, state.entry_price, ltp)?;
    let profit_target = config.profit_target_pct.checked_mul(HUNDRED)?;

    if pnl >= profit_target {
        return Some(full(snapshot, abs_qty, ExitReason::ProfitTarget, pnl));
    }

    if pnl <= -config.stop_loss_pct.checked_mul(HUNDRED)? {
        return Some(full(snapshot, abs_qty, ExitReason::StopLoss, pnl));
    }

    let partial_trigger = profit_target.checked_mul(config.partial_trigger_ratio)?;
    if pnl >= partial_trigger && !state.partial_exit_done {
        if let Some(quantity) = partial_quantity(snapshot, config) {
            debug!(
                symbol = %snapshot.symbol,
                %pnl,
                quantity,
                "Partial profit triggered"
            );
            return Some(ExitDecision::Partial {
                quantity,
                reason: ExitReason::PartialProfit,
            });
        }
    }

    if pnl > Decimal::ZERO {
        let pullback = pullback_percent(side, state.watermark(side), ltp)?;
        if pullback >= config.trailing_stop_pct.checked_mul(HUNDRED)? {
            debug!(symbol = %snapshot.symbol, %pullback, "Trailing stop triggered");
            return Some(full(snapshot, abs_qty, ExitReason::TrailingStop, pnl));
        }
    }

    if ltp.as_decimal() < config.min_premium && pnl > config.low_premium_min_pnl_pct {
        return Some(full(snapshot, abs_qty, ExitReason::LowPremium, pnl));
    }

    Some(ExitDecision::None)
}

/// Forced liquidation: every open position exits in full.
pub fn force_square_off(snapshot: &PositionSnapshot) -> ExitDecision {
    if snapshot.is_flat() {
        return ExitDecision::None;
    }
    ExitDecision::Full {
        quantity: snapshot.abs_quantity(),
        reason: ExitReason::ForceSquareOff,
    }
}

fn full(
    snapshot: &PositionSnapshot,
    quantity: u64,
    reason: ExitReason,
    pnl: Decimal,
) -> ExitDecision {
    debug!(symbol = %snapshot.symbol, %reason, %pnl, quantity, "Exit rule matched");
    ExitDecision::Full { quantity, reason }
}

/// Quantity closed by the partial exit, if the position qualifies.
///
/// Needs a known lot size and at least two lots open. The quantity is
/// `floor(abs_qty * partial_exit_fraction)`; zero means no partial exit.
fn partial_quantity(snapshot: &PositionSnapshot, config: &ScalpingConfig) -> Option<u64> {
    let lot_size = u64::from(snapshot.lot_size?);
    let abs_qty = snapshot.abs_quantity();
    if abs_qty < lot_size * 2 {
        return None;
    }

    let quantity = (Decimal::from(abs_qty) * config.partial_exit_fraction)
        .floor()
        .to_u64()?;
    (quantity > 0).then_some(quantity)
}

// =============================================================================
// Tests
// =============================================================================
