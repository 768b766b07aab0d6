//! In-memory tracking store
//!
//! Keyed by symbol. One entry per open position the monitor has seen.

use crate::error::{StoreError, StoreResult};
use scalper_domain::{ExitDecision, PositionSnapshot, PositionTrackingState, Price, Side};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Tracking state for every open symbol
#[derive(Debug, Default)]
pub struct TrackingStore {
    states: HashMap<String, PositionTrackingState>,
}

impl TrackingStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracking state for `symbol`, if tracked
    pub fn get(&self, symbol: &str) -> Option<&PositionTrackingState> {
        self.states.get(symbol)
    }

    /// Start tracking `snapshot` if its symbol is not yet tracked.
    ///
    /// An existing entry is returned untouched.
    pub fn upsert(&mut self, snapshot: &PositionSnapshot) -> &mut PositionTrackingState {
        self.states.entry(snapshot.symbol.clone()).or_insert_with(|| {
            debug!(
                symbol = %snapshot.symbol,
                entry = %snapshot.avg_entry_price,
                ltp = %snapshot.last_traded_price,
                "Tracking new position"
            );
            PositionTrackingState::from_snapshot(snapshot)
        })
    }

    /// Extend the watermark for `symbol`.
    ///
    /// Returns whether the watermark moved.
    pub fn touch(&mut self, symbol: &str, side: Side, last_price: Price) -> StoreResult<bool> {
        let state = self
            .states
            .get_mut(symbol)
            .ok_or_else(|| StoreError::NotTracked { symbol: symbol.to_string() })?;
        Ok(state.observe(side, last_price))
    }

    /// Stop tracking `symbol`. Returns the removed state.
    pub fn clear(&mut self, symbol: &str) -> Option<PositionTrackingState> {
        self.states.remove(symbol)
    }

    /// Apply an acknowledged exit.
    ///
    /// - `Full`: tracking ends (no-op if the symbol was not tracked)
    /// - `Partial`: marks the partial exit as done
    /// - `None`: nothing
    ///
    /// # Errors
    /// `StoreError::NotTracked` for a partial exit on an untracked symbol.
    pub fn commit(&mut self, symbol: &str, decision: &ExitDecision) -> StoreResult<()> {
        match decision {
            ExitDecision::None => Ok(()),
            ExitDecision::Full { .. } => {
                self.clear(symbol);
                Ok(())
            }
            ExitDecision::Partial { .. } => {
                let state = self
                    .states
                    .get_mut(symbol)
                    .ok_or_else(|| StoreError::NotTracked { symbol: symbol.to_string() })?;
                state.partial_exit_done = true;
                Ok(())
            }
        }
    }

    /// Drop every entry whose symbol is not in `open`.
    ///
    /// Returns the dropped symbols.
    pub fn retain_open(&mut self, open: &HashSet<&str>) -> Vec<String> {
        let stale: Vec<String> = self
            .states
            .keys()
            .filter(|symbol| !open.contains(symbol.as_str()))
            .cloned()
            .collect();

        for symbol in &stale {
            self.states.remove(symbol);
        }
        stale
    }

    /// Sorted copy of every tracked state
    pub fn snapshot(&self) -> BTreeMap<String, PositionTrackingState> {
        self.states
            .iter()
            .map(|(symbol, state)| (symbol.clone(), state.clone()))
            .collect()
    }

    /// Number of tracked symbols
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
