//! Scalper Storage Layer
//!
//! Per-position tracking state kept across monitor cycles.
//!
//! The store is in-memory only and owned exclusively by the monitor task,
//! so every mutation takes `&mut self` and no locking is involved. A
//! process restart starts tracking from scratch.
//!
//! # Usage
//!
//! ```rust
//! use scalper_domain::{ExitDecision, ExitReason, PositionSnapshot, Price};
//! use scalper_store::TrackingStore;
//! use rust_decimal_macros::dec;
//!
//! let mut store = TrackingStore::new();
//! let snapshot = PositionSnapshot::new(
//!     "NIFTY24MAR22000CE",
//!     50,
//!     Price::new(dec!(100)).unwrap(),
//!     Price::new(dec!(104)).unwrap(),
//! );
//!
//! store.upsert(&snapshot);
//! assert_eq!(store.len(), 1);
//!
//! // Acknowledged full exit ends tracking
//! let exit = ExitDecision::Full { quantity: 50, reason: ExitReason::ProfitTarget };
//! store.commit(&snapshot.symbol, &exit).unwrap();
//! assert!(store.is_empty());
//! ```

#![warn(clippy::all)]

mod error;
mod memory;

pub use error::{StoreError, StoreResult};
pub use memory::TrackingStore;
