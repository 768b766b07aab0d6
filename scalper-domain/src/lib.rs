//! Scalper Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains value objects, configuration, session gating, position
//! snapshots, tracking state and exit decisions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod decision;
pub mod session;
pub mod snapshot;
pub mod tracking;
pub mod value_objects;

pub use config::{ScalpingConfig, ScalpingConfigPatch};
pub use decision::{ExitDecision, ExitReason};
pub use session::{classify, classify_utc, SessionPhase};
pub use snapshot::{
    build_snapshots, default_stop_loss, InstrumentInfo, PositionSnapshot, RawPosition,
    UnderlyingPositions,
};
pub use tracking::{pnl_percent, pullback_percent, PositionTrackingState};
pub use value_objects::{round_to_step, DomainError, OrderSide, Price, Side};
