//! Scalper Engine Layer
//!
//! Pure decision logic, deterministic, no I/O.
//! Takes a snapshot and its tracking state → returns an exit decision.

#![warn(clippy::all)]

pub mod rules;

pub use rules::{evaluate, force_square_off};
