//! Scalper Brokerage Connectors
//!
//! Adapters for the paper-trading brokerage API.
//! Normalizes wire types to domain types.

#![warn(clippy::all)]

pub mod paper_rest;

pub use paper_rest::{
    InstrumentDto, OrderResponse, PaperApiError, PaperTradingClient, PositionDto, UnderlyingDto,
};
