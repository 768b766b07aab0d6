//! Execution layer port definitions.
//!
//! Ports define the interface to the upstream paper-trading brokerage.
//! Adapters implement them for specific services (REST client, stub).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use scalper_domain::{ExitReason, InstrumentInfo, OrderSide, Price, UnderlyingPositions};

use crate::error::ExecError;

// =============================================================================
// Session Context
// =============================================================================

/// Portfolio and credentials every upstream call runs under.
///
/// Owned by the monitor and passed explicitly; there is no process-wide
/// portfolio or token.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Portfolio whose positions are monitored
    pub portfolio_id: String,
    /// Bearer token, if the upstream requires one
    pub access_token: Option<String>,
}

impl SessionContext {
    /// Create a session for `portfolio_id`.
    pub fn new(portfolio_id: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            portfolio_id: portfolio_id.into(),
            access_token,
        }
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("portfolio_id", &self.portfolio_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .finish()
    }
}

// =============================================================================
// Broker Port
// =============================================================================

/// Port for the paper-trading brokerage.
///
/// Implementations:
/// - `StubBroker` - For testing and development (scriptable, in-memory)
/// - `PaperTradingClient` - HTTP client (scalper-connectors)
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// Fetch open positions, grouped by underlying.
    ///
    /// Rows may include flat (zero quantity) positions.
    async fn fetch_positions(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<UnderlyingPositions>, ExecError>;

    /// Fetch instrument reference data (lot size, expiry, strike).
    async fn fetch_instruments(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<InstrumentInfo>, ExecError>;

    /// Submit a market order.
    ///
    /// # Returns
    ///
    /// `OrderAck` once the upstream accepted the order.
    async fn submit_order(
        &self,
        session: &SessionContext,
        request: &OrderRequest,
    ) -> Result<OrderAck, ExecError>;
}

/// Market order closing (part of) a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Client-generated ID (UUIDv7) for tracing
    pub client_order_id: String,
    /// Instrument symbol
    pub symbol: String,
    /// Buy or Sell (inverse of the position side)
    pub side: OrderSide,
    /// Units to trade
    pub quantity: u64,
    /// Last traded price when the decision was made
    pub reference_price: Price,
    /// Rule that produced the order
    pub reason: ExitReason,
}

/// Upstream acknowledgement of an accepted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    /// Upstream-assigned order ID
    pub order_id: String,
    /// Echo of the client order ID
    pub client_order_id: String,
    /// When the acknowledgement was received
    pub accepted_at: DateTime<Utc>,
}

// =============================================================================
// Tests
// =============================================================================
