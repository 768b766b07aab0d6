//! Paper-Trading REST API Client
//!
//! Provides REST API integration for:
//! - Querying open positions of a portfolio, grouped by underlying
//! - Querying instrument reference data (lot size, expiry, strike)
//! - Placing market orders for exits
//!
//! # Wire contract
//!
//! ```text
//! GET  {base}/portfolios/{id}/positions   → [UnderlyingDto]
//! GET  {base}/instruments                 → [InstrumentDto]
//! POST {base}/portfolios/{id}/orders      ← OrderBody, → OrderResponse
//! ```
//!
//! JSON bodies are camelCase. When the session carries an access token it
//! is sent as `Authorization: Bearer <token>`.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

use scalper_domain::{InstrumentInfo, OrderSide, RawPosition, UnderlyingPositions};
use scalper_exec::{BrokerPort, ExecError, OrderAck, OrderRequest, SessionContext};

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur in the paper-trading REST client.
#[derive(Debug, Clone, Error)]
pub enum PaperApiError {
    /// HTTP request failed (connect, TLS, body read)
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// API returned a non-2xx status
    #[error("Paper trading API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the body, or the raw body
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,
}

impl PaperApiError {
    /// Map a failed fetch into the port error.
    pub fn into_fetch_error(self) -> ExecError {
        ExecError::UpstreamUnavailable(self.to_string())
    }

    /// Map a failed order submission into the port error.
    pub fn into_order_error(self) -> ExecError {
        match self {
            PaperApiError::Api { status, message } => ExecError::Order {
                status: Some(status),
                message,
            },
            other => ExecError::order(other.to_string()),
        }
    }
}

// =============================================================================
// Paper Trading Client
// =============================================================================

/// HTTP client for the paper-trading brokerage.
pub struct PaperTradingClient {
    /// HTTP client
    client: Client,
    /// Base URL without trailing slash
    base_url: String,
    /// Per-request timeout
    request_timeout: Duration,
}

impl PaperTradingClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root (e.g., `http://localhost:4000/api`)
    /// * `request_timeout` - Upper bound for each HTTP call
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            request_timeout,
        }
    }

    /// API root this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn positions_url(&self, session: &SessionContext) -> String {
        format!("{}/portfolios/{}/positions", self.base_url, session.portfolio_id)
    }

    fn instruments_url(&self) -> String {
        format!("{}/instruments", self.base_url)
    }

    fn orders_url(&self, session: &SessionContext) -> String {
        format!("{}/portfolios/{}/orders", self.base_url, session.portfolio_id)
    }

    fn authorize(request: RequestBuilder, session: &SessionContext) -> RequestBuilder {
        match &session.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and decode a JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, PaperApiError> {
        let response = timeout(self.request_timeout, request.send())
            .await
            .map_err(|_| PaperApiError::Timeout)?
            .map_err(|e| PaperApiError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = timeout(self.request_timeout, response.text())
            .await
            .map_err(|_| PaperApiError::Timeout)?
            .map_err(|e| PaperApiError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|err| err.message)
                .unwrap_or(body);
            return Err(PaperApiError::Api { status: status.as_u16(), message });
        }

        serde_json::from_str(&body).map_err(|e| PaperApiError::Parse(e.to_string()))
    }

    // =========================================================================
    // Portfolio API
    // =========================================================================

    /// Get open positions of the session's portfolio.
    ///
    /// # Endpoint
    ///
    /// `GET /portfolios/{id}/positions`
    pub async fn get_positions(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<UnderlyingPositions>, PaperApiError> {
        let request = Self::authorize(self.client.get(self.positions_url(session)), session);
        let groups: Vec<UnderlyingDto> = self.send_json(request).await?;

        debug!(groups = groups.len(), "Fetched positions");
        Ok(groups.into_iter().map(UnderlyingPositions::from).collect())
    }

    /// Get instrument reference data.
    ///
    /// # Endpoint
    ///
    /// `GET /instruments`
    pub async fn get_instruments(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<InstrumentInfo>, PaperApiError> {
        let request = Self::authorize(self.client.get(self.instruments_url()), session);
        let instruments: Vec<InstrumentDto> = self.send_json(request).await?;

        Ok(instruments.into_iter().map(InstrumentInfo::from).collect())
    }

    // =========================================================================
    // Order API
    // =========================================================================

    /// Place a market order.
    ///
    /// # Endpoint
    ///
    /// `POST /portfolios/{id}/orders`
    pub async fn place_market_order(
        &self,
        session: &SessionContext,
        request: &OrderRequest,
    ) -> Result<OrderResponse, PaperApiError> {
        let body = OrderBody::from(request);
        let http = Self::authorize(self.client.post(self.orders_url(session)).json(&body), session);

        self.send_json(http).await
    }
}

#[async_trait]
impl BrokerPort for PaperTradingClient {
    async fn fetch_positions(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<UnderlyingPositions>, ExecError> {
        self.get_positions(session).await.map_err(PaperApiError::into_fetch_error)
    }

    async fn fetch_instruments(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<InstrumentInfo>, ExecError> {
        self.get_instruments(session).await.map_err(PaperApiError::into_fetch_error)
    }

    async fn submit_order(
        &self,
        session: &SessionContext,
        request: &OrderRequest,
    ) -> Result<OrderAck, ExecError> {
        let response = self
            .place_market_order(session, request)
            .await
            .map_err(PaperApiError::into_order_error)?;

        Ok(OrderAck {
            order_id: response.order_id,
            client_order_id: response
                .client_order_id
                .unwrap_or_else(|| request.client_order_id.clone()),
            accepted_at: Utc::now(),
        })
    }
}

// =============================================================================
// Wire Types
// =============================================================================

/// Error body.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(alias = "error")]
    message: String,
}

/// Positions under one underlying.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnderlyingDto {
    /// Underlying name
    pub underlying: String,
    /// Position rows
    #[serde(default)]
    pub positions: Vec<PositionDto>,
}

/// One position row.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDto {
    /// Instrument symbol
    pub symbol: String,
    /// Signed net quantity
    pub net_quantity: i64,
    /// Average entry price
    pub average_price: Decimal,
    /// Last traded price
    pub last_price: Decimal,
    /// Realized P&L
    #[serde(default)]
    pub realized_pnl: Decimal,
    /// Unrealized P&L
    #[serde(default)]
    pub unrealized_pnl: Decimal,
}

/// Instrument reference data.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentDto {
    /// Instrument symbol
    pub symbol: String,
    /// Expiry date (YYYY-MM-DD)
    #[serde(default)]
    pub expiry: Option<NaiveDate>,
    /// Strike price
    #[serde(default)]
    pub strike: Option<Decimal>,
    /// Lot size
    #[serde(default)]
    pub lot_size: Option<u32>,
    /// Instrument type (CE, PE, FUT)
    #[serde(default)]
    pub instrument_type: Option<String>,
}

/// Order request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderBody<'a> {
    client_order_id: &'a str,
    symbol: &'a str,
    side: OrderSide,
    quantity: u64,
    order_type: &'static str,
    price: Decimal,
    tag: &'static str,
}

impl<'a> From<&'a OrderRequest> for OrderBody<'a> {
    fn from(request: &'a OrderRequest) -> Self {
        Self {
            client_order_id: &request.client_order_id,
            symbol: &request.symbol,
            side: request.side,
            quantity: request.quantity,
            order_type: "MARKET",
            price: request.reference_price.as_decimal(),
            tag: request.reason.as_str(),
        }
    }
}

/// Order response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    /// Upstream order ID
    pub order_id: String,
    /// Echoed client order ID
    #[serde(default)]
    pub client_order_id: Option<String>,
    /// Order status
    #[serde(default)]
    pub status: Option<String>,
}

impl From<UnderlyingDto> for UnderlyingPositions {
    fn from(dto: UnderlyingDto) -> Self {
        Self {
            underlying: dto.underlying,
            positions: dto
                .positions
                .into_iter()
                .map(|p| RawPosition {
                    symbol: p.symbol,
                    net_quantity: p.net_quantity,
                    average_price: p.average_price,
                    last_price: p.last_price,
                    realized_pnl: p.realized_pnl,
                    unrealized_pnl: p.unrealized_pnl,
                })
                .collect(),
        }
    }
}

impl From<InstrumentDto> for InstrumentInfo {
    fn from(dto: InstrumentDto) -> Self {
        Self {
            symbol: dto.symbol,
            expiry: dto.expiry,
            strike: dto.strike,
            lot_size: dto.lot_size,
            instrument_type: dto.instrument_type,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
