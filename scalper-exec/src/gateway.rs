//! Order submission gateway.
//!
//! Turns an exit decision into a market order and bounds every upstream
//! call with a timeout. There is no retry here: a failed exit is simply
//! re-evaluated on the next cycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use scalper_domain::{
    DomainError, ExitDecision, InstrumentInfo, PositionSnapshot, UnderlyingPositions,
};

use crate::error::{ExecError, ExecResult};
use crate::ports::{BrokerPort, OrderAck, OrderRequest, SessionContext};

/// Timeout-bounded access to a [`BrokerPort`].
pub struct OrderGateway<B: BrokerPort> {
    broker: Arc<B>,
    request_timeout: Duration,
}

impl<B: BrokerPort> OrderGateway<B> {
    /// Create a gateway over `broker`.
    pub fn new(broker: Arc<B>, request_timeout: Duration) -> Self {
        Self { broker, request_timeout }
    }

    /// The underlying broker.
    pub fn broker(&self) -> &Arc<B> {
        &self.broker
    }

    /// Fetch positions, bounded by the request timeout.
    pub async fn fetch_positions(
        &self,
        session: &SessionContext,
    ) -> ExecResult<Vec<UnderlyingPositions>> {
        timeout(self.request_timeout, self.broker.fetch_positions(session))
            .await
            .map_err(|_| self.fetch_timeout("positions"))?
    }

    /// Fetch instrument metadata, bounded by the request timeout.
    pub async fn fetch_instruments(
        &self,
        session: &SessionContext,
    ) -> ExecResult<Vec<InstrumentInfo>> {
        timeout(self.request_timeout, self.broker.fetch_instruments(session))
            .await
            .map_err(|_| self.fetch_timeout("instruments"))?
    }

    /// Submit the order that executes `decision` for `snapshot`.
    ///
    /// The order side is the inverse of the position side and the
    /// reference price is the snapshot's last traded price.
    ///
    /// # Errors
    ///
    /// - `ExecError::Domain` if there is nothing to submit (no exit, flat
    ///   position or zero quantity)
    /// - `ExecError::Order` on rejection, transport failure or timeout
    pub async fn submit_exit(
        &self,
        session: &SessionContext,
        snapshot: &PositionSnapshot,
        decision: &ExitDecision,
    ) -> ExecResult<OrderAck> {
        let (Some(side), Some(reason)) = (snapshot.side(), decision.reason()) else {
            return Err(DomainError::InvalidQuantity(format!(
                "{}: no exit to submit",
                snapshot.symbol
            ))
            .into());
        };
        if decision.quantity() == 0 {
            return Err(DomainError::InvalidQuantity(format!(
                "{}: exit quantity is zero",
                snapshot.symbol
            ))
            .into());
        }

        let request = OrderRequest {
            client_order_id: Uuid::now_v7().to_string(),
            symbol: snapshot.symbol.clone(),
            side: side.exit_action(),
            quantity: decision.quantity(),
            reference_price: snapshot.last_traded_price,
            reason,
        };

        info!(
            symbol = %request.symbol,
            side = %request.side,
            quantity = request.quantity,
            reason = %reason,
            reference_price = %request.reference_price,
            client_order_id = %request.client_order_id,
            "Submitting exit order"
        );

        let submission = self.broker.submit_order(session, &request);
        let result = match timeout(self.request_timeout, submission).await {
            Ok(result) => result,
            Err(_) => Err(ExecError::order(format!(
                "order for {} timed out after {}ms",
                request.symbol,
                self.request_timeout.as_millis()
            ))),
        };

        match &result {
            Ok(ack) => info!(
                symbol = %request.symbol,
                order_id = %ack.order_id,
                "Exit order acknowledged"
            ),
            Err(e) => warn!(symbol = %request.symbol, error = %e, "Exit order failed"),
        }

        result
    }

    fn fetch_timeout(&self, what: &str) -> ExecError {
        ExecError::UpstreamUnavailable(format!(
            "fetching {what} timed out after {}ms",
            self.request_timeout.as_millis()
        ))
    }
}

// =============================================================================
// Tests
// =============================================================================
