//! Stub broker for testing and development.
//!
//! Holds positions and instruments in memory. Accepted orders are applied
//! to the held quantity, so a fully exited position comes back flat on the
//! next fetch.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use scalper_domain::{InstrumentInfo, OrderSide, RawPosition, UnderlyingPositions};

use crate::error::ExecError;
use crate::ports::{BrokerPort, OrderAck, OrderRequest, SessionContext};

#[derive(Debug, Default)]
struct StubState {
    positions: Vec<UnderlyingPositions>,
    instruments: Vec<InstrumentInfo>,
    submitted: Vec<OrderRequest>,
    order_counter: u64,
    fail_next_order: bool,
    fail_fetch: bool,
    order_delay: Option<Duration>,
}

/// Scriptable in-memory broker.
#[derive(Debug, Default)]
pub struct StubBroker {
    state: Mutex<StubState>,
}

impl StubBroker {
    /// Create an empty stub broker.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a position under `underlying`.
    pub fn add_position(&self, underlying: &str, position: RawPosition) {
        let mut state = self.lock();
        match state.positions.iter_mut().find(|g| g.underlying == underlying) {
            Some(group) => group.positions.push(position),
            None => state.positions.push(UnderlyingPositions {
                underlying: underlying.to_string(),
                positions: vec![position],
            }),
        }
    }

    /// Remove every row for `symbol`.
    pub fn remove_position(&self, symbol: &str) {
        for group in self.lock().positions.iter_mut() {
            group.positions.retain(|row| row.symbol != symbol);
        }
    }

    /// Add instrument reference data.
    pub fn add_instrument(&self, instrument: InstrumentInfo) {
        self.lock().instruments.push(instrument);
    }

    /// Move the last traded price of `symbol`.
    pub fn set_last_price(&self, symbol: &str, price: Decimal) {
        let mut state = self.lock();
        for row in state.positions.iter_mut().flat_map(|g| g.positions.iter_mut()) {
            if row.symbol == symbol {
                row.last_price = price;
            }
        }
    }

    /// Net quantity currently held for `symbol`.
    pub fn position_quantity(&self, symbol: &str) -> Option<i64> {
        self.lock()
            .positions
            .iter()
            .flat_map(|g| g.positions.iter())
            .find(|row| row.symbol == symbol)
            .map(|row| row.net_quantity)
    }

    /// Configure the next order to fail.
    pub fn set_fail_next_order(&self, fail: bool) {
        self.lock().fail_next_order = fail;
    }

    /// Make every fetch fail until reset.
    pub fn set_fail_fetch(&self, fail: bool) {
        self.lock().fail_fetch = fail;
    }

    /// Delay every order acknowledgement.
    pub fn set_order_delay(&self, delay: Option<Duration>) {
        self.lock().order_delay = delay;
    }

    /// Every order accepted so far, oldest first.
    pub fn submitted_orders(&self) -> Vec<OrderRequest> {
        self.lock().submitted.clone()
    }

    fn check_fetch(&self) -> Result<(), ExecError> {
        if self.lock().fail_fetch {
            return Err(ExecError::UpstreamUnavailable(
                "Simulated upstream failure".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BrokerPort for StubBroker {
    async fn fetch_positions(
        &self,
        _session: &SessionContext,
    ) -> Result<Vec<UnderlyingPositions>, ExecError> {
        self.check_fetch()?;
        Ok(self.lock().positions.clone())
    }

    async fn fetch_instruments(
        &self,
        _session: &SessionContext,
    ) -> Result<Vec<InstrumentInfo>, ExecError> {
        self.check_fetch()?;
        Ok(self.lock().instruments.clone())
    }

    async fn submit_order(
        &self,
        _session: &SessionContext,
        request: &OrderRequest,
    ) -> Result<OrderAck, ExecError> {
        let delay = self.lock().order_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();

        if std::mem::take(&mut state.fail_next_order) {
            return Err(ExecError::Order {
                status: Some(503),
                message: "Simulated order failure".to_string(),
            });
        }

        let signed = i64::try_from(request.quantity)
            .map_err(|_| ExecError::order(format!("quantity {} out of range", request.quantity)))?;
        let delta = match request.side {
            OrderSide::Buy => signed,
            OrderSide::Sell => -signed,
        };
        for row in state.positions.iter_mut().flat_map(|g| g.positions.iter_mut()) {
            if row.symbol == request.symbol {
                row.net_quantity += delta;
            }
        }

        state.order_counter += 1;
        let order_id = format!("STUB-{}", state.order_counter);
        state.submitted.push(request.clone());

        tracing::debug!(
            order_id = %order_id,
            symbol = %request.symbol,
            side = %request.side,
            quantity = request.quantity,
            "Stub: order filled"
        );

        Ok(OrderAck {
            order_id,
            client_order_id: request.client_order_id.clone(),
            accepted_at: Utc::now(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use scalper_domain::{ExitReason, Price};

    fn raw(symbol: &str, qty: i64) -> RawPosition {
        RawPosition {
            symbol: symbol.to_string(),
            net_quantity: qty,
            average_price: dec!(100),
            last_price: dec!(100),
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
        }
    }

    fn sell(symbol: &str, quantity: u64) -> OrderRequest {
        OrderRequest {
            client_order_id: "c-1".to_string(),
            symbol: symbol.to_string(),
            side: OrderSide::Sell,
            quantity,
            reference_price: Price::new(dec!(100)).unwrap(),
            reason: ExitReason::StopLoss,
        }
    }

    #[tokio::test]
    async fn test_groups_positions_by_underlying() {
        let stub = StubBroker::new();
        stub.add_position("NIFTY", raw("A", 50));
        stub.add_position("NIFTY", raw("B", -50));
        stub.add_position("BANKNIFTY", raw("C", 15));

        let groups = stub.fetch_positions(&SessionContext::new("pf", None)).await.unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].positions.len(), 2);
    }

    #[test]
    fn test_remove_position() {
        let stub = StubBroker::new();
        stub.add_position("NIFTY", raw("A", 50));
        stub.add_position("NIFTY", raw("B", 50));

        stub.remove_position("A");

        assert_eq!(stub.position_quantity("A"), None);
        assert_eq!(stub.position_quantity("B"), Some(50));
    }

    #[tokio::test]
    async fn test_order_reduces_position() {
        let stub = StubBroker::new();
        stub.add_position("NIFTY", raw("A", 100));
        let session = SessionContext::new("pf", None);

        let ack = stub.submit_order(&session, &sell("A", 50)).await.unwrap();

        assert_eq!(ack.order_id, "STUB-1");
        assert_eq!(ack.client_order_id, "c-1");
        assert_eq!(stub.position_quantity("A"), Some(50));
        assert_eq!(stub.submitted_orders().len(), 1);
    }

    #[tokio::test]
    async fn test_fail_next_order_resets() {
        let stub = StubBroker::new();
        stub.add_position("NIFTY", raw("A", 100));
        stub.set_fail_next_order(true);
        let session = SessionContext::new("pf", None);

        assert!(stub.submit_order(&session, &sell("A", 50)).await.is_err());
        assert_eq!(stub.position_quantity("A"), Some(100));

        assert!(stub.submit_order(&session, &sell("A", 50)).await.is_ok());
    }

    #[tokio::test]
    async fn test_fail_fetch() {
        let stub = StubBroker::new();
        stub.set_fail_fetch(true);

        let result = stub.fetch_positions(&SessionContext::new("pf", None)).await;
        assert!(matches!(result, Err(ExecError::UpstreamUnavailable(_))));
    }
}
