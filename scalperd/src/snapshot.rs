//! Position snapshot builder.
//!
//! Fetches positions and instrument metadata through the gateway and joins
//! them into one [`PositionSnapshot`] per open symbol. Any failure fails the
//! whole build; callers skip the cycle rather than treat it as flat.

use std::sync::Arc;

use scalper_domain::{build_snapshots, PositionSnapshot, ScalpingConfig};
use scalper_exec::{BrokerPort, ExecError, ExecResult, OrderGateway, SessionContext};
use tracing::debug;

/// Builds the per-cycle view of open positions.
pub struct SnapshotBuilder<B: BrokerPort> {
    gateway: Arc<OrderGateway<B>>,
}

impl<B: BrokerPort> SnapshotBuilder<B> {
    /// Create a builder over `gateway`.
    pub fn new(gateway: Arc<OrderGateway<B>>) -> Self {
        Self { gateway }
    }

    /// Fetch and join the current positions.
    ///
    /// # Errors
    /// `ExecError::UpstreamUnavailable` on fetch failure, timeout or a
    /// malformed open row.
    pub async fn build(
        &self,
        session: &SessionContext,
        config: &ScalpingConfig,
    ) -> ExecResult<Vec<PositionSnapshot>> {
        let groups = self.gateway.fetch_positions(session).await?;
        let instruments = self.gateway.fetch_instruments(session).await?;

        let snapshots = build_snapshots(&groups, &instruments, config)
            .map_err(|e| ExecError::UpstreamUnavailable(format!("malformed position data: {e}")))?;

        debug!(
            groups = groups.len(),
            instruments = instruments.len(),
            open = snapshots.len(),
            "Built position snapshots"
        );
        Ok(snapshots)
    }
}
