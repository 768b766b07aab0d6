//! Scalping Monitor: periodic exit automation.
//!
//! The monitor is a background task that, every poll interval:
//! - Classifies the wall clock into a session phase
//! - During the active window, evaluates the exit ladder for every open
//!   position and submits the resulting exits
//! - Past the square-off time, liquidates every open position
//!
//! Tracking state changes only after the upstream acknowledged an order.
//! Failures are logged and the position is simply re-evaluated on the
//! next tick.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use scalper_domain::{
    classify_utc, ExitDecision, ExitReason, PositionSnapshot, PositionTrackingState,
    ScalpingConfig, SessionPhase,
};
use scalper_engine::{evaluate, force_square_off};
use scalper_exec::{BrokerPort, ExecError, OrderGateway, SessionContext};
use scalper_store::TrackingStore;

use crate::config_handle::ConfigHandle;
use crate::metrics::Metrics;
use crate::snapshot::SnapshotBuilder;

// =============================================================================
// Tick reports
// =============================================================================

/// Result of one submitted exit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExitOutcome {
    /// Instrument symbol
    pub symbol: String,
    /// Rule that fired
    pub reason: ExitReason,
    /// Units in the order
    pub quantity: u64,
    /// Whether this was a partial exit
    pub partial: bool,
    /// Whether the upstream acknowledged the order
    pub acknowledged: bool,
    /// Upstream order ID, when acknowledged
    pub order_id: Option<String>,
    /// Failure message, when not acknowledged
    pub error: Option<String>,
}

/// Summary of one monitor tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    /// When the tick ran
    pub at: DateTime<Utc>,
    /// Session phase at tick start
    pub phase: SessionPhase,
    /// Open positions in the snapshot (0 when no snapshot was taken)
    pub positions_seen: usize,
    /// Exits submitted this tick
    pub exits: Vec<ExitOutcome>,
    /// Symbols whose tracking was dropped because they are no longer open
    pub dropped: Vec<String>,
}

impl TickReport {
    /// Empty report for a tick at `at` in `phase`.
    pub fn new(at: DateTime<Utc>, phase: SessionPhase) -> Self {
        Self {
            at,
            phase,
            positions_seen: 0,
            exits: Vec::new(),
            dropped: Vec::new(),
        }
    }

    /// Number of acknowledged exits.
    pub fn acknowledged(&self) -> usize {
        self.exits.iter().filter(|e| e.acknowledged).count()
    }
}

/// What observers (the admin API) see of the monitor.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrackingView {
    /// Tracking state by symbol
    pub positions: BTreeMap<String, PositionTrackingState>,
    /// Last successful tick
    pub last_tick: Option<TickReport>,
    /// Error of the last tick, if it failed
    pub last_error: Option<String>,
}

// =============================================================================
// Scalping Monitor
// =============================================================================

/// Owns the tracking store and drives exits for one portfolio session.
pub struct ScalpingMonitor<B: BrokerPort + 'static> {
    /// Gateway to the brokerage
    gateway: Arc<OrderGateway<B>>,
    /// Snapshot builder over the same gateway
    snapshots: SnapshotBuilder<B>,
    /// Portfolio and credentials
    session: SessionContext,
    /// Live configuration
    config: ConfigHandle,
    /// Per-symbol tracking state (owned, no locking)
    store: TrackingStore,
    /// Metrics
    metrics: Arc<Metrics>,
    /// Publishes the tracking view after every tick
    view_tx: watch::Sender<TrackingView>,
    /// Time between ticks
    poll_interval: Duration,
}

impl<B: BrokerPort + 'static> ScalpingMonitor<B> {
    /// Create a new monitor.
    pub fn new(
        gateway: Arc<OrderGateway<B>>,
        session: SessionContext,
        config: ConfigHandle,
        metrics: Arc<Metrics>,
        poll_interval: Duration,
    ) -> Self {
        let (view_tx, _) = watch::channel(TrackingView::default());
        Self {
            snapshots: SnapshotBuilder::new(gateway.clone()),
            gateway,
            session,
            config,
            store: TrackingStore::new(),
            metrics,
            view_tx,
            poll_interval,
        }
    }

    /// Receiver for the tracking view published after every tick.
    pub fn subscribe(&self) -> watch::Receiver<TrackingView> {
        self.view_tx.subscribe()
    }

    /// Tracking store (read-only).
    pub fn store(&self) -> &TrackingStore {
        &self.store
    }

    /// Start the monitor loop.
    ///
    /// Ticks never overlap: a tick runs to completion inside the loop body
    /// and ticks that came due meanwhile are skipped. Cancellation is
    /// observed between ticks.
    pub fn start(mut self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(
                interval_ms = self.poll_interval.as_millis() as u64,
                portfolio_id = %self.session.portfolio_id,
                "Scalping monitor started"
            );

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Scalping monitor received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.tick_at(Utc::now()).await {
                            error!(error = %e, "Monitor tick failed");
                        }
                    }
                }
            }

            info!(tracked = self.store.len(), "Scalping monitor stopped");
        })
    }

    /// Run one tick as if the clock read `now`.
    ///
    /// Records metrics and publishes the tracking view either way.
    pub async fn tick_at(&mut self, now: DateTime<Utc>) -> Result<TickReport, MonitorError> {
        let config = self.config.current();
        let phase = classify_utc(&config, now);
        let mut report = TickReport::new(now, phase);

        let result = match phase {
            SessionPhase::PreOpen | SessionPhase::AwaitingSquareOff => {
                debug!(%phase, "Outside the active window, holding");
                Ok(())
            }
            SessionPhase::Active => self.run_active(&config, &mut report).await,
            SessionPhase::PastSquareOff => self.run_square_off(&config, &mut report).await,
        };

        let tracked = self.store.len();
        match result {
            Ok(()) => {
                self.metrics.record_tick(&report, tracked);
                if !report.exits.is_empty() {
                    info!(
                        %phase,
                        positions = report.positions_seen,
                        exits = report.exits.len(),
                        acknowledged = report.acknowledged(),
                        "Tick complete"
                    );
                }
                self.publish(Some(report.clone()), None);
                Ok(report)
            }
            Err(e) => {
                self.metrics.record_failure();
                self.publish(None, Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Active window: evaluate the rule ladder for every open position.
    async fn run_active(
        &mut self,
        config: &ScalpingConfig,
        report: &mut TickReport,
    ) -> Result<(), MonitorError> {
        let snapshots = self.snapshots.build(&self.session, config).await?;
        report.positions_seen = snapshots.len();

        for snapshot in snapshots.iter().filter(|s| !s.is_flat()) {
            if let Some(lots) = snapshot.lots() {
                if lots > u64::from(config.max_position_lots) {
                    warn!(
                        symbol = %snapshot.symbol,
                        lots,
                        max_lots = config.max_position_lots,
                        "Position exceeds configured maximum lots"
                    );
                }
            }

            let state = self.store.upsert(snapshot);
            let decision = evaluate(snapshot, state, config);

            if decision.is_exit() {
                self.execute(snapshot, decision, report).await;
            }
        }

        self.drop_closed(&snapshots, report);
        Ok(())
    }

    /// Past square-off: liquidate every open position.
    async fn run_square_off(
        &mut self,
        config: &ScalpingConfig,
        report: &mut TickReport,
    ) -> Result<(), MonitorError> {
        let snapshots = self.snapshots.build(&self.session, config).await?;
        report.positions_seen = snapshots.len();

        for snapshot in &snapshots {
            let decision = force_square_off(snapshot);
            if decision.is_exit() {
                self.execute(snapshot, decision, report).await;
            }
        }

        self.drop_closed(&snapshots, report);
        Ok(())
    }

    /// Submit one exit and commit it on acknowledgement.
    async fn execute(
        &mut self,
        snapshot: &PositionSnapshot,
        decision: ExitDecision,
        report: &mut TickReport,
    ) {
        let Some(reason) = decision.reason() else {
            return;
        };
        let partial = matches!(decision, ExitDecision::Partial { .. });

        let outcome = match self.gateway.submit_exit(&self.session, snapshot, &decision).await {
            Ok(ack) => {
                if let Err(e) = self.store.commit(&snapshot.symbol, &decision) {
                    warn!(symbol = %snapshot.symbol, error = %e, "Could not commit exit");
                }
                info!(
                    symbol = %snapshot.symbol,
                    %reason,
                    quantity = decision.quantity(),
                    order_id = %ack.order_id,
                    "Exit committed"
                );
                ExitOutcome {
                    symbol: snapshot.symbol.clone(),
                    reason,
                    quantity: decision.quantity(),
                    partial,
                    acknowledged: true,
                    order_id: Some(ack.order_id),
                    error: None,
                }
            }
            Err(e) => {
                error!(
                    symbol = %snapshot.symbol,
                    %reason,
                    error = %e,
                    "Exit not acknowledged, retrying next tick"
                );
                ExitOutcome {
                    symbol: snapshot.symbol.clone(),
                    reason,
                    quantity: decision.quantity(),
                    partial,
                    acknowledged: false,
                    order_id: None,
                    error: Some(e.to_string()),
                }
            }
        };

        report.exits.push(outcome);
    }

    /// Forget symbols that are no longer open upstream.
    fn drop_closed(&mut self, snapshots: &[PositionSnapshot], report: &mut TickReport) {
        let open: HashSet<&str> = snapshots
            .iter()
            .filter(|s| !s.is_flat())
            .map(|s| s.symbol.as_str())
            .collect();

        for symbol in self.store.retain_open(&open) {
            info!(symbol = %symbol, "Position no longer open, tracking dropped");
            report.dropped.push(symbol);
        }
    }

    fn publish(&self, last_tick: Option<TickReport>, last_error: Option<String>) {
        let positions = self.store.snapshot();
        self.view_tx.send_modify(|view| {
            view.positions = positions;
            if last_tick.is_some() {
                view.last_tick = last_tick;
            }
            view.last_error = last_error;
        });
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors that abort a monitor tick.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Positions could not be fetched or parsed; the tick was skipped
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl From<ExecError> for MonitorError {
    fn from(error: ExecError) -> Self {
        match error {
            ExecError::UpstreamUnavailable(msg) => MonitorError::UpstreamUnavailable(msg),
            other => MonitorError::UpstreamUnavailable(other.to_string()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
