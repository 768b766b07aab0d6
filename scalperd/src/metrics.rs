//! Prometheus metrics for the monitor.
//!
//! The registry is owned by the daemon and shared with the API, so tests
//! can build as many independent instances as they like.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::error::{DaemonError, DaemonResult};
use crate::monitor::TickReport;

/// Monitor metrics and the registry they live in.
pub struct Metrics {
    registry: Registry,
    /// Ticks by session phase
    pub ticks_total: IntCounterVec,
    /// Ticks aborted by an upstream failure
    pub tick_failures_total: IntCounter,
    /// Exit attempts by reason and outcome (acknowledged/failed)
    pub exits_total: IntCounterVec,
    /// Symbols currently tracked
    pub tracked_positions: IntGauge,
}

impl Metrics {
    /// Create and register every metric.
    pub fn new() -> DaemonResult<Self> {
        let registry = Registry::new();

        let ticks_total = IntCounterVec::new(
            Opts::new("scalper_ticks_total", "Monitor ticks by session phase"),
            &["phase"],
        )?;
        let tick_failures_total = IntCounter::new(
            "scalper_tick_failures_total",
            "Monitor ticks aborted by an upstream failure",
        )?;
        let exits_total = IntCounterVec::new(
            Opts::new("scalper_exits_total", "Exit orders by reason and outcome"),
            &["reason", "outcome"],
        )?;
        let tracked_positions =
            IntGauge::new("scalper_tracked_positions", "Positions with tracking state")?;

        registry.register(Box::new(ticks_total.clone()))?;
        registry.register(Box::new(tick_failures_total.clone()))?;
        registry.register(Box::new(exits_total.clone()))?;
        registry.register(Box::new(tracked_positions.clone()))?;

        Ok(Self {
            registry,
            ticks_total,
            tick_failures_total,
            exits_total,
            tracked_positions,
        })
    }

    /// Count a completed tick and its exit outcomes.
    pub fn record_tick(&self, report: &TickReport, tracked: usize) {
        self.ticks_total.with_label_values(&[report.phase.as_str()]).inc();
        for exit in &report.exits {
            let outcome = if exit.acknowledged { "acknowledged" } else { "failed" };
            self.exits_total
                .with_label_values(&[exit.reason.as_str(), outcome])
                .inc();
        }
        self.tracked_positions.set(i64::try_from(tracked).unwrap_or(i64::MAX));
    }

    /// Count an aborted tick.
    pub fn record_failure(&self) {
        self.tick_failures_total.inc();
    }

    /// Text exposition of every metric.
    pub fn render(&self) -> DaemonResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| DaemonError::Api(e.to_string()))
    }
}
