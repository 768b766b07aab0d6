//! Scalper Daemon Library
//!
//! Runtime orchestrator for automated option-position exits.
//!
//! # Architecture
//!
//! ```text
//! Admin API ──► Config Handle ──────────────┐
//!     ▲                                     ▼
//!     └── Tracking View ◄── Scalping Monitor ──► Engine (exit rules)
//!                                │
//!                                ▼
//!                        Order Gateway ──► Broker (paper trading)
//! ```
//!
//! # Components
//!
//! - **Daemon**: Main runtime orchestrator
//! - **Scalping Monitor**: Periodic tick that evaluates and executes exits
//! - **Snapshot Builder**: Joins positions and instruments into snapshots
//! - **Config Handle**: Live, atomically patchable exit-rule parameters
//! - **API**: HTTP endpoints for operators
//! - **Metrics**: Prometheus counters for ticks and exits
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use scalperd::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!     let daemon = Daemon::new_stub(config);
//!     daemon.run().await.expect("Daemon error");
//! }
//! ```

#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod config_handle;
pub mod daemon;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod snapshot;

// Re-exports for convenience
pub use config::{ApiConfig, BrokerConfig, Config, Environment, MonitorConfig};
pub use config_handle::ConfigHandle;
pub use daemon::{Daemon, DaemonHandle};
pub use error::{DaemonError, DaemonResult};
pub use metrics::Metrics;
pub use monitor::{ExitOutcome, MonitorError, ScalpingMonitor, TickReport, TrackingView};
pub use snapshot::SnapshotBuilder;
