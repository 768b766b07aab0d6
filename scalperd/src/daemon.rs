//! Daemon: Main runtime orchestrator.
//!
//! The Daemon ties together all components:
//! - Scalping Monitor (periodic exit automation)
//! - Config Handle (live exit-rule parameters)
//! - API Server (HTTP endpoints)
//! - Metrics registry
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Initialize components
//! 3. Start API server and monitor
//! 4. Wait for SIGINT
//! 5. Cancel both tasks and wait for them to finish
//!
//! Tracking state lives in memory only and starts empty on every boot.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use scalper_connectors::PaperTradingClient;
use scalper_exec::{BrokerPort, OrderGateway, SessionContext, StubBroker};

use crate::api::{create_router, ApiState};
use crate::config::Config;
use crate::config_handle::ConfigHandle;
use crate::error::{DaemonError, DaemonResult};
use crate::metrics::Metrics;
use crate::monitor::ScalpingMonitor;

// =============================================================================
// Daemon
// =============================================================================

/// The main scalper daemon.
pub struct Daemon<B: BrokerPort + 'static> {
    /// Configuration
    config: Config,
    /// Brokerage
    broker: Arc<B>,
    /// Live scalping configuration, shared by the monitor and the API
    config_handle: ConfigHandle,
}

impl Daemon<StubBroker> {
    /// Create a new daemon over an in-memory stub broker (for testing/development).
    pub fn new_stub(config: Config) -> Self {
        Self::new(config, Arc::new(StubBroker::new()))
    }
}

impl Daemon<PaperTradingClient> {
    /// Create a new daemon over the paper-trading REST API.
    pub fn new_paper(config: Config) -> Self {
        let client = PaperTradingClient::new(
            config.broker.base_url.clone(),
            config.broker.request_timeout,
        );
        Self::new(config, Arc::new(client))
    }
}

impl<B: BrokerPort + 'static> Daemon<B> {
    /// Create a new daemon with the provided broker.
    pub fn new(config: Config, broker: Arc<B>) -> Self {
        let config_handle = ConfigHandle::new(config.scalping.clone());
        Self {
            config,
            broker,
            config_handle,
        }
    }

    /// The broker the daemon trades through.
    pub fn broker(&self) -> &Arc<B> {
        &self.broker
    }

    /// Handle to the live scalping configuration.
    pub fn config_handle(&self) -> &ConfigHandle {
        &self.config_handle
    }

    /// Start the API server and the monitor.
    ///
    /// Returns once the listener is bound; both tasks keep running until
    /// [`DaemonHandle::shutdown`] is called.
    pub async fn start(self) -> DaemonResult<DaemonHandle> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            portfolio_id = %self.config.broker.portfolio_id,
            "Starting scalper daemon"
        );

        let metrics = Arc::new(Metrics::new()?);
        let shutdown = CancellationToken::new();

        // 1. Monitor
        let gateway = Arc::new(OrderGateway::new(
            self.broker.clone(),
            self.config.broker.request_timeout,
        ));
        let session = SessionContext::new(
            self.config.broker.portfolio_id.clone(),
            self.config.broker.access_token.clone(),
        );
        let monitor = ScalpingMonitor::new(
            gateway,
            session,
            self.config_handle.clone(),
            metrics.clone(),
            self.config.monitor.poll_interval,
        );
        let view = monitor.subscribe();

        // 2. API server
        let state = Arc::new(ApiState {
            config: self.config_handle.clone(),
            view,
            metrics,
        });
        let (api_addr, server) = self.start_api_server(state, shutdown.clone()).await?;
        info!(%api_addr, "API server started");

        let monitor = monitor.start(shutdown.clone());

        Ok(DaemonHandle {
            api_addr,
            shutdown,
            monitor,
            server,
        })
    }

    /// Run the daemon.
    ///
    /// This method blocks until shutdown is requested (SIGINT).
    pub async fn run(self) -> DaemonResult<()> {
        let handle = self.start().await?;

        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        } else {
            info!("Received shutdown signal");
        }

        handle.shutdown().await
    }

    /// Bind the listener and spawn the server task.
    async fn start_api_server(
        &self,
        state: Arc<ApiState>,
        shutdown: CancellationToken,
    ) -> DaemonResult<(SocketAddr, JoinHandle<()>)> {
        let router = create_router(state);
        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);

        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            DaemonError::Config(format!("Failed to bind to {}: {}", addr, e))
        })?;

        let local_addr = listener.local_addr().map_err(|e| {
            DaemonError::Config(format!("Failed to get local address: {}", e))
        })?;

        let server = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "API server error");
            }
        });

        Ok((local_addr, server))
    }
}

// =============================================================================
// Daemon Handle
// =============================================================================

/// Running daemon tasks.
pub struct DaemonHandle {
    /// Address the API server is bound to
    pub api_addr: SocketAddr,
    shutdown: CancellationToken,
    monitor: JoinHandle<()>,
    server: JoinHandle<()>,
}

impl DaemonHandle {
    /// Stop the monitor and the API server and wait for both.
    ///
    /// An in-flight tick is allowed to finish.
    pub async fn shutdown(self) -> DaemonResult<()> {
        info!("Initiating graceful shutdown");
        self.shutdown.cancel();

        self.monitor
            .await
            .map_err(|e| DaemonError::Api(format!("monitor task failed: {e}")))?;
        self.server
            .await
            .map_err(|e| DaemonError::Api(format!("server task failed: {e}")))?;

        info!("Shutdown complete");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
