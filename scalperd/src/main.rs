//! Scalper Daemon
//!
//! Watches a paper-trading portfolio and closes option positions
//! automatically according to the scalping exit rules.
//!
//! # Usage
//!
//! ```bash
//! # Start against the paper-trading API
//! SCALPER_PORTFOLIO_ID=pf-1 cargo run -p scalperd
//!
//! # Start with an in-memory stub broker
//! SCALPER_ENV=test SCALPER_API_PORT=8081 cargo run -p scalperd
//! ```
//!
//! # Environment Variables
//!
//! - `SCALPER_ENV`: Environment (test, development, production)
//! - `SCALPER_API_HOST`: API host (default: 0.0.0.0)
//! - `SCALPER_API_PORT`: API port (default: 8080)
//! - `SCALPER_BROKER_URL`: Paper-trading API root (default: http://localhost:4000/api)
//! - `SCALPER_PORTFOLIO_ID`: Portfolio to monitor (default: default)
//! - `SCALPER_ACCESS_TOKEN`: Bearer token for the paper-trading API
//! - `SCALPER_POLL_INTERVAL_MS`: Monitor tick interval (default: 2000)
//! - `SCALPER_REQUEST_TIMEOUT_MS`: Upstream call timeout (default: 5000)
//! - `SCALPER_PROFIT_TARGET_PCT`: Profit target (default: 0.25)
//! - `SCALPER_STOP_LOSS_PCT`: Stop loss (default: 0.15)
//! - `SCALPER_TRAILING_STOP_PCT`: Trailing stop (default: 0.10)
//! - `SCALPER_MIN_PREMIUM`: Low-premium floor (default: 10)
//! - `SCALPER_MAX_POSITION_LOTS`: Expected maximum lots (default: 5)
//! - `SCALPER_TIMEZONE`: Session timezone (default: Asia/Kolkata)
//! - `SCALPER_TRADING_START` / `SCALPER_TRADING_END` / `SCALPER_SQUARE_OFF_TIME`:
//!   Session boundaries as HH:MM (default: 09:30, 15:00, 15:15)

use scalperd::{Config, Daemon, Environment};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("scalperd=info".parse()?))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        api_host = %config.api.host,
        api_port = config.api.port,
        broker = ?config.broker,
        "Scalper Daemon"
    );

    // Create and run daemon
    match config.environment {
        Environment::Test => Daemon::new_stub(config).run().await?,
        Environment::Development | Environment::Production => {
            Daemon::new_paper(config).run().await?
        }
    }

    Ok(())
}
