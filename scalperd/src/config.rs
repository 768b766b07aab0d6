//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.
//! A `.env` file is honored when present.

use crate::error::{DaemonError, DaemonResult};
use chrono::NaiveTime;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use scalper_domain::ScalpingConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Upstream brokerage configuration
    pub broker: BrokerConfig,

    /// Monitor loop configuration
    pub monitor: MonitorConfig,

    /// Initial exit-rule configuration (mutable at runtime via the API)
    pub scalping: ScalpingConfig,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

/// Upstream brokerage configuration.
#[derive(Clone)]
pub struct BrokerConfig {
    /// API root of the paper-trading service
    pub base_url: String,
    /// Portfolio to monitor
    pub portfolio_id: String,
    /// Bearer token, if required
    pub access_token: Option<String>,
    /// Upper bound for every upstream call
    pub request_timeout: Duration,
}

impl std::fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("base_url", &self.base_url)
            .field("portfolio_id", &self.portfolio_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Monitor loop configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between ticks
    pub poll_interval: Duration,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (uses the stub broker)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;
const DEFAULT_BROKER_URL: &str = "http://localhost:4000/api";

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> DaemonResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let environment = vars.environment()?;
        let api = ApiConfig {
            host: vars.string("SCALPER_API_HOST", "0.0.0.0"),
            port: vars.parsed("SCALPER_API_PORT", 8080u16)?,
        };
        let broker = BrokerConfig {
            base_url: vars.string("SCALPER_BROKER_URL", DEFAULT_BROKER_URL),
            portfolio_id: vars.string("SCALPER_PORTFOLIO_ID", "default"),
            access_token: vars.get("SCALPER_ACCESS_TOKEN").filter(|t| !t.is_empty()),
            request_timeout: Duration::from_millis(
                vars.parsed("SCALPER_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?,
            ),
        };
        let monitor = MonitorConfig {
            poll_interval: Duration::from_millis(
                vars.parsed("SCALPER_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?,
            ),
        };
        if monitor.poll_interval.is_zero() {
            return Err(DaemonError::Config(
                "SCALPER_POLL_INTERVAL_MS must be positive".to_string(),
            ));
        }

        let scalping = vars.scalping_config()?;

        Ok(Self {
            api,
            broker,
            monitor,
            scalping,
            environment,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            broker: BrokerConfig {
                base_url: DEFAULT_BROKER_URL.to_string(),
                portfolio_id: "test-portfolio".to_string(),
                access_token: None,
                request_timeout: Duration::from_millis(500),
            },
            monitor: MonitorConfig {
                poll_interval: Duration::from_millis(50),
            },
            scalping: ScalpingConfig::default(),
            environment: Environment::Test,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            broker: BrokerConfig {
                base_url: DEFAULT_BROKER_URL.to_string(),
                portfolio_id: "default".to_string(),
                access_token: None,
                request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            },
            monitor: MonitorConfig {
                poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            },
            scalping: ScalpingConfig::default(),
            environment: Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Variable parsing
// =============================================================================

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: FromStr>(&self, key: &str, default: T) -> DaemonResult<T> {
        match self.get(key) {
            Some(val) => val
                .trim()
                .parse::<T>()
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            None => Ok(default),
        }
    }

    fn decimal(&self, key: &str, default: Decimal) -> DaemonResult<Decimal> {
        match self.get(key) {
            Some(val) => Decimal::from_str(val.trim())
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            None => Ok(default),
        }
    }

    fn time(&self, key: &str, default: NaiveTime) -> DaemonResult<NaiveTime> {
        match self.get(key) {
            Some(val) => NaiveTime::parse_from_str(val.trim(), "%H:%M").map_err(|_| {
                DaemonError::Config(format!("Invalid {} value: {} (expected HH:MM)", key, val))
            }),
            None => Ok(default),
        }
    }

    fn timezone(&self, key: &str, default: Tz) -> DaemonResult<Tz> {
        match self.get(key) {
            Some(val) => val
                .trim()
                .parse::<Tz>()
                .map_err(|e| {
                    DaemonError::Config(format!("Invalid {} value: {} ({})", key, val, e))
                }),
            None => Ok(default),
        }
    }

    fn environment(&self) -> DaemonResult<Environment> {
        let env_str = self.string("SCALPER_ENV", "development");

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid SCALPER_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn scalping_config(&self) -> DaemonResult<ScalpingConfig> {
        let defaults = ScalpingConfig::default();

        let config = ScalpingConfig {
            profit_target_pct: self
                .decimal("SCALPER_PROFIT_TARGET_PCT", defaults.profit_target_pct)?,
            stop_loss_pct: self.decimal("SCALPER_STOP_LOSS_PCT", defaults.stop_loss_pct)?,
            trailing_stop_pct: self
                .decimal("SCALPER_TRAILING_STOP_PCT", defaults.trailing_stop_pct)?,
            min_premium: self.decimal("SCALPER_MIN_PREMIUM", defaults.min_premium)?,
            max_position_lots: self
                .parsed("SCALPER_MAX_POSITION_LOTS", defaults.max_position_lots)?,
            timezone: self.timezone("SCALPER_TIMEZONE", defaults.timezone)?,
            trading_start: self.time("SCALPER_TRADING_START", defaults.trading_start)?,
            trading_end: self.time("SCALPER_TRADING_END", defaults.trading_end)?,
            square_off_time: self.time("SCALPER_SQUARE_OFF_TIME", defaults.square_off_time)?,
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Tests
// =============================================================================
