//! End-to-end: a full trading day against the stub broker.
//!
//! Drives the monitor with fixed clock readings (IST = UTC+05:30) through
//! pre-open, the active window and square-off, then checks the daemon's
//! HTTP surface over a real socket.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use scalper_domain::{
    ExitReason, InstrumentInfo, OrderSide, RawPosition, ScalpingConfig, SessionPhase,
};
use scalper_exec::{OrderGateway, SessionContext, StubBroker};
use scalperd::{Config, ConfigHandle, Daemon, Metrics, ScalpingMonitor};

const CALL: &str = "NIFTY24MAR22000CE";
const PUT: &str = "BANKNIFTY24MAR47000PE";

/// Clock reading at `hour:minute` IST on a trading day.
fn ist(hour: u32, minute: u32) -> DateTime<Utc> {
    let ist = chrono_tz::Asia::Kolkata
        .with_ymd_and_hms(2024, 3, 4, hour, minute, 0)
        .unwrap();
    ist.with_timezone(&Utc)
}

fn raw(symbol: &str, qty: i64, avg: Decimal, ltp: Decimal) -> RawPosition {
    RawPosition {
        symbol: symbol.to_string(),
        net_quantity: qty,
        average_price: avg,
        last_price: ltp,
        realized_pnl: Decimal::ZERO,
        unrealized_pnl: Decimal::ZERO,
    }
}

fn lot(symbol: &str, size: u32) -> InstrumentInfo {
    InstrumentInfo {
        symbol: symbol.to_string(),
        expiry: None,
        strike: None,
        lot_size: Some(size),
        instrument_type: None,
    }
}

#[tokio::test]
async fn test_full_trading_day() {
    let broker = Arc::new(StubBroker::new());
    broker.add_position("NIFTY", raw(CALL, 100, dec!(100), dec!(104)));
    broker.add_position("BANKNIFTY", raw(PUT, -15, dec!(200), dec!(196)));
    broker.add_instrument(lot(CALL, 50));
    broker.add_instrument(lot(PUT, 15));

    let gateway = Arc::new(OrderGateway::new(broker.clone(), Duration::from_millis(500)));
    let mut monitor = ScalpingMonitor::new(
        gateway,
        SessionContext::new("pf-e2e", None),
        ConfigHandle::new(ScalpingConfig::default()),
        Arc::new(Metrics::new().unwrap()),
        Duration::from_secs(2),
    );
    let view = monitor.subscribe();

    // 09:00: market not open for us yet
    let report = monitor.tick_at(ist(9, 0)).await.unwrap();
    assert_eq!(report.phase, SessionPhase::PreOpen);
    assert!(monitor.store().is_empty());

    // 10:00: both positions picked up, nothing fires
    let report = monitor.tick_at(ist(10, 0)).await.unwrap();
    assert_eq!(report.phase, SessionPhase::Active);
    assert!(report.exits.is_empty());
    assert_eq!(monitor.store().len(), 2);
    assert_eq!(monitor.store().get(CALL).unwrap().entry_price.as_decimal(), dec!(100));

    // 10:30: call up 15%, half the position is booked
    broker.set_last_price(CALL, dec!(115));
    let report = monitor.tick_at(ist(10, 30)).await.unwrap();
    assert_eq!(report.exits.len(), 1);
    assert_eq!(report.exits[0].reason, ExitReason::PartialProfit);
    assert_eq!(report.exits[0].quantity, 50);
    assert_eq!(broker.position_quantity(CALL), Some(50));

    // 11:00: new high
    broker.set_last_price(CALL, dec!(120));
    assert!(monitor.tick_at(ist(11, 0)).await.unwrap().exits.is_empty());
    assert_eq!(monitor.store().get(CALL).unwrap().high_watermark.as_decimal(), dec!(120));

    // 11:30: ~10.8% off the high while still in profit, trailing stop closes the rest
    broker.set_last_price(CALL, dec!(107));
    let report = monitor.tick_at(ist(11, 30)).await.unwrap();
    assert_eq!(report.exits.len(), 1);
    assert_eq!(report.exits[0].reason, ExitReason::TrailingStop);
    assert_eq!(report.exits[0].quantity, 50);
    assert_eq!(broker.position_quantity(CALL), Some(0));
    assert!(monitor.store().get(CALL).is_none());

    // 15:10: between trading end and square-off, hold
    let report = monitor.tick_at(ist(15, 10)).await.unwrap();
    assert_eq!(report.phase, SessionPhase::AwaitingSquareOff);
    assert!(report.exits.is_empty());

    // 15:20: short put is bought back
    let report = monitor.tick_at(ist(15, 20)).await.unwrap();
    assert_eq!(report.phase, SessionPhase::PastSquareOff);
    assert_eq!(report.exits.len(), 1);
    assert_eq!(report.exits[0].symbol, PUT);
    assert_eq!(report.exits[0].reason, ExitReason::ForceSquareOff);
    assert_eq!(broker.position_quantity(PUT), Some(0));
    assert!(monitor.store().is_empty());

    // 15:25: everything flat, nothing left to submit
    assert!(monitor.tick_at(ist(15, 25)).await.unwrap().exits.is_empty());

    let orders = broker.submitted_orders();
    let summary: Vec<(&str, OrderSide, u64)> = orders
        .iter()
        .map(|o| (o.symbol.as_str(), o.side, o.quantity))
        .collect();
    assert_eq!(
        summary,
        vec![
            (CALL, OrderSide::Sell, 50),
            (CALL, OrderSide::Sell, 50),
            (PUT, OrderSide::Buy, 15),
        ]
    );

    let view = view.borrow();
    assert!(view.positions.is_empty());
    assert_eq!(view.last_tick.as_ref().unwrap().phase, SessionPhase::PastSquareOff);
}

#[tokio::test]
async fn test_daemon_http_surface() {
    let handle = Daemon::new_stub(Config::test()).start().await.unwrap();
    let base = format!("http://{}", handle.api_addr);
    let client = reqwest::Client::new();

    let health: serde_json::Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");

    let response = client
        .post(format!("{base}/scalping/config"))
        .json(&serde_json::json!({ "stop_loss_pct": "0.2", "min_premium": "5" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let config: serde_json::Value = response.json().await.unwrap();
    assert_eq!(config["stop_loss_pct"], "0.2");
    assert_eq!(config["min_premium"], "5");

    let rejected = client
        .post(format!("{base}/scalping/config"))
        .json(&serde_json::json!({ "profit_target_pct": "-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status().as_u16(), 422);

    let state: serde_json::Value = client
        .get(format!("{base}/scalping/state"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(state["tracked"], 0);
    assert_eq!(state["config"]["stop_loss_pct"], "0.2");

    let metrics = client
        .get(format!("{base}/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("scalper_tracked_positions"));

    handle.shutdown().await.unwrap();
}
