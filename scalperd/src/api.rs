//! HTTP API for the scalper daemon.
//!
//! Provides REST endpoints for:
//! - Health check
//! - Reading and patching the scalping configuration
//! - Inspecting tracking state and the last tick
//! - Prometheus metrics

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::warn;

use scalper_domain::{PositionTrackingState, ScalpingConfig, ScalpingConfigPatch};

use crate::config_handle::ConfigHandle;
use crate::metrics::Metrics;
use crate::monitor::{TickReport, TrackingView};

// =============================================================================
// API State
// =============================================================================

/// Shared state for API handlers.
pub struct ApiState {
    /// Live scalping configuration
    pub config: ConfigHandle,
    /// Tracking view published by the monitor
    pub view: watch::Receiver<TrackingView>,
    /// Metrics registry
    pub metrics: Arc<Metrics>,
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Tracking state response.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub tracked: usize,
    pub positions: BTreeMap<String, PositionTrackingState>,
    pub config: ScalpingConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_tick: Option<TickReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// =============================================================================
// Router
// =============================================================================

/// Create the API router.
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/scalping/config", get(get_config_handler).post(update_config_handler))
        .route("/scalping/state", get(state_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Current scalping configuration.
async fn get_config_handler(State(state): State<Arc<ApiState>>) -> Json<ScalpingConfig> {
    Json(state.config.current())
}

/// Partial configuration update.
async fn update_config_handler(
    State(state): State<Arc<ApiState>>,
    Json(patch): Json<ScalpingConfigPatch>,
) -> Result<Json<ScalpingConfig>, (StatusCode, Json<ErrorResponse>)> {
    state.config.apply(&patch).map(Json).map_err(|e| {
        warn!(error = %e, "Rejected scalping config update");
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse { error: e.to_string() }),
        )
    })
}

/// Tracking state plus the last tick summary.
async fn state_handler(State(state): State<Arc<ApiState>>) -> Json<StateResponse> {
    let view = state.view.borrow().clone();

    Json(StateResponse {
        tracked: view.positions.len(),
        positions: view.positions,
        config: state.config.current(),
        last_tick: view.last_tick,
        last_error: view.last_error,
    })
}

/// Prometheus text exposition.
async fn metrics_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            e.to_string(),
        ),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn create_test_app() -> (Router, watch::Sender<TrackingView>, ConfigHandle) {
        let config = ConfigHandle::new(ScalpingConfig::default());
        let (view_tx, view) = watch::channel(TrackingView::default());
        let state = Arc::new(ApiState {
            config: config.clone(),
            view,
            metrics: Arc::new(Metrics::new().unwrap()),
        });

        (create_router(state), view_tx, config)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_config(json: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/scalping/config")
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (app, _view, _config) = create_test_app();

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let health = body_json(response).await;
        assert_eq!(health["status"], "healthy");
    }

    #[tokio::test]
    async fn test_get_config() {
        let (app, _view, _config) = create_test_app();

        let response = app
            .oneshot(Request::builder().uri("/scalping/config").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let config = body_json(response).await;
        assert_eq!(config["profit_target_pct"], "0.25");
        assert_eq!(config["timezone"], "Asia/Kolkata");
        assert_eq!(config["square_off_time"], "15:15:00");
    }

    #[tokio::test]
    async fn test_patch_config() {
        let (app, _view, config) = create_test_app();

        let response = app
            .oneshot(post_config(r#"{"profit_target_pct": "0.3", "max_position_lots": 8}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["profit_target_pct"], "0.3");
        assert_eq!(body["stop_loss_pct"], "0.15");
        assert_eq!(config.current().max_position_lots, 8);
    }

    #[tokio::test]
    async fn test_invalid_patch_is_422_and_keeps_config() {
        let (app, _view, config) = create_test_app();

        let response = app
            .oneshot(post_config(r#"{"stop_loss_pct": "-0.1"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("stop_loss_pct"));
        assert_eq!(config.current(), ScalpingConfig::default());
    }

    #[tokio::test]
    async fn test_state_reflects_published_view() {
        let (app, view_tx, _config) = create_test_app();
        view_tx.send_modify(|view| view.last_error = Some("upstream down".to_string()));

        let response = app
            .oneshot(Request::builder().uri("/scalping/state").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let state = body_json(response).await;
        assert_eq!(state["tracked"], 0);
        assert_eq!(state["last_error"], "upstream down");
        assert!(state.get("last_tick").is_none());
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (app, _view, _config) = create_test_app();

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("scalper_tracked_positions"));
    }
}
