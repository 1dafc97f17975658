//! HTTP API handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tokio::sync::watch;

use crate::bot::StatsSnapshot;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Whether the scan loop is running.
    pub ready: Arc<AtomicBool>,
    /// Latest statistics published by the scan loop.
    pub stats: watch::Receiver<StatsSnapshot>,
    /// Prometheus render handle, when the recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    /// Name of the active gateway.
    pub gateway: &'static str,
}

impl AppState {
    /// Create new app state reading statistics from `stats`.
    pub fn new(stats: watch::Receiver<StatsSnapshot>, gateway: &'static str) -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
            stats,
            metrics: None,
            gateway,
        }
    }

    /// Serve `/metrics` from this handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether service is ready.
    pub ready: bool,
    /// Active gateway.
    pub gateway: &'static str,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Active gateway.
    pub gateway: &'static str,
    /// Run statistics.
    pub stats: StatsSnapshot,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let response = ReadyResponse {
        ready: is_ready,
        gateway: state.gateway,
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns the latest statistics snapshot.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.stats.borrow().clone();
    let status = match (state.is_ready(), stats.running) {
        (true, true) => "running",
        (_, false) => "stopped",
        (false, true) => "starting",
    };

    Json(StatusResponse {
        status,
        gateway: state.gateway,
        stats,
    })
}

/// Prometheus metrics handler.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed\n".to_string(),
        ),
    }
}
