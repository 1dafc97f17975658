//! HTTP API route definitions.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{health, metrics, ready, status, AppState};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Status endpoint
        .route("/api/v1/status", get(status))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::StatsSnapshot;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tokio::sync::watch;
    use tower::ServiceExt;

    fn state() -> (watch::Sender<StatsSnapshot>, AppState) {
        let (tx, rx) = watch::channel(StatsSnapshot::initial(true));
        (tx, AppState::new(rx, "paper"))
    }

    async fn get(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let (_tx, state) = state();
        let response = get(create_router(state), "/health").await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_503_when_not_ready() {
        let (_tx, state) = state();
        let response = get(create_router(state), "/ready").await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_200_when_ready() {
        let (_tx, state) = state();
        state.set_ready(true);
        let response = get(create_router(state), "/ready").await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_reports_latest_snapshot() {
        let (tx, state) = state();
        state.set_ready(true);
        tx.send_modify(|s| {
            s.scans = 7;
            s.trades_executed = 1;
        });

        let response = get(create_router(state), "/api/v1/status").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["gateway"], "paper");
        assert_eq!(json["stats"]["scans"], 7);
        assert_eq!(json["stats"]["trades_executed"], 1);
        assert_eq!(json["stats"]["total_expected_profit"], "0");
    }

    #[tokio::test]
    async fn metrics_unavailable_without_recorder() {
        let (_tx, state) = state();
        let response = get(create_router(state), "/metrics").await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
