use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use brpc_core::{metrics::CONTENT_TYPE, scrape::ScrapeOrchestrator};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const PROBE_OK: &str = "Service ok.";
const NOT_IMPLEMENTED: &str = "Not implemented.";

/// Builds the exporter's HTTP routes.
pub fn create_app(orchestrator: Arc<ScrapeOrchestrator>) -> Router {
    Router::new()
        .route("/metrics", get(handle_metrics))
        .route("/liveness", get(handle_probe))
        .route("/readiness", get(handle_probe))
        .fallback(handle_not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

/// Runs one scrape cycle and returns the Prometheus text exposition.
pub async fn handle_metrics(State(orchestrator): State<Arc<ScrapeOrchestrator>>) -> impl IntoResponse {
    let metrics = orchestrator.collect().await;
    (StatusCode::OK, [("content-type", CONTENT_TYPE)], metrics.render(orchestrator.namespace()))
}

#[allow(clippy::unused_async)]
pub async fn handle_probe() -> impl IntoResponse {
    (StatusCode::OK, PROBE_OK)
}

#[allow(clippy::unused_async)]
pub async fn handle_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NOT_IMPLEMENTED)
}
