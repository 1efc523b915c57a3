//! Tests for the HTTP surface
//!
//! Serves the exporter routes over mock nodes and checks what a Prometheus
//! scraper would see.

use crate::mock_infrastructure::{exporter_config, RpcMockBuilder};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use brpc_core::{metrics::CONTENT_TYPE, registry::CollectorRegistry, scrape::ScrapeOrchestrator};
use serde_json::json;
use server::create_app;
use std::sync::Arc;
use tower::ServiceExt;

async fn get(app: Router, path: &str) -> (StatusCode, Option<String>, String) {
    let request = Request::builder().uri(path).method("GET").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    let content_type =
        parts.headers.get("content-type").and_then(|v| v.to_str().ok()).map(str::to_string);
    let body = String::from_utf8(to_bytes(body, usize::MAX).await.unwrap().to_vec()).unwrap();
    (parts.status, content_type, body)
}

async fn app_for(mock: &RpcMockBuilder) -> Router {
    let config = exporter_config("starknet", "starknet", None, &[(&mock.url(), "alpha")]);
    let registry = CollectorRegistry::from_config(&config).unwrap();
    create_app(Arc::new(ScrapeOrchestrator::new(registry.collectors().to_vec(), config.scrape)))
}

/// `/metrics` runs a scrape per request against the configured nodes
#[tokio::test]
async fn test_metrics_scrapes_nodes() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_method_expect("starknet_blockNumber", &json!(640_000), 2);
    let app = app_for(&mock).await;

    for _ in 0..2 {
        let (status, content_type, body) = get(app.clone(), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(CONTENT_TYPE));
        assert!(body.contains("# TYPE brpc_block_height gauge"));
        assert!(body.lines().any(|line| line.starts_with("brpc_block_height{") && line.ends_with(" 640000")));
        assert!(body.lines().any(|line| line.starts_with("brpc_health{") && line.ends_with(" 1")));
    }

    mock.assert_all().await;
}

/// A dead node never turns the scrape itself into an error
#[tokio::test]
async fn test_metrics_with_dead_node() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_server_error();
    let app = app_for(&mock).await;

    let (status, _, body) = get(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.lines().any(|line| line.starts_with("brpc_health{") && line.ends_with(" 0")));
    assert!(!body.contains("brpc_block_height{"));
    assert!(body.lines().any(|line| line == "brpc_exporter_health 1"));
}

/// Probe routes answer without touching the nodes
#[tokio::test]
async fn test_probe_routes_skip_scrape() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_method_expect("starknet_blockNumber", &json!(1), 0);
    let app = app_for(&mock).await;

    for path in ["/liveness", "/readiness"] {
        let (status, _, body) = get(app.clone(), path).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Service ok.");
    }
    let (status, _, body) = get(app, "/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Not implemented.");

    mock.assert_all().await;
}
