//! HTTP handlers and server lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use prometheus_client::encoding::text;
use prometheus_client::registry::Registry;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::plugin::{DOC_PATH, METRICS_PATH, PluginInfo};

/// Content type of the OpenMetrics text exposition.
const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Create the metrics-serving application mounted at the fixed path.
pub fn metrics_app(registry: Arc<Registry>) -> Router {
    Router::new()
        .route(METRICS_PATH, get(metrics_handler))
        .layer(CorsLayer::permissive())
        .with_state(registry)
}

/// Create the documentation route table.
pub fn doc_router(info: PluginInfo) -> Router {
    Router::new()
        .route(DOC_PATH, get(doc_handler))
        .with_state(Arc::new(info))
}

/// Base router of the host application the plugin mounts into.
pub fn host_app() -> Router {
    Router::new()
        .route("/", get(landing_handler))
        .route("/health", get(health_handler))
}

/// Handler for the metrics endpoint.
///
/// Encoding runs the registered collector; a collector fault surfaces as
/// an internal server error rather than a partial exposition.
async fn metrics_handler(State(registry): State<Arc<Registry>>) -> Response {
    let mut body = String::new();

    match text::encode(&mut body, &registry) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", OPENMETRICS_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Handler for the documentation endpoint.
async fn doc_handler(State(info): State<Arc<PluginInfo>>) -> String {
    format!(
        "{} {}\n\n{}\n\nMetrics are exposed at {} in the OpenMetrics text format.\nSource: {}\n",
        info.name, info.version, info.description, METRICS_PATH, info.url
    )
}

/// Handler for the landing page of the host application.
async fn landing_handler() -> Response {
    (StatusCode::OK, "MAD host\n").into_response()
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// HTTP server configuration.
pub struct HttpServer {
    app: Router,
    listen_addr: SocketAddr,
}

impl HttpServer {
    /// Create a new HTTP server over a finished router.
    pub fn new(app: Router, listen_addr: SocketAddr) -> Self {
        Self { app, listen_addr }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        info!(addr = %self.listen_addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(addr = %self.listen_addr, "HTTP server listening");

        // Run server with graceful shutdown
        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{HostServices, MadCollector};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use prometheus_client::encoding::DescriptorEncoder;
    use tower::ServiceExt;

    fn registry_with_collector() -> Arc<Registry> {
        let mut registry = Registry::default();
        let collector = MadCollector::new(HostServices::new(), "mad", false);
        registry.register_collector(Box::new(collector));
        Arc::new(registry)
    }

    #[derive(Debug)]
    struct FailingCollector;

    impl prometheus_client::collector::Collector for FailingCollector {
        fn encode(&self, _encoder: DescriptorEncoder) -> Result<(), std::fmt::Error> {
            Err(std::fmt::Error)
        }
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let router = metrics_app(registry_with_collector());

        let response = router
            .oneshot(Request::get(METRICS_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response.headers().get("content-type").unwrap();
        assert!(
            content_type
                .to_str()
                .unwrap()
                .contains("application/openmetrics-text")
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("mad_scrapes_total 1"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint_collector_fault_returns_500() {
        let mut registry = Registry::default();
        registry.register_collector(Box::new(FailingCollector));
        let router = metrics_app(Arc::new(registry));

        let response = router
            .oneshot(Request::get(METRICS_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_doc_endpoint() {
        let router = doc_router(PluginInfo::from_build());

        let response = router
            .oneshot(Request::get(DOC_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("mad-exporter-prometheus"));
        assert!(body.contains(METRICS_PATH));
    }

    #[tokio::test]
    async fn test_host_app_endpoints() {
        let router = host_app();

        let response = router
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
