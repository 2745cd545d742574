//! HTTP server for the Prometheus metrics endpoint.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::exposition;
use crate::sink::SharedSink;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    sink: SharedSink,
    expected_devices: usize,
}

/// Create the HTTP router.
fn create_router(sink: SharedSink, metrics_path: &str, expected_devices: usize) -> Router {
    let state = AppState {
        sink,
        expected_devices,
    };

    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the metrics endpoint.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let body = state.sink.render();
    debug!(bytes = body.len(), "Served metrics scrape");

    (StatusCode::OK, [(CONTENT_TYPE, exposition::CONTENT_TYPE)], body).into_response()
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// Handler for the /ready endpoint.
///
/// Ready once every configured device has published a reading.
async fn ready_handler(State(state): State<AppState>) -> Response {
    let present = state.sink.series_count();

    if present >= state.expected_devices {
        (StatusCode::OK, "ready\n").into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            format!(
                "not ready - {}/{} devices reporting\n",
                present, state.expected_devices
            ),
        )
            .into_response()
    }
}

/// HTTP server configuration.
pub struct HttpServer {
    sink: SharedSink,
    listen_addr: SocketAddr,
    metrics_path: String,
    expected_devices: usize,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(
        sink: SharedSink,
        listen_addr: SocketAddr,
        metrics_path: String,
        expected_devices: usize,
    ) -> Self {
        Self {
            sink,
            listen_addr,
            metrics_path,
            expected_devices,
        }
    }

    /// Bind the listen address.
    pub async fn bind(&self) -> anyhow::Result<TcpListener> {
        let listener = TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(
            addr = %listener.local_addr().unwrap_or(self.listen_addr),
            path = %self.metrics_path,
            "HTTP server listening"
        );
        Ok(listener)
    }

    /// Serve requests on `listener` until the shutdown signal is received.
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let router = create_router(self.sink, &self.metrics_path, self.expected_devices);

        // Run server with graceful shutdown
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if *shutdown.borrow() {
                        break;
                    }
                    if shutdown.changed().await.is_err() {
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
    use crate::sink::MetricsSink;
    use axum::body::Body;
    use axum::http::Request;
    use sensorsim_common::{DeviceIdentity, Reading};
    use tower::ServiceExt;

    fn record_device(sink: &SharedSink, id: &str) {
        sink.record(
            &DeviceIdentity::new("Beijing", "Beijing", "Haidian", "Site2", id),
            Reading::new(20.0, 50.0),
        );
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let sink = MetricsSink::shared();
        record_device(&sink, "DeviceC");
        let router = create_router(sink, "/metrics", 1);

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("text/plain"));

        let body = body_string(response).await;
        assert!(body.contains("device_id=\"DeviceC\""));
    }

    #[tokio::test]
    async fn test_metrics_endpoint_empty_sink() {
        let router = create_router(MetricsSink::shared(), "/metrics", 0);

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(!body.contains("device_id="));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let router = create_router(MetricsSink::shared(), "/metrics", 5);

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_endpoint_not_ready() {
        let sink = MetricsSink::shared();
        record_device(&sink, "DeviceC");
        let router = create_router(sink, "/metrics", 2);

        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(body_string(response).await.contains("1/2"));
    }

    #[tokio::test]
    async fn test_ready_endpoint_ready() {
        let sink = MetricsSink::shared();
        record_device(&sink, "DeviceC");
        record_device(&sink, "DeviceD");
        let router = create_router(sink, "/metrics", 2);

        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_with_no_devices() {
        let router = create_router(MetricsSink::shared(), "/metrics", 0);

        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_custom_metrics_path() {
        let router = create_router(MetricsSink::shared(), "/sim/metrics", 0);

        let response = router
            .clone()
            .oneshot(Request::get("/sim/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Default path should 404
        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bind_conflict_fails() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let server = HttpServer::new(MetricsSink::shared(), addr, "/metrics".to_string(), 0);
        let err = server.bind().await.unwrap_err();

        assert!(err.to_string().contains("Failed to bind"));
    }
}
