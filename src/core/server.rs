//! HTTP endpoint a Prometheus server scrapes.
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | Landing page |
//! | GET | `/metrics` | Prometheus text exposition |

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, Registry, TextEncoder};
use std::net::SocketAddr;

const INDEX_PAGE: &str = r#"<html>
<head><title>Twilio Usage Exporter</title></head>
<body>
<h1>Twilio Usage Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>
"#;

#[derive(Clone)]
pub struct MetricsState {
    pub registry: Registry,
}

/// Build the exporter router.
pub fn build_router(registry: Registry) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(metrics))
        .with_state(MetricsState { registry })
}

/// Bind `listen` and serve until Ctrl-C.
pub async fn serve(listen: SocketAddr, registry: Registry) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {}", listen))?;

    tracing::info!("Serving metrics on http://{}/metrics", listener.local_addr()?);

    axum::serve(listener, build_router(registry))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Metrics server failed")?;

    tracing::info!("Metrics server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// GET /
async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

/// GET /metrics
async fn metrics(State(state): State<MetricsState>) -> Response {
    // Collectors block on the upstream request, keep them off the async workers
    let registry = state.registry.clone();
    let families = match tokio::task::spawn_blocking(move || registry.gather()).await {
        Ok(families) => families,
        Err(e) => {
            tracing::error!(error = %e, "metrics collection panicked");
            return (StatusCode::INTERNAL_SERVER_ERROR, "metrics collection failed").into_response();
        }
    };

    let encoder = TextEncoder::new();
    let mut body = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut body) {
        tracing::error!(error = %e, "failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response();
    }

    (
        StatusCode::OK,
        [("content-type", encoder.format_type().to_string())],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::Catalog;
    use crate::core::client::UsageClient;
    use crate::core::collector::UsageCollector;
    use crate::core::config::ExporterConfig;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn registry_for(server: &MockServer) -> Registry {
        let config = ExporterConfig {
            account_sid: "AC123".to_string(),
            basic_token: "dG9rZW4=".to_string(),
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            user_agent: "twil".to_string(),
            listen: "127.0.0.1:0".parse().unwrap(),
        };
        let collector = UsageCollector::new(
            Catalog::standard().unwrap(),
            UsageClient::new(&config).unwrap(),
        );
        let registry = Registry::new();
        registry.register(Box::new(collector)).unwrap();
        registry
    }

    async fn get_body(router: Router, uri: &str) -> (StatusCode, String, String) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = router.oneshot(req).await.unwrap();
        let status = resp.status();
        let content_type = resp
            .headers()
            .get("content-type")
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn metrics_exposes_usage_counters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2010-04-01/Accounts/AC123/Usage/Records.json"))
            .and(header("authorization", "Basic dG9rZW4="))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"usage_records": [
                    {"category": "calls", "count": "42.0"},
                    {"category": "sms", "count": "3"}
                ]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let (status, content_type, body) = get_body(build_router(registry_for(&server)), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/plain"));
        assert!(body.contains("# HELP twil_calls Total Call Minutes"));
        assert!(body.contains("# TYPE twil_calls counter"));
        assert!(body.contains("twil_calls 42"));
        assert!(body.contains("twil_sms 3"));
    }

    #[tokio::test]
    async fn metrics_survives_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (status, _, body) = get_body(build_router(registry_for(&server)), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("twil_"));
    }

    #[tokio::test]
    async fn index_links_to_metrics() {
        let router = build_router(Registry::new());
        let (status, content_type, body) = get_body(router, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/html"));
        assert!(body.contains("href=\"/metrics\""));
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let router = build_router(Registry::new());
        let (status, _, _) = get_body(router, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
