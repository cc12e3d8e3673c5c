//! HTTP Metrics
//!
//! Request counters, latency and size histograms, and an in-flight gauge,
//! all registered on a caller-owned [`prometheus::Registry`].

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::body::HttpBody;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
    exponential_buckets,
};

const SUBSYSTEM: &str = "http_incoming";
const LABELS: &[&str] = &["code", "method"];

/// Collectors for inbound HTTP traffic
#[derive(Clone)]
pub struct HttpMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
    request_size: HistogramVec,
    response_size: HistogramVec,
    in_flight: IntGauge,
}

impl HttpMetrics {
    /// Create the collectors under `namespace` and register them on `registry`
    pub fn register(registry: &Registry, namespace: &str) -> prometheus::Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new("requests_total", "Total number of HTTP requests")
                .namespace(namespace)
                .subsystem(SUBSYSTEM),
            LABELS,
        )?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "request_duration_seconds",
                "HTTP request latency in seconds",
            )
            .namespace(namespace)
            .subsystem(SUBSYSTEM),
            LABELS,
        )?;

        let size_buckets = exponential_buckets(100.0, 10.0, 7)?;

        let request_size = HistogramVec::new(
            HistogramOpts::new("request_size_bytes", "HTTP request body size in bytes")
                .namespace(namespace)
                .subsystem(SUBSYSTEM)
                .buckets(size_buckets.clone()),
            LABELS,
        )?;

        let response_size = HistogramVec::new(
            HistogramOpts::new("response_size_bytes", "HTTP response body size in bytes")
                .namespace(namespace)
                .subsystem(SUBSYSTEM)
                .buckets(size_buckets),
            LABELS,
        )?;

        let in_flight = IntGauge::with_opts(
            Opts::new("in_flight_requests", "HTTP requests currently being served")
                .namespace(namespace)
                .subsystem(SUBSYSTEM),
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(request_size.clone()))?;
        registry.register(Box::new(response_size.clone()))?;
        registry.register(Box::new(in_flight.clone()))?;

        Ok(Self {
            registry: registry.clone(),
            requests_total,
            request_duration,
            request_size,
            response_size,
            in_flight,
        })
    }

    /// Render every metric family of the registry in text exposition format
    pub fn render(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }

    fn observe(&self, method: &str, response: &Response, request_size: Option<u64>, started: Instant) {
        let code = response.status().as_u16().to_string();
        let labels = [code.as_str(), method];

        self.requests_total.with_label_values(&labels).inc();
        self.request_duration
            .with_label_values(&labels)
            .observe(started.elapsed().as_secs_f64());

        if let Some(size) = request_size {
            self.request_size
                .with_label_values(&labels)
                .observe(size as f64);
        }

        let response_size = content_length(response.headers())
            .or_else(|| response.body().size_hint().exact());
        if let Some(size) = response_size {
            self.response_size
                .with_label_values(&labels)
                .observe(size as f64);
        }
    }
}

/// Decrements the in-flight gauge even if the inner service panics
struct InFlight<'a>(&'a IntGauge);

impl<'a> InFlight<'a> {
    fn enter(gauge: &'a IntGauge) -> Self {
        gauge.inc();
        Self(gauge)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.dec();
    }
}

/// Middleware recording one observation per request
pub async fn track_metrics(
    State(metrics): State<Arc<HttpMetrics>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let request_size =
        content_length(req.headers()).or_else(|| req.body().size_hint().exact());
    let started = Instant::now();

    let response = {
        let _in_flight = InFlight::enter(&metrics.in_flight);
        next.run(req).await
    };

    metrics.observe(&method, &response, request_size, started);
    response
}

/// GET /metrics
pub async fn metrics_handler(State(metrics): State<Arc<HttpMetrics>>) -> Response {
    match metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Router exposing `GET /metrics`
pub fn metrics_router(metrics: Arc<HttpMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::middleware::from_fn_with_state;
    use tower::ServiceExt;

    fn app(metrics: Arc<HttpMetrics>) -> Router {
        Router::new()
            .route("/ok", get(|| async { "hello" }))
            .route("/teapot", get(|| async { StatusCode::IM_A_TEAPOT }))
            .layer(from_fn_with_state(metrics, track_metrics))
    }

    #[tokio::test]
    async fn test_records_requests_by_code_and_method() {
        let registry = Registry::new();
        let metrics = Arc::new(HttpMetrics::register(&registry, "conduit").unwrap());

        for uri in ["/ok", "/ok", "/teapot"] {
            let response = app(metrics.clone())
                .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert!(response.status() == StatusCode::OK || response.status().as_u16() == 418);
        }

        assert_eq!(
            metrics.requests_total.with_label_values(&["200", "GET"]).get(),
            2
        );
        assert_eq!(
            metrics.requests_total.with_label_values(&["418", "GET"]).get(),
            1
        );
        assert_eq!(metrics.in_flight.get(), 0);
        assert_eq!(
            metrics
                .response_size
                .with_label_values(&["200", "GET"])
                .get_sample_count(),
            2
        );
    }

    #[tokio::test]
    async fn test_render_exposes_namespaced_families() {
        let registry = Registry::new();
        let metrics = Arc::new(HttpMetrics::register(&registry, "conduit").unwrap());

        app(metrics.clone())
            .oneshot(axum::http::Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let text = metrics.render().unwrap();
        assert!(text.contains("conduit_http_incoming_requests_total"));
        assert!(text.contains("conduit_http_incoming_request_duration_seconds"));
        assert!(text.contains("conduit_http_incoming_in_flight_requests"));
    }

    #[test]
    fn test_double_registration_is_rejected() {
        let registry = Registry::new();
        HttpMetrics::register(&registry, "conduit").unwrap();
        assert!(HttpMetrics::register(&registry, "conduit").is_err());
    }

    #[tokio::test]
    async fn test_metrics_router_serves_text_format() {
        let registry = Registry::new();
        let metrics = Arc::new(HttpMetrics::register(&registry, "conduit").unwrap());

        let response = metrics_router(metrics)
            .oneshot(axum::http::Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }
}
