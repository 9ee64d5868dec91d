//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::fmt;

use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use metrics_exporter_prometheus::PrometheusRecorder;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};
use request_monitor::stats::DEFAULT_LATENCY_BUCKETS;
use request_monitor::{MetricsBackend, TracingBackend};
use tower::Service;

/// A well-formed 40 character license key.
pub const LICENSE_KEY: &str = "0123456789abcdef0123456789abcdef01234567";

/// Error returned by failing downstream services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestError(pub String);

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tracing backend whose transactions land in memory.
pub fn tracing_backend() -> (TracingBackend, InMemorySpanExporter) {
    let exporter = InMemorySpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    let backend = TracingBackend::with_provider("orders", LICENSE_KEY, provider);
    (backend, exporter)
}

/// Metrics backend with a recorder the test installs locally.
pub fn metrics_backend() -> (MetricsBackend, PrometheusRecorder) {
    MetricsBackend::unregistered("orders", &DEFAULT_LATENCY_BUCKETS).unwrap()
}

/// Build a request with an empty body.
pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Build a request carrying `len` bytes and a matching content-length.
pub fn request_with_body(method: Method, uri: &str, len: usize) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_LENGTH, len.to_string())
        .body(Body::from("x".repeat(len)))
        .unwrap()
}

/// Downstream service answering every request with a fixed response.
pub fn respond(
    status: StatusCode,
    body: &'static str,
) -> impl Service<Request<Body>, Response = Response<Body>, Error = TestError, Future: Send> + Clone + Send
{
    tower::service_fn(move |_req: Request<Body>| async move {
        Ok::<_, TestError>(
            Response::builder()
                .status(status)
                .body(Body::from(body))
                .unwrap(),
        )
    })
}

/// Downstream service failing every request with `message`.
pub fn failing(
    message: &'static str,
) -> impl Service<Request<Body>, Response = Response<Body>, Error = TestError, Future: Send> + Clone + Send
{
    tower::service_fn(move |_req: Request<Body>| async move {
        Err::<Response<Body>, _>(TestError(message.to_string()))
    })
}

/// Find the exposition line for `metric` whose labels contain every fragment.
pub fn find_line<'a>(text: &'a str, metric: &str, fragments: &[&str]) -> Option<&'a str> {
    text.lines().find(|line| {
        line.strip_prefix(metric)
            .is_some_and(|rest| rest.starts_with('{'))
            && fragments.iter().all(|f| line.contains(f))
    })
}

/// Numeric value of an exposition line.
pub fn value_of(line: &str) -> f64 {
    line.rsplit(' ').next().unwrap().parse().unwrap()
}
