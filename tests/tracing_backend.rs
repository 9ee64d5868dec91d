//! Interception tests for the APM backend.

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, Response, StatusCode};
use opentelemetry::trace::{SpanId, SpanKind, Status, TraceId};
use opentelemetry::{KeyValue, Value};
use opentelemetry_sdk::trace::SpanData;
use request_monitor::{Monitoring, TransactionExt};
use tower::{Layer, Service, ServiceExt};

mod common;
use common::TestError;

fn attribute(span: &SpanData, key: &str) -> Option<Value> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.clone())
}

#[tokio::test]
async fn test_one_transaction_per_request() {
    let (backend, exporter) = common::tracing_backend();
    let service = backend
        .interceptor()
        .layer(common::respond(StatusCode::OK, "item"));

    for _ in 0..3 {
        let response = service
            .clone()
            .oneshot(common::request(Method::GET, "/items/:id"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 3);
    for span in &spans {
        assert_eq!(span.name, "/items/:id [GET]");
        assert_eq!(span.span_kind, SpanKind::Server);
        assert_eq!(span.status, Status::Unset);
        assert_eq!(
            attribute(span, "http.response.status_code"),
            Some(Value::I64(200))
        );
        assert_eq!(
            attribute(span, "http.request.method"),
            Some(Value::from("GET"))
        );
    }
}

#[tokio::test]
async fn test_error_is_noticed_and_passed_through() {
    let (backend, exporter) = common::tracing_backend();
    let service = backend.interceptor().layer(common::failing("boom"));

    let result = service
        .oneshot(common::request(Method::POST, "/orders"))
        .await;
    assert_eq!(result.unwrap_err(), TestError("boom".into()));

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 1);
    let span = &spans[0];
    assert_eq!(span.name, "/orders [POST]");
    assert_eq!(span.status, Status::error("boom"));

    let exception = span
        .events
        .events
        .iter()
        .find(|e| e.name == "exception")
        .expect("exception event recorded");
    assert!(exception
        .attributes
        .contains(&KeyValue::new("exception.message", "boom")));
}

#[tokio::test]
async fn test_server_error_status_marks_span() {
    let (backend, exporter) = common::tracing_backend();
    let service = backend
        .interceptor()
        .layer(common::respond(StatusCode::BAD_GATEWAY, "upstream down"));

    let response = service
        .oneshot(common::request(Method::GET, "/upstream"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"upstream down");

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 1);
    assert!(matches!(spans[0].status, Status::Error { .. }));
}

#[tokio::test]
async fn test_handler_can_annotate_transaction() {
    let (backend, exporter) = common::tracing_backend();
    let downstream = tower::service_fn(|req: Request<Body>| async move {
        let txn = req.transaction().expect("transaction attached to request");
        txn.add_attribute(KeyValue::new("customer.tier", "gold"));
        txn.add_event("cache miss", vec![]);
        Ok::<_, TestError>(Response::new(Body::from(txn.name().to_string())))
    });
    let service = backend.interceptor().layer(downstream);

    let response = service
        .oneshot(common::request(Method::GET, "/customers"))
        .await
        .unwrap();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"/customers [GET]");

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(
        attribute(&spans[0], "customer.tier"),
        Some(Value::from("gold"))
    );
    assert!(spans[0].events.events.iter().any(|e| e.name == "cache miss"));
}

#[tokio::test]
async fn test_continues_incoming_trace() {
    let (backend, exporter) = common::tracing_backend();
    let service = backend
        .interceptor()
        .layer(common::respond(StatusCode::OK, ""));

    let request = Request::builder()
        .uri("/items/9")
        .header(
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
        )
        .body(Body::empty())
        .unwrap();
    service.oneshot(request).await.unwrap();

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(
        spans[0].span_context.trace_id(),
        TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap()
    );
    assert_eq!(
        spans[0].parent_span_id,
        SpanId::from_hex("00f067aa0ba902b7").unwrap()
    );
}

#[tokio::test]
async fn test_cancelled_request_still_ends_transaction() {
    let (backend, exporter) = common::tracing_backend();
    let mut service = backend
        .interceptor()
        .layer(common::respond(StatusCode::OK, ""));

    let future = service
        .ready()
        .await
        .unwrap()
        .call(common::request(Method::GET, "/slow"));
    drop(future);

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].status, Status::error("request did not complete"));
}

#[tokio::test]
async fn test_panicking_handler_still_ends_transaction() {
    let (backend, exporter) = common::tracing_backend();
    let downstream = tower::service_fn(|req: Request<Body>| async move {
        if req.uri().path() == "/explode" {
            panic!("handler exploded");
        }
        Ok::<_, TestError>(Response::new(Body::empty()))
    });
    let service = backend.interceptor().layer(downstream);

    let joined = tokio::spawn(service.oneshot(common::request(Method::GET, "/explode"))).await;
    assert!(joined.unwrap_err().is_panic());

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "/explode [GET]");
    assert_eq!(spans[0].status, Status::error("request did not complete"));
}

#[tokio::test]
async fn test_detached_backend_is_transparent() {
    let backend = request_monitor::TracingBackend::detached("orders", common::LICENSE_KEY);
    let downstream = tower::service_fn(|req: Request<Body>| async move {
        let seen = if req.transaction().is_some() { "yes" } else { "no" };
        Ok::<_, TestError>(Response::new(Body::from(seen)))
    });
    let service = backend.interceptor().layer(downstream);

    let response = service
        .oneshot(common::request(Method::GET, "/items/1"))
        .await
        .unwrap();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"no");
}
