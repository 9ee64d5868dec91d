//! APM backend: one transaction per request.
//!
//! # Responsibilities
//! - Open an OTLP session to the APM collector at startup
//! - Start a server transaction per request, parented on W3C trace headers
//! - Attach the transaction to the request so handlers can annotate it
//! - End the transaction on every exit path, noting downstream errors
//!
//! # Design Decisions
//! - Transactions are OpenTelemetry spans; the collector speaks OTLP/HTTP
//! - The license key travels as the `api-key` export header
//! - A backend without a session degrades to a pass-through interceptor
//! - Ending is tied to `Drop` of the per-request guard, so panics and
//!   cancelled requests still close their transaction

pub mod propagation;
pub mod transaction;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::request::Parts;
use axum::http::StatusCode;
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer, TracerProvider as _};
use opentelemetry::KeyValue;
use opentelemetry_otlp::{Protocol, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;

use crate::error::Error;
use crate::interceptor::{route_of, Instrument, Interceptor, Monitoring, Observation, Outcome};

use self::propagation::HeaderExtractor;
pub use self::transaction::{transaction_name, Transaction, TransactionExt, TRANSACTION_KEY};
use self::transaction::INCOMPLETE;

/// Default OTLP/HTTP traces endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://otlp.nr-data.net/v1/traces";

/// Instrumentation scope reported with every transaction.
const SCOPE: &str = "request-monitor";

const LICENSE_KEY_LEN: usize = 40;
const MAX_APP_NAMES: usize = 3;

/// Live session with the APM collector.
struct Session {
    provider: SdkTracerProvider,
    tracer: SdkTracer,
    propagator: TraceContextPropagator,
}

/// APM monitoring backend.
#[derive(Clone)]
pub struct TracingBackend {
    session: Option<Arc<Session>>,
    service_name: String,
    license_key: String,
}

impl TracingBackend {
    /// Validate credentials and open an OTLP session.
    pub fn connect(service_name: &str, license_key: &str, endpoint: &str) -> Result<Self, Error> {
        validate_credentials(service_name, license_key)?;
        validate_endpoint(endpoint)?;

        let headers = HashMap::from([("api-key".to_string(), license_key.to_string())]);
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_protocol(Protocol::HttpBinary)
            .with_endpoint(endpoint)
            .with_headers(headers)
            .build()?;

        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(service_resource(service_name))
            .build();

        tracing::info!(service = %service_name, endpoint = %endpoint, "Connected to APM collector");
        Ok(Self::with_provider(service_name, license_key, provider))
    }

    /// Backend over an existing tracer provider.
    pub fn with_provider(service_name: &str, license_key: &str, provider: SdkTracerProvider) -> Self {
        let tracer = provider.tracer(SCOPE);
        Self {
            session: Some(Arc::new(Session {
                provider,
                tracer,
                propagator: TraceContextPropagator::new(),
            })),
            service_name: service_name.to_string(),
            license_key: license_key.to_string(),
        }
    }

    /// Backend with no session; its interceptor records nothing.
    pub fn detached(service_name: &str, license_key: &str) -> Self {
        Self {
            session: None,
            service_name: service_name.to_string(),
            license_key: license_key.to_string(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// License key the session was opened with.
    pub fn license_key(&self) -> &str {
        &self.license_key
    }

    /// Tracer provider of the live session.
    pub fn provider(&self) -> Option<&SdkTracerProvider> {
        self.session.as_ref().map(|s| &s.provider)
    }
}

impl fmt::Debug for TracingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracingBackend")
            .field("service_name", &self.service_name)
            .field("license_key", &"<redacted>")
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Monitoring for TracingBackend {
    fn interceptor(&self) -> Interceptor {
        match &self.session {
            Some(session) => Interceptor::new(session.clone()),
            None => Interceptor::passthrough(),
        }
    }
}

impl Instrument for Session {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn begin(&self, parts: &mut Parts) -> Box<dyn Observation> {
        let route = route_of(parts);
        let name = transaction_name(&parts.method, &route);
        let parent = self.propagator.extract(&HeaderExtractor(&parts.headers));

        let span = self
            .tracer
            .span_builder(name.clone())
            .with_kind(SpanKind::Server)
            .with_attributes([
                KeyValue::new("http.request.method", parts.method.to_string()),
                KeyValue::new("http.route", route),
                KeyValue::new("url.path", parts.uri.path().to_string()),
            ])
            .start_with_context(&self.tracer, &parent);

        let transaction = Transaction::new(parent.with_span(span), name);
        tracing::trace!(
            key = TRANSACTION_KEY,
            transaction = %transaction.name(),
            trace_id = %transaction.trace_id(),
            "Transaction started"
        );
        parts.extensions.insert(transaction.clone());

        Box::new(TransactionGuard {
            transaction,
            finished: false,
        })
    }
}

/// Ends the transaction when dropped.
struct TransactionGuard {
    transaction: Transaction,
    finished: bool,
}

impl TransactionGuard {
    fn record_status(&self, status: StatusCode) {
        self.transaction.add_attribute(KeyValue::new(
            "http.response.status_code",
            i64::from(status.as_u16()),
        ));
    }
}

impl Observation for TransactionGuard {
    fn finish(mut self: Box<Self>, outcome: Outcome<'_>) {
        match outcome {
            Outcome::Error(err) => self.transaction.notice_error(err),
            Outcome::Rejected { status, error } => {
                self.record_status(status);
                self.transaction.notice_error(error);
            }
            Outcome::Response { status, .. } => {
                self.record_status(status);
                if status.is_server_error() {
                    self.transaction.context().span().set_status(Status::error(""));
                }
            }
        }
        self.finished = true;
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(transaction = %self.transaction.name(), "Transaction abandoned");
            self.transaction.notice_error(&INCOMPLETE);
        }
        self.transaction.end();
    }
}

fn service_resource(service_name: &str) -> Resource {
    Resource::builder()
        .with_service_name(service_name.to_string())
        .build()
}

fn validate_credentials(service_name: &str, license_key: &str) -> Result<(), Error> {
    if service_name.trim().is_empty() {
        return Err(Error::InvalidCredentials("service name is required".into()));
    }
    if service_name.split(';').count() > MAX_APP_NAMES {
        return Err(Error::InvalidCredentials(format!(
            "at most {} service names may be given",
            MAX_APP_NAMES
        )));
    }
    if license_key.len() != LICENSE_KEY_LEN {
        return Err(Error::InvalidCredentials(format!(
            "license key must be {} characters, got {}",
            LICENSE_KEY_LEN,
            license_key.len()
        )));
    }
    if !license_key.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::InvalidCredentials(
            "license key must be alphanumeric".into(),
        ));
    }
    Ok(())
}

fn validate_endpoint(endpoint: &str) -> Result<(), Error> {
    let url = url::Url::parse(endpoint).map_err(|e| Error::Endpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::Endpoint {
            endpoint: endpoint.to_string(),
            reason: format!("unsupported scheme {:?}", other),
        }),
    }
}
