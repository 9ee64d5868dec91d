//! Metrics backend: one latency/outcome sample per request.
//!
//! # Data Flow
//! ```text
//! request enters
//!     → Measurement (start instant, method, route, content-length)
//! downstream returns
//!     → Sample (latency, status or error, response size)
//!     → measures::record → metrics facade → Prometheus recorder
//! scraper polls
//!     → scrape::router → PrometheusHandle::render
//! ```
//!
//! # Design Decisions
//! - Uses the `metrics` facade; the backend installs the Prometheus recorder
//!   once at startup and keeps its handle for the scrape endpoint
//! - The service name becomes a global `service` label
//! - Successful requests carry volume measures, failed ones only latency

pub mod measures;
pub mod scrape;
pub mod tags;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use axum::http::request::Parts;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use crate::error::Error;
use crate::interceptor::outcome::content_length;
use crate::interceptor::{route_of, Instrument, Interceptor, Monitoring, Observation, Outcome};

pub use self::measures::{Sample, SampleOutcome, DEFAULT_LATENCY_BUCKETS};
pub use self::tags::{TagError, TagKey, TagSet};

/// Error tag recorded when the handler never returned.
const INCOMPLETE: &str = "request did not complete";

/// Metrics monitoring backend.
#[derive(Clone)]
pub struct MetricsBackend {
    handle: PrometheusHandle,
    service_name: String,
}

impl MetricsBackend {
    /// Install the process-wide Prometheus recorder.
    ///
    /// Fails if a recorder is already installed.
    pub fn install(service_name: &str, latency_buckets: &[f64]) -> Result<Self, Error> {
        let handle = Self::builder(service_name, latency_buckets)?.install_recorder()?;
        measures::describe();

        tracing::info!(service = %service_name, "Connected to Prometheus recorder");
        Ok(Self::with_handle(service_name, handle))
    }

    /// Build a recorder without installing it.
    ///
    /// The caller decides where the recorder is installed (for example
    /// `metrics::set_default_local_recorder`); the returned backend renders
    /// from its handle.
    pub fn unregistered(
        service_name: &str,
        latency_buckets: &[f64],
    ) -> Result<(Self, PrometheusRecorder), Error> {
        let recorder = Self::builder(service_name, latency_buckets)?.build_recorder();
        let backend = Self::with_handle(service_name, recorder.handle());
        Ok((backend, recorder))
    }

    /// Backend rendering from an existing handle.
    pub fn with_handle(service_name: &str, handle: PrometheusHandle) -> Self {
        Self {
            handle,
            service_name: service_name.to_string(),
        }
    }

    fn builder(service_name: &str, latency_buckets: &[f64]) -> Result<PrometheusBuilder, Error> {
        let builder = PrometheusBuilder::new()
            .add_global_label("service", service_name)
            .set_buckets_for_metric(Matcher::Full(measures::LATENCY.to_string()), latency_buckets)?;
        Ok(builder)
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Current samples in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl fmt::Debug for MetricsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsBackend")
            .field("service_name", &self.service_name)
            .finish()
    }
}

impl Monitoring for MetricsBackend {
    fn interceptor(&self) -> Interceptor {
        Interceptor::new(Arc::new(Stats))
    }
}

/// Stateless instrument; samples go to whichever recorder is current.
struct Stats;

impl Instrument for Stats {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn begin(&self, parts: &mut Parts) -> Box<dyn Observation> {
        Box::new(Measurement {
            start: Instant::now(),
            method: parts.method.to_string(),
            path: route_of(parts),
            bytes_in: content_length(&parts.headers).unwrap_or(0),
            emitted: false,
        })
    }
}

/// Timing of one in-flight request.
struct Measurement {
    start: Instant,
    method: String,
    path: String,
    bytes_in: u64,
    emitted: bool,
}

impl Measurement {
    fn emit(&mut self, outcome: SampleOutcome, bytes_out: u64) {
        let sample = Sample {
            latency: self.start.elapsed(),
            method: std::mem::take(&mut self.method),
            path: std::mem::take(&mut self.path),
            outcome,
            bytes_in: self.bytes_in,
            bytes_out,
        };
        self.emitted = true;
        measures::record(&sample);
    }
}

impl Observation for Measurement {
    fn finish(mut self: Box<Self>, outcome: Outcome<'_>) {
        match outcome {
            Outcome::Response { status, bytes_out } => {
                self.emit(SampleOutcome::Status(status.as_u16()), bytes_out)
            }
            Outcome::Error(err) | Outcome::Rejected { error: err, .. } => {
                self.emit(SampleOutcome::Error(err.to_string()), 0)
            }
        }
    }
}

impl Drop for Measurement {
    fn drop(&mut self) {
        if !self.emitted {
            self.emit(SampleOutcome::Error(INCOMPLETE.to_string()), 0);
        }
    }
}
