//! Backend construction errors.
//!
//! Per-request failures never surface here: the interceptor passes the
//! downstream result through untouched and telemetry problems are logged.

use thiserror::Error;

/// Errors that can occur while constructing a monitoring backend.
#[derive(Debug, Error)]
pub enum Error {
    /// Service name or license key rejected before contacting the backend.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Collector endpoint is not a usable URL.
    #[error("invalid collector endpoint {endpoint:?}: {reason}")]
    Endpoint { endpoint: String, reason: String },

    /// OTLP span exporter could not be built.
    #[error("span exporter: {0}")]
    Exporter(#[from] opentelemetry_otlp::ExporterBuildError),

    /// Prometheus recorder could not be built or installed.
    #[error("metrics recorder: {0}")]
    Recorder(#[from] metrics_exporter_prometheus::BuildError),
}
