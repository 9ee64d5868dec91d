//! Backend selection.
//!
//! # Responsibilities
//! - Map a backend kind to exactly one constructed backend
//! - Hide the concrete backend behind [`Monitoring`]
//! - Enforce the startup failure policy
//!
//! # Design Decisions
//! - Closed enum dispatch; a new backend adds a kind and a variant
//! - Unknown kinds yield [`Backend::Disabled`], whose interceptor is a
//!   pass-through
//! - A backend that cannot be constructed aborts startup: the process does
//!   not serve traffic unobserved

use std::fmt;
use std::str::FromStr;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::apm::TracingBackend;
use crate::config::MonitoringConfig;
use crate::error::Error;
use crate::interceptor::{Interceptor, Monitoring};
use crate::stats::{MetricsBackend, DEFAULT_LATENCY_BUCKETS};

/// Available backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Distributed tracing / APM.
    Tracing,
    /// Metrics / stats.
    Metrics,
}

impl BackendKind {
    /// Kind for a numeric selector code (`0` tracing, `1` metrics).
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(BackendKind::Tracing),
            1 => Some(BackendKind::Metrics),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Tracing => "tracing",
            BackendKind::Metrics => "metrics",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized backend name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown monitoring backend {0:?}")]
pub struct UnknownBackend(pub String);

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tracing" | "apm" | "newrelic" => Ok(BackendKind::Tracing),
            "metrics" | "stats" | "prometheus" => Ok(BackendKind::Metrics),
            _ => Err(UnknownBackend(s.to_string())),
        }
    }
}

/// The constructed monitoring backend.
///
/// Built once at startup and held by the host for the process lifetime.
/// Clones share the underlying client.
#[derive(Debug, Clone)]
pub enum Backend {
    Tracing(TracingBackend),
    Metrics(MetricsBackend),
    /// No backend; requests pass through unobserved.
    Disabled,
}

impl Backend {
    pub fn kind(&self) -> Option<BackendKind> {
        match self {
            Backend::Tracing(_) => Some(BackendKind::Tracing),
            Backend::Metrics(_) => Some(BackendKind::Metrics),
            Backend::Disabled => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Backend::Disabled)
    }

    /// Scrape handle when the metrics backend is selected.
    pub fn prometheus_handle(&self) -> Option<&PrometheusHandle> {
        match self {
            Backend::Metrics(backend) => Some(backend.handle()),
            _ => None,
        }
    }
}

impl Monitoring for Backend {
    fn interceptor(&self) -> Interceptor {
        match self {
            Backend::Tracing(backend) => backend.interceptor(),
            Backend::Metrics(backend) => backend.interceptor(),
            Backend::Disabled => Interceptor::passthrough(),
        }
    }
}

/// Construct the backend for `kind`, aborting startup on failure.
///
/// # Panics
///
/// Panics with a message naming the backend and the cause when the backend
/// cannot be initialized.
pub fn create(kind: Option<BackendKind>, service_name: &str, credentials: &str) -> Backend {
    let settings = Settings {
        service_name,
        credentials,
        endpoint: crate::apm::DEFAULT_ENDPOINT,
        latency_buckets: &DEFAULT_LATENCY_BUCKETS,
    };
    build(kind, &settings)
}

/// Construct the backend described by the configuration, aborting startup on
/// failure.
pub fn from_config(config: &MonitoringConfig) -> Backend {
    let kind = match config.backend.parse::<BackendKind>() {
        Ok(kind) => Some(kind),
        Err(err) => {
            tracing::warn!(error = %err, "Monitoring disabled");
            None
        }
    };
    let settings = Settings {
        service_name: &config.service_name,
        credentials: &config.license_key,
        endpoint: &config.otlp_endpoint,
        latency_buckets: &config.latency_buckets_ms,
    };
    build(kind, &settings)
}

/// Construct the backend for `kind`, returning construction failures.
pub fn try_create(
    kind: Option<BackendKind>,
    service_name: &str,
    credentials: &str,
) -> Result<Backend, Error> {
    let settings = Settings {
        service_name,
        credentials,
        endpoint: crate::apm::DEFAULT_ENDPOINT,
        latency_buckets: &DEFAULT_LATENCY_BUCKETS,
    };
    construct(kind, &settings)
}

struct Settings<'a> {
    service_name: &'a str,
    credentials: &'a str,
    endpoint: &'a str,
    latency_buckets: &'a [f64],
}

fn build(kind: Option<BackendKind>, settings: &Settings<'_>) -> Backend {
    match construct(kind, settings) {
        Ok(backend) => backend,
        Err(err) => {
            // kind is always Some here: Disabled cannot fail
            let name = kind.map(|k| k.as_str()).unwrap_or("monitoring");
            tracing::error!(backend = name, error = %err, "Monitoring backend failed to start");
            panic!("{} backend: {}", name, err);
        }
    }
}

fn construct(kind: Option<BackendKind>, settings: &Settings<'_>) -> Result<Backend, Error> {
    match kind {
        Some(BackendKind::Tracing) => TracingBackend::connect(
            settings.service_name,
            settings.credentials,
            settings.endpoint,
        )
        .map(Backend::Tracing),
        Some(BackendKind::Metrics) => {
            MetricsBackend::install(settings.service_name, settings.latency_buckets)
                .map(Backend::Metrics)
        }
        None => {
            tracing::warn!(service = %settings.service_name, "No monitoring backend selected");
            Ok(Backend::Disabled)
        }
    }
}
