//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::apm::DEFAULT_ENDPOINT;
use crate::stats::DEFAULT_LATENCY_BUCKETS;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MonitorConfig {
    /// Listener configuration for the host server.
    pub listener: ListenerConfig,

    /// Backend selection and credentials.
    pub monitoring: MonitoringConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Monitoring backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Backend name: "tracing" or "metrics". Anything else disables monitoring.
    pub backend: String,

    /// Service name reported to the backend.
    pub service_name: String,

    /// APM license key. Unused by the metrics backend.
    pub license_key: String,

    /// OTLP/HTTP traces endpoint of the APM collector.
    pub otlp_endpoint: String,

    /// Latency histogram buckets in milliseconds.
    pub latency_buckets_ms: Vec<f64>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            backend: "metrics".to_string(),
            service_name: "request-monitor".to_string(),
            license_key: String::new(),
            otlp_endpoint: DEFAULT_ENDPOINT.to_string(),
            latency_buckets_ms: DEFAULT_LATENCY_BUCKETS.to_vec(),
        }
    }
}
