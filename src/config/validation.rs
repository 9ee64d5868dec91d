//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (bind address, buckets, endpoint)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MonitorConfig → Result<(), Vec<ValidationError>>
//! - Credentials are checked by the backend itself at construction

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::MonitorConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("monitoring.service_name must not be empty")]
    ServiceName,

    #[error("monitoring.otlp_endpoint {0:?} is not an http(s) URL")]
    Endpoint(String),

    #[error("monitoring.latency_buckets_ms must be non-empty, positive and strictly increasing")]
    Buckets,
}

/// Check a parsed configuration.
pub fn validate_config(config: &MonitorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let monitoring = &config.monitoring;
    if monitoring.service_name.trim().is_empty() {
        errors.push(ValidationError::ServiceName);
    }

    let endpoint_ok = Url::parse(&monitoring.otlp_endpoint)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false);
    if !endpoint_ok {
        errors.push(ValidationError::Endpoint(monitoring.otlp_endpoint.clone()));
    }

    let buckets = &monitoring.latency_buckets_ms;
    let buckets_ok = !buckets.is_empty()
        && buckets.iter().all(|b| b.is_finite() && *b > 0.0)
        && buckets.windows(2).all(|w| w[0] < w[1]);
    if !buckets_ok {
        errors.push(ValidationError::Buckets);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
