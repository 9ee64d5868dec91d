//! Measures and per-request samples.
//!
//! # Metrics
//! - `http_request_latency_milliseconds` (histogram): every completed request
//! - `http_request_accepted_bytes` (histogram): request content-length,
//!   successful requests only
//! - `http_response_size_bytes` (histogram): response size, successful
//!   requests only
//!
//! Failed requests only record latency, tagged with the error message.

use std::time::Duration;

use metrics::{describe_histogram, histogram, Unit};

use super::tags::{TagError, TagKey, TagSet};

pub const LATENCY: &str = "http_request_latency_milliseconds";
pub const REQUEST_ACCEPTED: &str = "http_request_accepted_bytes";
pub const RESPONSE_SIZE: &str = "http_response_size_bytes";

/// Default latency buckets in milliseconds.
pub const DEFAULT_LATENCY_BUCKETS: [f64; 12] = [
    1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
];

/// Describe every measure to the installed recorder.
pub fn describe() {
    describe_histogram!(LATENCY, Unit::Milliseconds, "Request latency");
    describe_histogram!(
        REQUEST_ACCEPTED,
        Unit::Bytes,
        "Request content-length of accepted requests"
    );
    describe_histogram!(RESPONSE_SIZE, Unit::Bytes, "Response size of accepted requests");
}

/// How a sampled request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    Status(u16),
    Error(String),
}

/// One completed request, ready to emit.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub latency: Duration,
    pub method: String,
    pub path: String,
    pub outcome: SampleOutcome,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

impl Sample {
    pub fn latency_ms(&self) -> f64 {
        self.latency.as_secs_f64() * 1000.0
    }

    /// Tags for this sample: method, path and either status or error.
    pub fn tags(&self) -> Result<TagSet, TagError> {
        let tags = TagSet::new()
            .insert(TagKey::METHOD, self.method.as_str())?
            .insert(TagKey::PATH, self.path.as_str())?;
        match &self.outcome {
            SampleOutcome::Status(code) => tags.insert(TagKey::STATUS, code.to_string()),
            SampleOutcome::Error(message) => tags.insert(TagKey::ERROR, message.as_str()),
        }
    }
}

/// Emit a sample through the metrics facade.
///
/// A sample whose tags cannot be built is dropped and logged.
pub fn record(sample: &Sample) {
    let labels = match sample.tags() {
        Ok(tags) => tags.labels(),
        Err(err) => {
            tracing::warn!(
                method = %sample.method,
                path = %sample.path,
                error = %err,
                "Dropping request sample"
            );
            return;
        }
    };

    histogram!(LATENCY, labels.clone()).record(sample.latency_ms());
    if let SampleOutcome::Status(_) = sample.outcome {
        histogram!(REQUEST_ACCEPTED, labels.clone()).record(sample.bytes_in as f64);
        histogram!(RESPONSE_SIZE, labels).record(sample.bytes_out as f64);
    }
}
