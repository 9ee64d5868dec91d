//! Downstream outcome as seen by a backend.

use std::fmt;
use std::sync::Arc;

use axum::http::{header, HeaderMap, Response, StatusCode};
use http_body::Body as HttpBody;

/// Result of the downstream handler, borrowed for the duration of `finish`.
#[derive(Clone, Copy)]
pub enum Outcome<'a> {
    /// Downstream produced a response.
    Response { status: StatusCode, bytes_out: u64 },
    /// Downstream failed.
    Error(&'a dyn fmt::Display),
    /// Downstream rendered a handler error into a response.
    Rejected {
        status: StatusCode,
        error: &'a dyn fmt::Display,
    },
}

impl<'a> Outcome<'a> {
    /// Build the outcome of a response.
    ///
    /// A [`HandlerError`] attached to the response extensions turns the
    /// outcome into [`Outcome::Rejected`]; the response itself is not touched.
    pub fn from_response<B: HttpBody>(response: &'a Response<B>) -> Self {
        if let Some(err) = response.extensions().get::<HandlerError>() {
            return Outcome::Rejected {
                status: response.status(),
                error: err,
            };
        }

        let bytes_out = content_length(response.headers())
            .or_else(|| response.body().size_hint().exact())
            .unwrap_or(0);

        Outcome::Response {
            status: response.status(),
            bytes_out,
        }
    }

    /// Returns true if the downstream handler failed.
    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_) | Outcome::Rejected { .. })
    }

    /// Error message of a failed request.
    pub fn error(&self) -> Option<&'a dyn fmt::Display> {
        match *self {
            Outcome::Error(err) | Outcome::Rejected { error: err, .. } => Some(err),
            Outcome::Response { .. } => None,
        }
    }
}

impl fmt::Debug for Outcome<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Response { status, bytes_out } => f
                .debug_struct("Response")
                .field("status", status)
                .field("bytes_out", bytes_out)
                .finish(),
            Outcome::Error(err) => f.debug_tuple("Error").field(&err.to_string()).finish(),
            Outcome::Rejected { status, error } => f
                .debug_struct("Rejected")
                .field("status", status)
                .field("error", &error.to_string())
                .finish(),
        }
    }
}

/// Error a handler attaches to its response so the interceptor reports it.
///
/// Axum handlers render their errors into responses before the interceptor
/// sees them. An application error type inserts this into the response
/// extensions from its `IntoResponse` impl to keep the failure visible to
/// telemetry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError(Arc<str>);

impl HandlerError {
    pub fn new(err: impl fmt::Display) -> Self {
        Self(Arc::from(err.to_string()))
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse the `Content-Length` header.
pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}
