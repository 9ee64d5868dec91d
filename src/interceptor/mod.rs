//! Backend-agnostic interception contract.
//!
//! # Data Flow
//! ```text
//! Host router
//!     → Interceptor (tower Layer, installed once at startup)
//!     → Intercepted<S>::call
//!         → Instrument::begin   (backend opens its per-request record)
//!         → downstream service  (result kept as-is)
//!         → Observation::finish (backend closes the record from the Outcome)
//!     → result returned to the host unchanged
//! ```
//!
//! # Design Decisions
//! - The contract is a single operation: `Monitoring::interceptor`
//! - Backends only describe what happens before and after a request;
//!   the chain wrapping lives here once
//! - "No backend" is an interceptor without an instrument, not a null check
//! - An observation dropped before `finish` (panic, cancelled future) still
//!   closes its record through `Drop`
//!
//! # Concurrency
//! One backend instance serves every in-flight request. Instruments hold no
//! per-request state and must be `Send + Sync`; any client handle they wrap
//! is required to be safe for concurrent use.

pub mod layer;
pub mod outcome;

use axum::extract::MatchedPath;
use axum::http::request::Parts;

pub use layer::{Intercepted, Interceptor};
pub use outcome::{HandlerError, Outcome};

/// Capability every monitoring backend provides.
pub trait Monitoring: Send + Sync {
    /// Produce the layer to install into the host's handler chain.
    fn interceptor(&self) -> Interceptor;
}

/// Per-request protocol implemented by each backend adapter.
pub trait Instrument: Send + Sync + 'static {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Open the per-request record before the downstream handler runs.
    ///
    /// The request parts are mutable so a backend can attach request-scoped
    /// handles to the extensions.
    fn begin(&self, parts: &mut Parts) -> Box<dyn Observation>;
}

/// An in-flight per-request record.
pub trait Observation: Send {
    /// Close the record with the downstream outcome.
    fn finish(self: Box<Self>, outcome: Outcome<'_>);
}

/// Route pattern of a request.
///
/// Uses axum's matched route when the interceptor sits behind the router
/// (`Router::route_layer`), the literal path otherwise.
pub fn route_of(parts: &Parts) -> String {
    parts
        .extensions
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| parts.uri.path().to_owned())
}
