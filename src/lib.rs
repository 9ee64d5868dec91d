//! Pluggable request observability for axum/tower servers.
//!
//! A backend is selected once at startup and installed as a tower layer;
//! every request is then reported to it without touching handler code.
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use request_monitor::{selector, BackendKind, Monitoring};
//!
//! let backend = selector::create(Some(BackendKind::Metrics), "orders", "");
//! let app: Router = Router::new()
//!     .route("/items/{id}", get(|| async { "item" }))
//!     .route_layer(backend.interceptor());
//! ```

pub mod apm;
pub mod config;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod selector;
pub mod stats;

pub use apm::{Transaction, TransactionExt, TracingBackend, TRANSACTION_KEY};
pub use config::MonitorConfig;
pub use error::Error;
pub use interceptor::{HandlerError, Interceptor, Monitoring};
pub use selector::{Backend, BackendKind};
pub use stats::MetricsBackend;
