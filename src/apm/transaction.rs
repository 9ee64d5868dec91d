//! Per-request APM transactions.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use axum::http::{Extensions, Method, Request};
use opentelemetry::trace::{Status, TraceContextExt, TraceId};
use opentelemetry::{Context, KeyValue};

/// Name under which the transaction is attached to a request.
///
/// The extension itself is keyed by the [`Transaction`] type; this constant
/// names it in logs and documentation.
pub const TRANSACTION_KEY: &str = "apm-transaction";

/// Status recorded when the handler never returned.
pub(crate) const INCOMPLETE: &str = "request did not complete";

/// Derive the transaction name from route pattern and method.
///
/// ```
/// use axum::http::Method;
/// use request_monitor::apm::transaction_name;
///
/// assert_eq!(transaction_name(&Method::GET, "/items/:id"), "/items/:id [GET]");
/// ```
pub fn transaction_name(method: &Method, route: &str) -> String {
    format!("{} [{}]", route, method)
}

/// Handle to the transaction of one in-flight request.
///
/// Downstream handlers retrieve it from the request extensions (for example
/// with `Extension<Transaction>`) to annotate the request. The interceptor
/// ends it when the handler returns; clones kept past that point only
/// produce no-op annotations.
#[derive(Clone)]
pub struct Transaction {
    cx: Context,
    name: Arc<str>,
}

impl Transaction {
    pub(crate) fn new(cx: Context, name: impl Into<Arc<str>>) -> Self {
        Self {
            cx,
            name: name.into(),
        }
    }

    /// Transaction name, `"<route> [<METHOD>]"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trace_id(&self) -> TraceId {
        self.cx.span().span_context().trace_id()
    }

    /// OpenTelemetry context carrying the transaction span, for child spans.
    pub fn context(&self) -> &Context {
        &self.cx
    }

    pub fn add_attribute(&self, attribute: KeyValue) {
        self.cx.span().set_attribute(attribute);
    }

    pub fn add_event(&self, name: impl Into<Cow<'static, str>>, attributes: Vec<KeyValue>) {
        self.cx.span().add_event(name, attributes);
    }

    /// Record an error against the transaction.
    pub fn notice_error(&self, err: &dyn fmt::Display) {
        let message = err.to_string();
        let span = self.cx.span();
        span.add_event(
            "exception",
            vec![KeyValue::new("exception.message", message.clone())],
        );
        span.set_status(Status::error(message));
    }

    pub(crate) fn end(&self) {
        self.cx.span().end();
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("name", &self.name)
            .field("trace_id", &self.trace_id())
            .finish()
    }
}

/// Typed lookup of the request's transaction.
pub trait TransactionExt {
    fn transaction(&self) -> Option<&Transaction>;
}

impl TransactionExt for Extensions {
    fn transaction(&self) -> Option<&Transaction> {
        self.get::<Transaction>()
    }
}

impl<B> TransactionExt for Request<B> {
    fn transaction(&self) -> Option<&Transaction> {
        self.extensions().get::<Transaction>()
    }
}
