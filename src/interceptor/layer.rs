//! Tower layer wrapping the downstream service.

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use http_body::Body as HttpBody;
use tower::{Layer, Service};

use super::{Instrument, Outcome};

/// Layer produced by [`Monitoring::interceptor`](super::Monitoring::interceptor).
#[derive(Clone, Default)]
pub struct Interceptor {
    instrument: Option<Arc<dyn Instrument>>,
}

impl Interceptor {
    /// Interceptor reporting to the given backend instrument.
    pub fn new(instrument: Arc<dyn Instrument>) -> Self {
        Self {
            instrument: Some(instrument),
        }
    }

    /// Interceptor that calls the downstream service directly.
    pub fn passthrough() -> Self {
        Self { instrument: None }
    }

    /// Returns true if requests are reported to a backend.
    pub fn is_enabled(&self) -> bool {
        self.instrument.is_some()
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("backend", &self.instrument.as_ref().map(|i| i.name()))
            .finish()
    }
}

impl<S> Layer<S> for Interceptor {
    type Service = Intercepted<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Intercepted {
            inner,
            instrument: self.instrument.clone(),
        }
    }
}

/// Service produced by [`Interceptor`].
#[derive(Clone)]
pub struct Intercepted<S> {
    inner: S,
    instrument: Option<Arc<dyn Instrument>>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for Intercepted<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    ResBody: HttpBody + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let Some(instrument) = self.instrument.as_ref() else {
            return Box::pin(self.inner.call(request));
        };

        let (mut parts, body) = request.into_parts();
        let observation = instrument.begin(&mut parts);
        let future = self.inner.call(Request::from_parts(parts, body));

        Box::pin(async move {
            let result = future.await;
            match &result {
                Ok(response) => observation.finish(Outcome::from_response(response)),
                Err(err) => observation.finish(Outcome::Error(err)),
            }
            result
        })
    }
}
