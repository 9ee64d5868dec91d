//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the demo handlers
//! - Install the backend's interceptor on every route
//! - Expose the scrape endpoint when the metrics backend is selected
//! - Bind server to listener and shut down gracefully

use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::MonitorConfig;
use crate::http::handlers;
use crate::interceptor::Monitoring;
use crate::selector::Backend;
use crate::stats::scrape;

/// HTTP server hosting the instrumented application.
pub struct HttpServer {
    router: Router,
    config: MonitorConfig,
    backend: Backend,
}

impl HttpServer {
    /// Create a new HTTP server around an already constructed backend.
    pub fn new(config: MonitorConfig, backend: Backend) -> Self {
        let router = Self::build_router(&backend);
        Self {
            router,
            config,
            backend,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The interceptor is a route layer so it observes the matched route
    /// pattern. Unmatched requests hit the fallback and are not observed.
    pub fn build_router(backend: &Backend) -> Router {
        let mut router = handlers::routes().route_layer(backend.interceptor());

        if let Some(handle) = backend.prometheus_handle() {
            router = router.merge(scrape::router(handle.clone()));
        }

        router.layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = self.backend.kind().map(|k| k.as_str()).unwrap_or("disabled"),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Get a clone of the router, for driving requests without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Wait for shutdown signal (Ctrl+C).
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("Shutdown signal received");
}
