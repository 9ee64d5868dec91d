//! Host HTTP server with the interceptor installed.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, TraceLayer access logs)
//!     → router matches a route
//!     → Interceptor (route layer, sees the matched path)
//!     → handlers.rs
//!     → response back through the interceptor unchanged
//! ```

pub mod handlers;
pub mod server;

pub use handlers::ApiError;
pub use server::HttpServer;
