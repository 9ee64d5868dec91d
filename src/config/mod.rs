//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MonitorConfig (validated, immutable)
//!     → selector builds the backend from [monitoring]
//!     → host binds [listener]
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; the backend is never rebuilt
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - An unknown backend name is not a validation error: it disables
//!   monitoring instead

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{ListenerConfig, MonitorConfig, MonitoringConfig};
pub use validation::{validate_config, ValidationError};
