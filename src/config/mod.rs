//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated)
//!     → owned by main, passed explicitly to the HTTP server
//!
//! rules_file (JSON settings document)
//!     → loader.rs (load_settings)
//!     → appended to the configured rules at startup
//! ```
//!
//! # Design Decisions
//! - No global configuration; the composition root owns it
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_settings, parse_config, ConfigError};
pub use schema::{
    AdminConfig, FilesConfig, ListenerConfig, LiveReloadConfig, ObservabilityConfig,
    ServerConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
