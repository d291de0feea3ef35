//! HTTP surface of the shared endpoint.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → explicit routes: event stream, /__watcher.js, /admin/api/*
//!     → fallback dispatch:
//!         path rule matches → proxy::ProxyRouter::forward
//!         otherwise         → files.rs (static files under the root)
//!     → Send to client
//! ```
//!
//! # Design Decisions
//! - Proxy rules win over static files for any path they claim
//! - Explicit routes win over proxy rules
//! - `AppState` is cheap to clone; every field is shared

pub mod files;
pub mod request;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
