//! Network listeners beyond the shared endpoint.
//!
//! # Data Flow
//! ```text
//! rule mutation
//!     → AppState::rules_changed()
//!     → PortListeners::reconcile() (reads rules under its lock)
//!         port claimed, not running  → bind + spawn axum::serve
//!         running, no longer claimed → graceful stop
//! request on port P
//!     → ProxyRouter::handle_port(P) (no prefix stripping)
//! ```

pub mod ports;

pub use ports::PortListeners;
