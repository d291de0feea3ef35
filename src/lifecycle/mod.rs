//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every subscriber wakes
//!         → HTTP server stops accepting, drains connections
//!         → change hub closes (event streams end)
//!         → port listeners stop
//!         → file watcher exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the signal out to every long-running task
//! - Subscribers created after trigger() never see it; subscribe before spawning

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
