//! Live-reload subsystem.
//!
//! # Data Flow
//! ```text
//! OS notification facility
//!     → watcher.rs (recursive watch set, reactive extension)
//!     → debounce.rs (classify, coalesce bursts, 500ms quiet window)
//!     → hub.rs (broadcast: non-blocking enqueue per subscriber)
//!     → sse.rs (one stream per browser, heartbeat comments)
//! ```
//!
//! # Design Decisions
//! - Delivery is at-most-once per subscriber; slow consumers miss messages
//! - Watcher failure disables live reload only; serving continues
//! - Task lifetimes are tied to the shutdown signal, not process exit

pub mod debounce;
pub mod hub;
pub mod sse;
pub mod watcher;

pub use debounce::{ChangeKind, Debouncer};
pub use hub::{BroadcastReport, ChangeHub, Subscriber};
pub use sse::{event_stream, events_handler, LiveReloadState, CONNECTED_MESSAGE};
pub use watcher::{FileWatcher, WatchError};
