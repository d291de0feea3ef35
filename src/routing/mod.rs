//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Administrative edit
//!     → rule.rs (normalize ProxyRule)
//!     → store.rs (atomic add/update/delete, copy-on-write)
//!
//! Incoming Request (path or listener port)
//!     → store.rs (snapshot)
//!     → matcher.rs (first prefix match / port lookup)
//!     → Return: matched ProxyRule or NoMatch
//! ```
//!
//! # Design Decisions
//! - Rules are mutable at runtime; every request works on one snapshot
//! - First match wins (insertion order, not specificity)
//! - Explicit NoMatch rather than silent default

pub mod matcher;
pub mod rule;
pub mod store;

pub use matcher::{first_path_match, rule_for_port};
pub use rule::{ProxyRule, RuleError, Settings};
pub use store::RuleStore;
