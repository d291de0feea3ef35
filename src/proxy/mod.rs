//! Reverse-proxy subsystem.
//!
//! # Data Flow
//! ```text
//! Matched ProxyRule
//!     → cache.rs (get or lazily create ProxyInstance, keyed by rule id)
//!     → instance.rs (strip prefix, join target path, rewrite URI)
//!     → headers.rs (hop-by-hop removal, X-Forwarded-*)
//!     → hyper-util client → upstream
//!     → error.rs (500 bad target / 502 upstream failure / 404 no rule)
//!
//! Rule mutation:
//!     RuleStore updated → ProxyRouter::refresh() → cache cleared
//!     → next request rebuilds lazily
//! ```
//!
//! # Design Decisions
//! - Coarse invalidation: any mutation clears the whole cache
//! - In-flight requests on an old instance complete normally
//! - One shared HTTP client; connection pooling is per upstream authority

pub mod cache;
pub mod error;
pub mod headers;
pub mod instance;
pub mod router;

use std::time::Duration;

use axum::body::Body;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

pub use cache::ProxyCache;
pub use error::ProxyError;
pub use instance::ProxyInstance;
pub use router::ProxyRouter;

/// Client used for every upstream hop.
pub type HttpClient = Client<HttpConnector, Body>;

/// Build the shared upstream client.
pub fn build_client(connect_timeout: Duration) -> HttpClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    Client::builder(TokioExecutor::new()).build(connector)
}
