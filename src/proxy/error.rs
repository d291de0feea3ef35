//! Proxy error taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::time::Duration;

use thiserror::Error;

/// Errors produced while building or running a forwarding hop.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The rule's target URL cannot back a proxy instance.
    #[error("invalid target URL {target}: {reason}")]
    InvalidTarget { target: String, reason: String },

    /// The forwarded request could not be assembled.
    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),

    /// The upstream could not be reached or failed mid-response.
    #[error("{target}: {source}")]
    Upstream {
        target: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    /// The upstream did not answer in time.
    #[error("{target}: no response within {after:?}")]
    UpstreamTimeout { target: String, after: Duration },

    /// No path-based rule matched at the shared endpoint.
    #[error("no proxy rule matches {path}")]
    NoMatchingRule { path: String },

    /// A dedicated listener has no rule bound to its port anymore.
    #[error("no proxy rule bound to port {port}")]
    NoPortRule { port: u16 },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidTarget { .. } | ProxyError::Request(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ProxyError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::NoMatchingRule { .. } | ProxyError::NoPortRule { .. } => {
                StatusCode::NOT_FOUND
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = match &self {
            ProxyError::InvalidTarget { .. } | ProxyError::Request(_) => {
                "Proxy configuration error".to_string()
            }
            ProxyError::Upstream { source, .. } => format!("Proxy error: {source}"),
            ProxyError::UpstreamTimeout { after, .. } => {
                format!("Proxy error: upstream did not respond within {after:?}")
            }
            ProxyError::NoMatchingRule { .. } => "No proxy rule matches this path".to_string(),
            ProxyError::NoPortRule { .. } => "No proxy rule bound to this port".to_string(),
        };
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let err = ProxyError::InvalidTarget {
            target: "::".into(),
            reason: "relative URL without a base".into(),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = ProxyError::NoMatchingRule { path: "/x".into() };
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
