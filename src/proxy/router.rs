//! Request-to-rule dispatch and forwarding.
//!
//! # Responsibilities
//! - Resolve the rule for a path (shared endpoint) or a port (dedicated listener)
//! - Obtain the cached proxy instance for it
//! - Forward, and map failures to gateway responses
//!
//! # Design Decisions
//! - Each request works on one rule snapshot
//! - Every hop is bounded by the upstream timeout; a miss is a gateway failure
//! - `refresh()` must be called after every rule mutation; it completes
//!   before the mutation is acknowledged to the caller

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};

use crate::http::RequestIdExt;
use crate::observability::metrics;
use crate::proxy::cache::ProxyCache;
use crate::proxy::error::ProxyError;
use crate::proxy::{build_client, HttpClient};
use crate::routing::{first_path_match, rule_for_port, ProxyRule, RuleStore};

/// Dispatches requests to the proxy instance of the matching rule.
pub struct ProxyRouter {
    store: Arc<RuleStore>,
    cache: ProxyCache,
    client: HttpClient,
    upstream_timeout: Duration,
}

impl ProxyRouter {
    /// Create a router over a shared rule store.
    ///
    /// `upstream_timeout` bounds each hop until the upstream's response headers arrive.
    pub fn new(store: Arc<RuleStore>, connect_timeout: Duration, upstream_timeout: Duration) -> Self {
        Self {
            store,
            cache: ProxyCache::new(),
            client: build_client(connect_timeout),
            upstream_timeout,
        }
    }

    /// The rule store this router reads from.
    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    /// First path-based rule (in list order) matching `path`.
    pub fn match_path(&self, path: &str) -> Option<ProxyRule> {
        let snapshot = self.store.snapshot();
        first_path_match(&snapshot.proxy_rules, path).cloned()
    }

    /// Handle a request on the shared endpoint; 404 when no rule matches.
    pub async fn handle(&self, request: Request<Body>, peer: Option<IpAddr>) -> Response {
        match self.match_path(request.uri().path()) {
            Some(rule) => self.forward(&rule, request, peer, rule.strip_prefix).await,
            None => {
                let path = request.uri().path().to_string();
                tracing::debug!(path = %path, "No proxy rule matched");
                ProxyError::NoMatchingRule { path }.into_response()
            }
        }
    }

    /// Handle a request arriving on the dedicated listener for `port`.
    pub async fn handle_port(
        &self,
        port: u16,
        request: Request<Body>,
        peer: Option<IpAddr>,
    ) -> Response {
        let snapshot = self.store.snapshot();
        match rule_for_port(&snapshot.proxy_rules, port) {
            Some(rule) => {
                let rule = rule.clone();
                self.forward(&rule, request, peer, false).await
            }
            None => {
                tracing::warn!(port, "Request on port without a bound rule");
                ProxyError::NoPortRule { port }.into_response()
            }
        }
    }

    /// Forward a request using the proxy instance for `rule`.
    pub async fn forward(
        &self,
        rule: &ProxyRule,
        request: Request<Body>,
        peer: Option<IpAddr>,
        strip: bool,
    ) -> Response {
        let start = Instant::now();
        let request_id = request.request_id().to_string();
        let path = request.uri().path().to_string();

        let instance = match self.cache.get_or_create(rule) {
            Ok(instance) => instance,
            Err(e) => {
                metrics::record_request(&rule.id, e.status().as_u16(), start);
                return e.into_response();
            }
        };

        let hop = instance.forward(&self.client, request, peer, strip);
        let outcome = match tokio::time::timeout(self.upstream_timeout, hop).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProxyError::UpstreamTimeout {
                target: rule.target_url.clone(),
                after: self.upstream_timeout,
            }),
        };

        match outcome {
            Ok(response) => {
                metrics::record_request(&rule.id, response.status().as_u16(), start);
                response
            }
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    rule_id = %rule.id,
                    target = %rule.target_url,
                    path = %path,
                    error = %e,
                    "Upstream error"
                );
                metrics::record_request(&rule.id, e.status().as_u16(), start);
                e.into_response()
            }
        }
    }

    /// Invalidate every cached proxy instance.
    pub fn refresh(&self) {
        self.cache.refresh();
    }

    /// Number of currently cached instances.
    pub fn cached_instances(&self) -> usize {
        self.cache.len()
    }
}
