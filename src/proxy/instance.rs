//! A reusable forwarding handler bound to one rule's target.
//!
//! # Responsibilities
//! - Parse and validate the rule's target URL once, at construction
//! - Rewrite the request URI (strip prefix, join target base path, merge query)
//! - Forward the request and hand back the upstream response
//!
//! # Design Decisions
//! - Only absolute `http` targets are accepted; construction fails otherwise
//! - Bodies stream through in both directions, nothing is buffered
//! - The rule the instance was built from is kept so callers can detect staleness

use std::net::IpAddr;
use std::str::FromStr;

use axum::{
    body::Body,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, Response, Uri, Version,
    },
};

use crate::proxy::error::ProxyError;
use crate::proxy::headers::{prepare_forwarded, strip_hop_by_hop};
use crate::proxy::HttpClient;
use crate::routing::ProxyRule;

/// A constructed forwarding handler for a single rule.
#[derive(Debug)]
pub struct ProxyInstance {
    rule: ProxyRule,
    authority: Authority,
    base_path: String,
    base_query: Option<String>,
}

impl ProxyInstance {
    /// Build an instance by parsing the rule's target URL.
    pub fn new(rule: ProxyRule) -> Result<Self, ProxyError> {
        let invalid = |reason: String| ProxyError::InvalidTarget {
            target: rule.target_url.clone(),
            reason,
        };

        let url = url::Url::parse(rule.target_url.trim()).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "http" {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        let host = url
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let authority = Authority::from_str(&authority).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            base_path: url.path().to_string(),
            base_query: url.query().map(str::to_string),
            authority,
            rule,
        })
    }

    /// The rule this instance was built from.
    pub fn rule(&self) -> &ProxyRule {
        &self.rule
    }

    /// Upstream authority (`host[:port]`).
    pub fn authority(&self) -> &str {
        self.authority.as_str()
    }

    /// Remove the rule's prefix from `path` when stripping applies.
    pub fn rewrite_path(&self, path: &str, strip: bool) -> String {
        let prefix = self.rule.path_prefix.as_deref().filter(|p| !p.is_empty());
        match prefix {
            Some(prefix) if strip => match path.strip_prefix(prefix) {
                Some("") => "/".to_string(),
                Some(rest) => rest.to_string(),
                None => path.to_string(),
            },
            _ => path.to_string(),
        }
    }

    /// Full upstream URI for an inbound (already rewritten) path and query.
    pub fn upstream_uri(&self, path: &str, query: Option<&str>) -> Result<Uri, ProxyError> {
        let joined = join_paths(&self.base_path, path);
        let query = match (self.base_query.as_deref(), query) {
            (Some(base), Some(req)) if !base.is_empty() && !req.is_empty() => {
                Some(format!("{base}&{req}"))
            }
            (Some(base), _) if !base.is_empty() => Some(base.to_string()),
            (_, Some(req)) if !req.is_empty() => Some(req.to_string()),
            _ => None,
        };
        let path_and_query = match query {
            Some(q) => format!("{joined}?{q}"),
            None => joined,
        };

        let uri = Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(PathAndQuery::from_str(&path_and_query).map_err(axum::http::Error::from)?)
            .build()?;
        Ok(uri)
    }

    /// Forward a request to the target and return the upstream response.
    pub async fn forward(
        &self,
        client: &HttpClient,
        request: Request<Body>,
        peer: Option<IpAddr>,
        strip: bool,
    ) -> Result<Response<Body>, ProxyError> {
        let (mut parts, body) = request.into_parts();

        let original_path = parts.uri.path().to_string();
        let path = self.rewrite_path(&original_path, strip);
        parts.uri = self.upstream_uri(&path, parts.uri.query())?;
        parts.version = Version::HTTP_11;
        prepare_forwarded(&mut parts.headers, self.authority(), peer);

        tracing::debug!(
            rule_id = %self.rule.id,
            from = %original_path,
            to = %parts.uri,
            "Proxying request"
        );

        let upstream = Request::from_parts(parts, body);
        let response = client
            .request(upstream)
            .await
            .map_err(|source| ProxyError::Upstream {
                target: self.rule.target_url.clone(),
                source,
            })?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Join two path segments with exactly one slash between them.
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}
