//! Header manipulation for forwarded requests and responses.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Add X-Forwarded-For, X-Forwarded-Proto, X-Forwarded-Host
//! - Point the Host header at the upstream authority
//!
//! # Design Decisions
//! - Headers listed in `Connection` are treated as hop-by-hop too
//! - X-Forwarded-For is appended to, never replaced

use std::net::IpAddr;

use axum::http::{
    header::{self, HeaderName},
    HeaderMap, HeaderValue,
};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
];

/// Remove hop-by-hop headers, including those named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove(header::UPGRADE);
}

/// Rewrite an inbound header map for the upstream hop.
pub fn prepare_forwarded(headers: &mut HeaderMap, upstream_authority: &str, peer: Option<IpAddr>) {
    let inbound_host = headers.get(header::HOST).cloned();

    strip_hop_by_hop(headers);

    if let Ok(host) = HeaderValue::from_str(upstream_authority) {
        headers.insert(header::HOST, host);
    }

    if let Some(host) = inbound_host {
        headers.insert(X_FORWARDED_HOST, host);
    }
    headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));

    if let Some(ip) = peer {
        let forwarded_for = match headers
            .get(&X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
        {
            Some(prior) if !prior.is_empty() => format!("{prior}, {ip}"),
            _ => ip.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_connection_named_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-secret"));
        headers.insert("x-secret", HeaderValue::from_static("1"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-kept", HeaderValue::from_static("yes"));

        strip_hop_by_hop(&mut headers);

        assert!(headers.get("x-secret").is_none());
        assert!(headers.get("keep-alive").is_none());
        assert!(headers.get(header::CONNECTION).is_none());
        assert_eq!(headers.get("x-kept").unwrap(), "yes");
    }

    #[test]
    fn sets_forwarding_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("localhost:8080"));
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("10.0.0.1"));

        prepare_forwarded(&mut headers, "backend:3000", Some("127.0.0.1".parse().unwrap()));

        assert_eq!(headers.get(header::HOST).unwrap(), "backend:3000");
        assert_eq!(headers.get(X_FORWARDED_HOST).unwrap(), "localhost:8080");
        assert_eq!(headers.get(X_FORWARDED_PROTO).unwrap(), "http");
        assert_eq!(headers.get(X_FORWARDED_FOR).unwrap(), "10.0.0.1, 127.0.0.1");
    }
}
