//! Proxy instance cache.
//!
//! # Responsibilities
//! - Map rule id -> constructed `ProxyInstance`
//! - Create instances lazily on first use
//! - Drop everything on `refresh()`
//!
//! # Design Decisions
//! - URL parsing happens outside any shard lock; the insert is a short entry update
//! - Construction failures are never cached, the next request retries
//! - A hit is only served if it was built from a rule equal to the caller's;
//!   an in-flight request holding a pre-mutation snapshot can therefore never
//!   pin a stale instance for later requests

use std::sync::Arc;

use dashmap::DashMap;

use crate::observability::metrics;
use crate::proxy::error::ProxyError;
use crate::proxy::instance::ProxyInstance;
use crate::routing::ProxyRule;

/// Thread-safe cache of proxy instances keyed by rule id.
#[derive(Debug, Default)]
pub struct ProxyCache {
    entries: DashMap<String, Arc<ProxyInstance>>,
}

impl ProxyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached instance for `rule`, constructing it on a miss.
    pub fn get_or_create(&self, rule: &ProxyRule) -> Result<Arc<ProxyInstance>, ProxyError> {
        if let Some(existing) = self.lookup(rule) {
            return Ok(existing);
        }

        let built = match ProxyInstance::new(rule.clone()) {
            Ok(instance) => Arc::new(instance),
            Err(e) => {
                tracing::error!(rule_id = %rule.id, target = %rule.target_url, error = %e, "Failed to construct proxy");
                return Err(e);
            }
        };

        let mut inserted = false;
        let instance = self
            .entries
            .entry(rule.id.clone())
            .and_modify(|current| {
                if current.rule() != rule {
                    *current = built.clone();
                    inserted = true;
                }
            })
            .or_insert_with(|| {
                inserted = true;
                built.clone()
            })
            .clone();

        if inserted {
            tracing::info!(
                rule_id = %rule.id,
                prefix = rule.path_prefix.as_deref().unwrap_or(""),
                port = rule.port.unwrap_or(0),
                target = %rule.target_url,
                "Created proxy"
            );
            metrics::record_cache_size(self.entries.len());
        }

        Ok(instance)
    }

    /// Drop every cached instance. In-flight requests keep their `Arc`.
    pub fn refresh(&self) {
        tracing::info!(cached = self.entries.len(), "Refreshing all proxies");
        self.entries.clear();
        metrics::record_cache_size(0);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, rule: &ProxyRule) -> Option<Arc<ProxyInstance>> {
        let entry = self.entries.get(&rule.id)?;
        if entry.rule() == rule {
            Some(entry.value().clone())
        } else {
            None
        }
    }
}
