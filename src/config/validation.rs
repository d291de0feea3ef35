//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals and timeouts > 0, addresses parse)
//! - Validate initial rules the same way the admin API does
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::proxy::ProxyInstance;

/// A single semantic problem in a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),

    #[error("live_reload.endpoint '{0}' must start with '/'")]
    Endpoint(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("rule {index}: {reason}")]
    Rule { index: usize, reason: String },
}

/// Check a parsed configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let live = &config.live_reload;
    if !live.endpoint.starts_with('/') {
        errors.push(ValidationError::Endpoint(live.endpoint.clone()));
    }
    if live.debounce_ms == 0 {
        errors.push(ValidationError::Zero("live_reload.debounce_ms"));
    }
    if live.heartbeat_secs == 0 {
        errors.push(ValidationError::Zero("live_reload.heartbeat_secs"));
    }
    if live.subscriber_capacity == 0 {
        errors.push(ValidationError::Zero("live_reload.subscriber_capacity"));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    for (index, rule) in config.rules.iter().enumerate() {
        let normalized = match rule.clone().normalize() {
            Ok(rule) => rule,
            Err(e) => {
                errors.push(ValidationError::Rule {
                    index,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if let Err(e) = ProxyInstance::new(normalized) {
            errors.push(ValidationError::Rule {
                index,
                reason: e.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::ProxyRule;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.live_reload.debounce_ms = 0;
        config.live_reload.subscriber_capacity = 0;
        config.live_reload.endpoint = "events".into();
        config.rules.push(ProxyRule::with_prefix("/api", "ftp://files"));
        config.rules.push(ProxyRule::with_prefix("/ok", "http://localhost:3000"));
        config.rules.push(ProxyRule {
            path_prefix: None,
            ..ProxyRule::with_prefix("/x", "http://y")
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 6);
        assert!(errors.contains(&ValidationError::BindAddress("nowhere".into())));
        assert!(errors.contains(&ValidationError::Zero("live_reload.debounce_ms")));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::Rule { index: 0, .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::Rule { index: 2, .. })));
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let mut config = ServerConfig::default();
        config.timeouts.connect_secs = 0;
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::Zero("timeouts.connect_secs"),
                ValidationError::Zero("timeouts.request_secs"),
            ]
        );
        assert_eq!(
            errors[1].to_string(),
            "timeouts.request_secs must be greater than zero"
        );
    }
}
