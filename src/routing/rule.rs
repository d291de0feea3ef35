//! Proxy rule model and the settings document.
//!
//! # Responsibilities
//! - Define `ProxyRule` and its wire format
//! - Normalize rules coming from the administrative layer
//! - Define the `Settings` export/import document
//!
//! # Design Decisions
//! - `""` prefixes and `0` ports are read as absent, so documents written with
//!   zero-valued fields import unchanged
//! - Normalization is explicit; the store never rewrites what it is given

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A configured mapping from a dispatch key (path prefix or port) to a target.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProxyRule {
    /// Stable identifier, immutable across updates.
    #[serde(default)]
    pub id: String,

    /// Path prefix for dispatch on the shared endpoint (e.g. "/api").
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,

    /// Port for a dedicated listener.
    #[serde(default, deserialize_with = "zero_as_none", skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Target base URL (e.g. "http://localhost:3000").
    #[serde(default)]
    pub target_url: String,

    /// Remove the matched prefix from the forwarded path.
    #[serde(default)]
    pub strip_prefix: bool,
}

/// Errors raised while normalizing a rule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("Either path_prefix or port must be specified")]
    MissingDispatchKey,

    #[error("target_url is required")]
    MissingTarget,
}

impl ProxyRule {
    /// Create a path-based rule with an empty id.
    pub fn with_prefix(prefix: impl Into<String>, target_url: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            path_prefix: Some(prefix.into()),
            port: None,
            target_url: target_url.into(),
            strip_prefix: false,
        }
    }

    /// Create a port-based rule with an empty id.
    pub fn with_port(port: u16, target_url: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            path_prefix: None,
            port: Some(port),
            target_url: target_url.into(),
            strip_prefix: false,
        }
    }

    /// Builder-style id assignment.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Builder-style strip-prefix flag.
    pub fn strip_prefix(mut self, strip: bool) -> Self {
        self.strip_prefix = strip;
        self
    }

    /// Validate and normalize a rule received from the administrative layer.
    ///
    /// Assigns a fresh UUID when the id is empty and makes sure a prefix
    /// starts with `/`.
    pub fn normalize(mut self) -> Result<Self, RuleError> {
        if self.path_prefix.is_none() && self.port.is_none() {
            return Err(RuleError::MissingDispatchKey);
        }
        if self.target_url.trim().is_empty() {
            return Err(RuleError::MissingTarget);
        }

        if self.id.is_empty() {
            self.id = Uuid::new_v4().to_string();
        }

        if let Some(prefix) = self.path_prefix.as_mut() {
            if !prefix.starts_with('/') {
                prefix.insert(0, '/');
            }
        }

        Ok(self)
    }
}

/// The export/import document: rule list plus the two serving settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub proxy_rules: Vec<ProxyRule>,

    #[serde(default)]
    pub file_server_port: u16,

    #[serde(default)]
    pub file_server_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            proxy_rules: Vec::new(),
            file_server_port: 8080,
            file_server_dir: ".".to_string(),
        }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn zero_as_none<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<u16>::deserialize(deserializer)?;
    Ok(value.filter(|p| *p != 0))
}
