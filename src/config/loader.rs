//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::routing::Settings;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Settings document error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    parse_config(&read(path)?)
}

/// Load an exported settings document (JSON).
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let content = read(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.live_reload.debounce_ms, 500);
        assert_eq!(config.live_reload.heartbeat_secs, 15);
        assert_eq!(config.live_reload.subscriber_capacity, 10);
        assert!(config.rules.is_empty());
    }

    #[test]
    fn parses_rules_and_sections() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:0"

            [live_reload]
            debounce_ms = 250

            [[rules]]
            id = "api"
            path_prefix = "/api"
            target_url = "http://localhost:3000"
            strip_prefix = true

            [[rules]]
            port = 9000
            target_url = "http://localhost:4000"
            "#,
        )
        .unwrap();

        assert_eq!(config.live_reload.debounce_ms, 250);
        assert_eq!(config.rules.len(), 2);
        assert!(config.rules[0].strip_prefix);
        assert_eq!(config.rules[1].port, Some(9000));
    }

    #[test]
    fn invalid_config_reports_validation() {
        let err = parse_config("[live_reload]\nheartbeat_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref v) if v.len() == 1));
        assert!(err.to_string().contains("heartbeat_secs"));
    }

    #[test]
    fn loads_settings_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"proxy_rules":[{{"id":"a","path_prefix":"/a","port":0,"target_url":"http://x","strip_prefix":false}}],"file_server_port":8080,"file_server_dir":"."}}"#
        )
        .unwrap();

        let settings = load_settings(file.path()).unwrap();
        assert_eq!(settings.proxy_rules[0].port, None);

        let missing = load_settings(Path::new("/no/such/settings.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
