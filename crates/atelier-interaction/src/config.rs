//! Configuration file management for Atelier.
//!
//! Supports reading the model credential and endpoint from
//! `~/.config/atelier/secret.json`, with an `ATELIER_API_KEY` environment
//! override. A missing credential is not an error: the application
//! degrades to the mock model client.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use atelier_core::{AtelierError, Result};
use serde::Deserialize;

const DEFAULT_ENDPOINT: &str = "https://api.atelier.studio/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Studio endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StudioConfig {
    /// Model credential. `None` selects the mock client.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Endpoint base URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Request timeout in seconds, applied to both transport paths.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StudioConfig {
    /// Loads the configuration file, applying the environment override.
    ///
    /// A missing file yields the default (mock-mode) configuration; an
    /// unreadable or unparsable file is a configuration error.
    pub fn load() -> Result<Self> {
        let mut config = match config_path() {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(&path).map_err(|e| {
                    AtelierError::config(format!(
                        "failed to read configuration file at {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                serde_json::from_str(&content).map_err(|e| {
                    AtelierError::config(format!(
                        "failed to parse configuration file at {}: {}",
                        path.display(),
                        e
                    ))
                })?
            }
            _ => Self::default(),
        };

        if let Ok(key) = std::env::var("ATELIER_API_KEY") {
            if !key.is_empty() {
                config.api_key = Some(key);
            }
        }

        Ok(config)
    }

    /// Returns the request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Returns the path to the configuration file: ~/.config/atelier/secret.json
fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("atelier").join("secret.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StudioConfig::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_parse_with_partial_fields() {
        let config: StudioConfig =
            serde_json::from_str(r#"{"api_key": "sk-test"}"#).expect("valid config");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }
}
