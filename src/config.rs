//! # Config Module
//!
//! YAML application configuration. Every field has a default, so an empty file (or no
//! file) yields a working server on `0.0.0.0:8080`.
//!
//! ```yaml
//! http:
//!   addr: "127.0.0.1:8080"
//!   health_endpoint: true
//!   metrics_endpoint: true
//!   ready_timeout_ms: 1000
//! dispatch:
//!   method_override_param: "_method"
//!   max_depth: 32
//!   request_timeout_ms: 5000
//! logging:
//!   level: info
//!   format: json
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub dispatch: DispatchConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load and parse a YAML file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not valid configuration.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parse YAML text. An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Fails on malformed YAML or unknown keys.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text).context("failed to parse YAML config")?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Listen address
    pub addr: String,
    /// Serve `GET /health` outside the resource tree
    pub health_endpoint: bool,
    /// Serve `GET /metrics` outside the resource tree
    pub metrics_endpoint: bool,
    /// How long `serve` waits for the listener before giving up
    pub ready_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
            health_endpoint: true,
            metrics_endpoint: true,
            ready_timeout_ms: 1000,
        }
    }
}

impl HttpConfig {
    #[must_use]
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

/// Resolution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Query parameter that overrides the verb of a POST. Empty disables overriding.
    pub method_override_param: String,
    /// Maximum number of child/lookup hops per request
    pub max_depth: usize,
    /// Deadline for resolving a request, in milliseconds
    pub request_timeout_ms: Option<u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            method_override_param: "_method".to_string(),
            max_depth: 32,
            request_timeout_ms: None,
        }
    }
}

impl DispatchConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

/// Overrides for the `RESTTREE_LOG_*` environment settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.http.addr, "0.0.0.0:8080");
        assert_eq!(config.dispatch.method_override_param, "_method");
        assert_eq!(config.dispatch.max_depth, 32);
        assert_eq!(config.dispatch.request_timeout(), None);
        assert_eq!(config.http.ready_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = AppConfig::from_yaml_str("dispatch:\n  request_timeout_ms: 250\n").unwrap();
        assert_eq!(
            config.dispatch.request_timeout(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(config.dispatch.max_depth, 32);
        assert!(config.http.health_endpoint);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(AppConfig::from_yaml_str("dispatch:\n  max_dept: 3\n").is_err());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(AppConfig::from_yaml_str("  \n").unwrap(), AppConfig::default());
    }
}
