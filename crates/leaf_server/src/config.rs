//! Server configuration from TOML/JSON or environment

use std::net::SocketAddr;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ServerError;

/// Default host address
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port number
pub const DEFAULT_PORT: u16 = 8000;

/// Default upload size limit (10 MiB)
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Default bound on one classification, in milliseconds
pub const DEFAULT_INFERENCE_TIMEOUT_MS: u64 = 10_000;

/// Default CORS origins (localhost for development)
pub const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:8000", "http://127.0.0.1:8000"];

/// Environment variable overriding `log_level`
pub const LOG_LEVEL_ENV: &str = "LEAFSCAN_LOG_LEVEL";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Allowed CORS origins; `"*"` allows any origin
    pub cors_origins: Vec<String>,

    /// Largest accepted request body, in bytes
    pub body_limit_bytes: usize,

    /// Bound on one classification, in milliseconds
    pub inference_timeout_ms: u64,

    /// Log level for tracing
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
            inference_timeout_ms: DEFAULT_INFERENCE_TIMEOUT_MS,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Apply environment overrides on top of `self`
    ///
    /// Environment variables:
    /// - `LEAFSCAN_HOST` - Server host
    /// - `LEAFSCAN_PORT` - Server port
    /// - `LEAFSCAN_LOG_LEVEL` - Log level (trace, debug, info, warn, error)
    /// - `LEAFSCAN_INFERENCE_TIMEOUT_MS` - Classification time limit
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Defaults plus environment overrides
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Apply overrides from any key lookup; unparsable values are ignored
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("LEAFSCAN_HOST") {
            self.host = host;
        }

        if let Some(port) = lookup("LEAFSCAN_PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid LEAFSCAN_PORT"),
            }
        }

        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            self.log_level = level;
        }

        if let Some(timeout) = lookup("LEAFSCAN_INFERENCE_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(ms) => self.inference_timeout_ms = ms,
                Err(_) => warn!(value = %timeout, "Ignoring invalid LEAFSCAN_INFERENCE_TIMEOUT_MS"),
            }
        }

        self
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ServerError::Config(format!("Invalid address {}:{}: {}", self.host, self.port, e)))
    }

    #[must_use]
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        if self.host.is_empty() {
            return Err(ServerError::Config("Host cannot be empty".to_string()));
        }

        if self.body_limit_bytes == 0 {
            return Err(ServerError::Config("Body limit must be greater than zero".to_string()));
        }

        if self.inference_timeout_ms == 0 {
            return Err(ServerError::Config("Inference timeout must be greater than zero".to_string()));
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ServerError::Config(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.body_limit_bytes, 10 * 1024 * 1024);
        assert_eq!(config.inference_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::default().with_overrides(lookup(&[
            ("LEAFSCAN_HOST", "0.0.0.0"),
            ("LEAFSCAN_PORT", "9090"),
            ("LEAFSCAN_LOG_LEVEL", "debug"),
            ("LEAFSCAN_INFERENCE_TIMEOUT_MS", "2500"),
        ]));

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9090);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.inference_timeout_ms, 2500);
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let config = ServerConfig::default().with_overrides(lookup(&[
            ("LEAFSCAN_PORT", "eighty"),
            ("LEAFSCAN_INFERENCE_TIMEOUT_MS", "-1"),
        ]));
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.inference_timeout_ms, DEFAULT_INFERENCE_TIMEOUT_MS);
    }

    #[test]
    fn test_socket_addr() {
        let addr = ServerConfig::default().socket_addr().unwrap();
        assert_eq!(addr.ip(), std::net::Ipv4Addr::new(127, 0, 0, 1));
        assert_eq!(addr.port(), DEFAULT_PORT);

        let bad = ServerConfig { host: "not a host".into(), ..Default::default() };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_validate() {
        assert!(ServerConfig { log_level: "verbose".into(), ..Default::default() }.validate().is_err());
        assert!(ServerConfig { body_limit_bytes: 0, ..Default::default() }.validate().is_err());
        assert!(ServerConfig { inference_timeout_ms: 0, ..Default::default() }.validate().is_err());
        assert!(ServerConfig { host: String::new(), ..Default::default() }.validate().is_err());
    }

    #[test]
    fn test_partial_config_takes_defaults() {
        let config: ServerConfig = serde_json::from_str(r#"{"port": 3000}"#).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, DEFAULT_HOST);
    }
}
