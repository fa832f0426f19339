//! Startup configuration for both binaries.
//!
//! Every value resolves in the same order: command-line argument, then
//! environment variable, then built-in default. Resolution happens once in
//! `main` and the result is passed down; nothing here is global.

use std::time::Duration;

use crate::pipeline::{DEFAULT_MODEL_ID, DEFAULT_REVISION};

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

pub const ENV_BIND: &str = "NER_BIND";
pub const ENV_MODEL: &str = "NER_MODEL";
pub const ENV_REVISION: &str = "NER_MODEL_REVISION";
pub const ENV_API_URL: &str = "NER_API_URL";

const ANALYZE_TIMEOUT: Duration = Duration::from_secs(30);
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

fn resolve(arg: Option<&str>, env_key: &str, default: &str) -> String {
    if let Some(value) = arg {
        return value.to_string();
    }
    match std::env::var(env_key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

/// Inference service settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind: String,
    pub model_id: String,
    pub revision: String,
}

impl ServerConfig {
    pub fn resolve(bind: Option<&str>, model: Option<&str>, revision: Option<&str>) -> Self {
        Self {
            bind: resolve(bind, ENV_BIND, DEFAULT_BIND),
            model_id: resolve(model, ENV_MODEL, DEFAULT_MODEL_ID),
            revision: resolve(revision, ENV_REVISION, DEFAULT_REVISION),
        }
    }
}

/// Where the bridge finds the inference service and how long it waits.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Base address, reported verbatim by status checks.
    pub base_url: String,
    pub analyze_timeout: Duration,
    pub status_timeout: Duration,
}

impl BridgeConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            analyze_timeout: ANALYZE_TIMEOUT,
            status_timeout: STATUS_TIMEOUT,
        }
    }

    pub fn resolve(api_url: Option<&str>) -> Self {
        Self::new(resolve(api_url, ENV_API_URL, DEFAULT_API_URL))
    }

    pub fn ner_endpoint(&self) -> String {
        format!("{}/ner", self.base_url.trim_end_matches('/'))
    }

    pub fn docs_endpoint(&self) -> String {
        format!("{}/docs", self.base_url.trim_end_matches('/'))
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_wins() {
        let config = ServerConfig::resolve(Some("127.0.0.1:9000"), Some("org/model"), Some("v1"));
        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.model_id, "org/model");
        assert_eq!(config.revision, "v1");
    }

    #[test]
    fn test_bridge_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.analyze_timeout, Duration::from_secs(30));
        assert_eq!(config.status_timeout, Duration::from_secs(5));
        assert_eq!(config.ner_endpoint(), "http://localhost:8000/ner");
        assert_eq!(config.docs_endpoint(), "http://localhost:8000/docs");
    }

    #[test]
    fn test_trailing_slash_not_doubled() {
        let config = BridgeConfig::resolve(Some("http://ner.internal:8000/"));
        assert_eq!(config.base_url, "http://ner.internal:8000/");
        assert_eq!(config.ner_endpoint(), "http://ner.internal:8000/ner");
    }
}
