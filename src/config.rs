//! Runtime configuration
//!
//! Analyzer and replay knobs, loadable from a YAML file. Everything has
//! a sensible default; the file only needs the overrides.

use crate::error::Result;
use crate::http::{RateLimiterConfig, ReplayClientConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoutConfig {
    /// Step-loop settings
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    /// Replay HTTP settings
    #[serde(default)]
    pub http: HttpConfig,
    /// LLM provider selection (consumed by the embedding application)
    #[serde(default)]
    pub llm: LlmConfig,
}

impl ScoutConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// Step-loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Maximum analysis steps per job
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Page-load timeout in seconds
    #[serde(default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            page_timeout_secs: default_page_timeout_secs(),
        }
    }
}

impl AnalyzerConfig {
    /// Page-load timeout as a duration
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }
}

/// Replay HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
    /// Transport-level retry budget
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Replay pace in requests per second
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout_secs(),
            max_retries: default_max_retries(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

impl HttpConfig {
    /// Build the replay client configuration
    pub fn to_client_config(&self) -> ReplayClientConfig {
        ReplayClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            rate_limit: Some(RateLimiterConfig::new(
                self.requests_per_second,
                self.requests_per_second,
            )),
            ..Default::default()
        }
    }
}

/// LLM provider selection. The crate only defines the client trait; the
/// embedding application maps this onto a concrete provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name, e.g. `anthropic` or `openai`
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model identifier
    #[serde(default)]
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: String::new(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_max_steps() -> usize {
    20
}

fn default_page_timeout_secs() -> u64 {
    30
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_requests_per_second() -> u32 {
    5
}

fn default_provider() -> String {
    "anthropic".to_string()
}

fn default_api_key_env() -> String {
    "LLM_API_KEY".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScoutConfig::default();
        assert_eq!(config.analyzer.max_steps, 20);
        assert_eq!(config.http.max_retries, 3);
        assert_eq!(config.llm.provider, "anthropic");
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = "analyzer:\n  max_steps: 5\nhttp:\n  requests_per_second: 1\n";
        let config = ScoutConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.analyzer.max_steps, 5);
        assert_eq!(config.http.requests_per_second, 1);
        // Untouched fields keep their defaults.
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn test_client_config_mapping() {
        let config = HttpConfig {
            timeout_secs: 5,
            max_retries: 1,
            requests_per_second: 2,
        };
        let client_config = config.to_client_config();
        assert_eq!(client_config.timeout, Duration::from_secs(5));
        assert_eq!(client_config.max_retries, 1);
    }
}
