//! Configuration management for GitHub client

use std::time::Duration;

use compact_str::CompactString;

use super::error::{ClientError, Result};
use crate::config::AppConfig;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Main configuration for GitHub client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// GitHub API base URL
    pub base_url: CompactString,
    /// User agent sent with every request
    pub user_agent: CompactString,
    /// Request configuration
    pub request: RequestConfig,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Request timeout
    pub timeout: Duration,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30) }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<CompactString>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: concat!("awesome-stars-host/", env!("CARGO_PKG_VERSION")).into(),
            request: RequestConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ClientError::config_validation(
                "github_url",
                "Base URL cannot be empty",
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::config_validation(
                "github_url",
                "Base URL must start with http:// or https://",
            ));
        }

        if url::Url::parse(&self.base_url).is_err() {
            return Err(ClientError::config_validation(
                "github_url",
                "Base URL is not a valid URL format",
            ));
        }

        if self.user_agent.is_empty() {
            return Err(ClientError::config_validation(
                "user_agent",
                "GitHub requires a User-Agent header",
            ));
        }

        if self.request.timeout.is_zero() {
            return Err(ClientError::config_validation(
                "timeout",
                "Timeout must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Base URL without a trailing slash, ready for path concatenation
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = timeout;
        self
    }
}

impl From<&AppConfig> for ClientConfig {
    fn from(config: &AppConfig) -> Self {
        Self::new(config.github_url.clone())
            .with_timeout(Duration::from_secs(config.request_timeout_secs))
    }
}
