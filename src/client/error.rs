//! Error types for the GitHub client

use compact_str::CompactString;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors raised while talking to the GitHub REST API
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to parse response from {endpoint}: {message}")]
    JsonParse {
        endpoint: CompactString,
        message: CompactString,
        #[source]
        source: serde_json::Error,
    },

    #[error("GitHub API error: {message}")]
    GithubApi { message: CompactString },

    #[error("GitHub rejected the access token")]
    Authentication,

    #[error("{resource} not found")]
    NotFound { resource: CompactString },

    #[error("GitHub API rate limit exceeded")]
    RateLimit { reset_at: Option<i64> },

    #[error("invalid {field}: {message}")]
    ConfigValidation {
        field: CompactString,
        message: CompactString,
    },
}

impl ClientError {
    pub fn config_validation(
        field: impl Into<CompactString>,
        message: impl Into<CompactString>,
    ) -> Self {
        Self::ConfigValidation { field: field.into(), message: message.into() }
    }

    pub fn json_parse(
        endpoint: impl Into<CompactString>,
        message: impl Into<CompactString>,
        source: serde_json::Error,
    ) -> Self {
        Self::JsonParse { endpoint: endpoint.into(), message: message.into(), source }
    }

    pub fn github_api(message: impl Into<CompactString>) -> Self {
        Self::GithubApi { message: message.into() }
    }

    pub fn not_found(resource: impl Into<CompactString>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    pub fn rate_limit(reset_at: Option<i64>) -> Self {
        Self::RateLimit { reset_at }
    }
}
