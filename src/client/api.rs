//! Core HTTP client for GitHub API

use compact_str::{CompactString, format_compact};
use reqwest::{
    Client, RequestBuilder, Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::{
    GithubClient,
    config::ClientConfig,
    error::{ClientError, Result},
};
use crate::domain::{RateLimitResponse, RepositoryDetails};

const GITHUB_API_VERSION: &str = "2022-11-28";

/// Pure HTTP client for GitHub API
#[derive(Debug, Clone)]
pub struct GithubApi {
    client: Client,
    config: ClientConfig,
}

/// GitHub API error response body
#[derive(Debug, Deserialize)]
struct GithubApiError {
    message: CompactString,
}

impl GithubApi {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| ClientError::config_validation("user_agent", e.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request.timeout)
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self { client, config })
    }

    /// Endpoint URL under the configured API root, one path segment per item.
    ///
    /// Each segment is percent-encoded, so `#`, `?` and `/` inside a
    /// repository name cannot change which resource is requested.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        if segments.iter().any(|s| matches!(*s, "" | "." | "..")) {
            return Err(ClientError::not_found("Resource"));
        }

        let mut url = Url::parse(self.config.api_root())
            .map_err(|e| ClientError::config_validation("base_url", e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::config_validation("base_url", "URL cannot have a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Perform GET request and deserialize JSON response
    async fn get_json<T>(&self, url: Url, token: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self.request(url, token)?.send().await?;
        self.handle_response(response).await
    }

    /// Create request builder, authenticated only when a token is present
    fn request(&self, url: Url, token: &str) -> Result<RequestBuilder> {
        let builder = self.client.get(url);
        if token.is_empty() {
            return Ok(builder);
        }

        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ClientError::config_validation("access_token", "Token contains invalid characters"))?;
        value.set_sensitive(true);
        Ok(builder.header(AUTHORIZATION, value))
    }

    /// Handle HTTP response and deserialize JSON
    async fn handle_response<T>(&self, response: Response) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url_path = response.url().path().to_string();
        let status = response.status();
        let quota_exhausted = header_value(&response, "x-ratelimit-remaining") == Some(0);
        let reset_at = header_value(&response, "x-ratelimit-reset");
        let body = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&body)
                .map_err(|e| ClientError::json_parse(url_path, "Failed to parse response", e))
        } else {
            debug!(status = status.as_u16(), path = %url_path, "GitHub returned an error status");
            Err(Self::error_for_status(status, quota_exhausted, reset_at, &body))
        }
    }

    /// Map error responses from GitHub API
    fn error_for_status(
        status: StatusCode,
        quota_exhausted: bool,
        reset_at: Option<i64>,
        body: &str,
    ) -> ClientError {
        match status.as_u16() {
            401 => ClientError::Authentication,
            403 if quota_exhausted => ClientError::rate_limit(reset_at),
            429 => ClientError::rate_limit(reset_at),
            404 => ClientError::not_found("Resource"),
            code => match serde_json::from_str::<GithubApiError>(body) {
                Ok(api_error) => {
                    ClientError::github_api(format_compact!("HTTP {}: {}", code, api_error.message))
                },
                Err(_) => ClientError::github_api(format_compact!("HTTP {}: {}", code, body)),
            },
        }
    }
}

fn header_value(response: &Response, name: &str) -> Option<i64> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

impl GithubClient for GithubApi {
    #[instrument(skip_all, fields(authenticated = !token.is_empty()))]
    async fn get_rate_limit(&self, token: &str) -> Result<RateLimitResponse> {
        let url = self.endpoint(&["rate_limit"])?;
        self.get_json(url, token).await
    }

    #[instrument(skip(self, token), fields(authenticated = !token.is_empty()))]
    async fn get_repository_details(
        &self,
        owner: &str,
        name: &str,
        token: &str,
    ) -> Result<RepositoryDetails> {
        let url = self.endpoint(&["repos", owner, name])?;
        self.get_json(url, token).await
    }
}
