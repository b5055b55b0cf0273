//! GitHub client modules
//!
//! [`GithubClient`] is the seam the rate-limit tracker and star cache depend
//! on; [`GithubApi`] is its reqwest-backed implementation.

pub mod api;
pub mod config;
pub mod error;

use std::future::Future;

pub use api::GithubApi;
pub use config::ClientConfig;
pub use error::{ClientError, Result};

use crate::domain::{RateLimitResponse, RepositoryDetails};

/// GitHub REST operations used by the host.
///
/// An empty `token` means the request is sent anonymously. Implementations
/// make exactly one attempt per call.
pub trait GithubClient: Send + Sync + 'static {
    /// `GET /rate_limit`
    fn get_rate_limit(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<RateLimitResponse>> + Send;

    /// `GET /repos/{owner}/{name}`
    fn get_repository_details(
        &self,
        owner: &str,
        name: &str,
        token: &str,
    ) -> impl Future<Output = Result<RepositoryDetails>> + Send;
}
