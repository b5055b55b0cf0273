//! High-level operations behind the message routes
//!
//! Owns the wiring between credential storage, quota tracking and the star
//! cache, and the ordering between them: a token write is durable before
//! the quota refresh it triggers begins.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
    cache::StarCache,
    client::GithubClient,
    clock::Clock,
    credentials::{AccessToken, CredentialStore},
    domain::RateLimitSnapshot,
    id::RepositoryIdentity,
    rate_limit::{BadgeSink, DetachedRefresh, RateLimitRefresh, RateLimitTracker},
    result::Result,
    storage::KeyValueStore,
};

pub struct StarsService<C, S> {
    credentials: Arc<CredentialStore<S>>,
    tracker: Arc<RateLimitTracker<C, S>>,
    refresher: Arc<dyn RateLimitRefresh>,
    cache: StarCache<C>,
}

impl<C, S> StarsService<C, S>
where
    C: GithubClient,
    S: KeyValueStore,
{
    /// Wire the components; must be called from within a Tokio runtime
    pub fn new(
        client: Arc<C>,
        storage: S,
        clock: Arc<dyn Clock>,
        badge: Arc<dyn BadgeSink>,
    ) -> Result<Self> {
        let credentials = Arc::new(CredentialStore::new(storage));
        let tracker = Arc::new(RateLimitTracker::new(
            Arc::clone(&client),
            Arc::clone(&credentials),
            badge,
        ));
        let refresher: Arc<dyn RateLimitRefresh> =
            Arc::new(DetachedRefresh::new(Arc::clone(&tracker))?);
        let cache = StarCache::new(client, clock, Arc::clone(&refresher));

        Ok(Self { credentials, tracker, refresher, cache })
    }

    pub async fn access_token(&self) -> Result<AccessToken> {
        Ok(self.credentials.get().await?)
    }

    /// Store the token, then refresh the quota with it.
    ///
    /// The refresh starts only after the write succeeded; a failed write is
    /// returned and no refresh happens.
    #[instrument(skip_all)]
    pub async fn set_access_token(&self, token: AccessToken) -> Result<bool> {
        self.credentials.set(&token).await?;
        info!(authenticated = !token.is_empty(), "Access token updated");
        self.tracker.refresh().await;
        Ok(true)
    }

    pub async fn rate_limit(&self) -> RateLimitSnapshot {
        self.tracker.refresh().await
    }

    /// Star count for `owner/name` using the stored token.
    ///
    /// Returns 0 without touching the network unless both parts are
    /// present and non-empty.
    #[instrument(skip(self))]
    pub async fn stars(&self, owner: Option<&str>, name: Option<&str>) -> Result<i64> {
        let Some(identity) = RepositoryIdentity::from_parts(owner, name) else {
            return Ok(0);
        };

        let token = self.credentials.get().await?;
        Ok(self
            .cache
            .get_star_count(&identity, token.as_str())
            .await)
    }

    /// Kick off the start-up quota refresh without waiting for it
    pub fn spawn_rate_limit_refresh(&self) {
        self.refresher.spawn_refresh();
    }

    pub fn cache(&self) -> &StarCache<C> {
        &self.cache
    }
}
