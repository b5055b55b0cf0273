//! API quota tracking and the toolbar badge derived from it

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, info, instrument, warn};

use crate::{
    client::GithubClient,
    credentials::CredentialStore,
    domain::{BadgeState, RateLimitSnapshot},
    result::{Result, StarsError},
    storage::KeyValueStore,
};

/// Receives every badge the tracker derives
pub trait BadgeSink: Send + Sync {
    fn show(&self, badge: BadgeState);
}

/// Starts a quota refresh without waiting for it
pub trait RateLimitRefresh: Send + Sync {
    fn spawn_refresh(&self);
}

pub struct RateLimitTracker<C, S> {
    client: Arc<C>,
    credentials: Arc<CredentialStore<S>>,
    badge: Arc<dyn BadgeSink>,
}

impl<C, S> RateLimitTracker<C, S>
where
    C: GithubClient,
    S: KeyValueStore,
{
    pub fn new(
        client: Arc<C>,
        credentials: Arc<CredentialStore<S>>,
        badge: Arc<dyn BadgeSink>,
    ) -> Self {
        Self { client, credentials, badge }
    }

    /// Query the current quota and publish the matching badge.
    ///
    /// Never fails: any error shows the `N/A` badge and yields a zeroed
    /// snapshot.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> RateLimitSnapshot {
        match self.fetch().await {
            Ok(snapshot) => {
                info!(
                    remaining = snapshot.remaining,
                    limit = snapshot.limit,
                    "GitHub responded with rate limit"
                );
                self.badge
                    .show(BadgeState::for_remaining(snapshot.remaining));
                snapshot
            },
            Err(e) => {
                warn!(error = %e, "Failed to fetch rate limit");
                self.badge.show(BadgeState::unavailable());
                RateLimitSnapshot::default()
            },
        }
    }

    async fn fetch(&self) -> Result<RateLimitSnapshot> {
        let token = self.credentials.get().await?;
        let response = self.client.get_rate_limit(token.as_str()).await?;
        Ok(response.snapshot())
    }
}

/// Refresh launched on the runtime as a detached task.
///
/// The task's result is intentionally unobserved; a failed refresh only
/// changes the badge.
pub struct DetachedRefresh<C, S> {
    tracker: Arc<RateLimitTracker<C, S>>,
    handle: Handle,
}

impl<C, S> DetachedRefresh<C, S> {
    /// Must be called from within a Tokio runtime
    pub fn new(tracker: Arc<RateLimitTracker<C, S>>) -> Result<Self> {
        let handle = Handle::try_current().map_err(|_| {
            StarsError::GeneralError("rate limit refresh requires a Tokio runtime".into())
        })?;
        Ok(Self { tracker, handle })
    }
}

impl<C, S> RateLimitRefresh for DetachedRefresh<C, S>
where
    C: GithubClient,
    S: KeyValueStore,
{
    fn spawn_refresh(&self) {
        let tracker = Arc::clone(&self.tracker);
        debug!("Spawning background rate limit refresh");
        self.handle.spawn(async move {
            tracker.refresh().await;
        });
    }
}
