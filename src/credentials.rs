use serde::Serialize;
use tracing::{debug, instrument};

use crate::storage::{KeyValueStore, Result};

/// Storage key holding the GitHub access token
pub const ACCESS_TOKEN_KEY: &str = "ACCESS_TOKEN";

/// GitHub personal access token; empty means unauthenticated
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Manual Debug implementation to keep tokens out of logs
impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            f.write_str("AccessToken(<none>)")
        } else {
            f.write_str("AccessToken([REDACTED])")
        }
    }
}

/// Holds the single access token in durable storage
#[derive(Debug)]
pub struct CredentialStore<S> {
    storage: S,
}

impl<S: KeyValueStore> CredentialStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Stored token, or the empty token when none was ever set.
    ///
    /// Storage failures are returned to the caller.
    pub async fn get(&self) -> Result<AccessToken> {
        let token = self.storage.get(ACCESS_TOKEN_KEY).await?;
        debug!(present = token.as_ref().is_some_and(|t| !t.is_empty()), "Loaded access token");
        Ok(token.map(AccessToken).unwrap_or_default())
    }

    #[instrument(skip_all, fields(empty = token.is_empty()))]
    pub async fn set(&self, token: &AccessToken) -> Result<()> {
        self.storage
            .set(ACCESS_TOKEN_KEY, token.as_str())
            .await?;
        debug!("Access token stored");
        Ok(())
    }
}
