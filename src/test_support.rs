//! Fakes shared by unit tests

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration as StdDuration,
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Value, json};
use tokio::sync::Barrier;

use crate::{
    client::{ClientError, GithubClient, Result},
    clock::Clock,
    domain::{BadgeState, RateLimitResponse, RepositoryDetails},
    rate_limit::{BadgeSink, RateLimitRefresh},
    storage::{self, KeyValueStore, StorageError},
};

/// Scripted GitHub client; `None` bodies simulate a network failure
pub struct FakeGithub {
    rate_limit_body: Mutex<Option<Value>>,
    repo_body: Mutex<Option<Value>>,
    last_token: Mutex<Option<String>>,
    rate_limit_calls: AtomicUsize,
    repo_calls: AtomicUsize,
    gate: Option<Arc<Barrier>>,
}

impl FakeGithub {
    pub fn new() -> Self {
        Self {
            rate_limit_body: Mutex::new(None),
            repo_body: Mutex::new(None),
            last_token: Mutex::new(None),
            rate_limit_calls: AtomicUsize::new(0),
            repo_calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn with_rate_limit(self, remaining: u64, limit: u64) -> Self {
        self.with_rate_limit_body(json!({
            "resources": { "core": { "remaining": remaining, "limit": limit } }
        }))
    }

    pub fn with_rate_limit_body(self, body: Value) -> Self {
        *self.rate_limit_body.lock().unwrap() = Some(body);
        self
    }

    pub fn failing_rate_limit(self) -> Self {
        *self.rate_limit_body.lock().unwrap() = None;
        self
    }

    pub fn with_stars(self, stars: Value) -> Self {
        self.set_stars(Some(stars));
        self
    }

    pub fn with_repo_body(self, body: Value) -> Self {
        *self.repo_body.lock().unwrap() = Some(body);
        self
    }

    /// Hold every repository fetch at `gate` before answering
    pub fn with_gate(mut self, gate: Arc<Barrier>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn failing_repos(self) -> Self {
        self.set_stars(None);
        self
    }

    pub fn set_stars(&self, stars: Option<Value>) {
        *self.repo_body.lock().unwrap() = stars.map(|s| json!({ "stargazers_count": s }));
    }

    pub fn rate_limit_calls(&self) -> usize {
        self.rate_limit_calls.load(Ordering::SeqCst)
    }

    pub fn repo_calls(&self) -> usize {
        self.repo_calls.load(Ordering::SeqCst)
    }

    pub fn last_token(&self) -> Option<String> {
        self.last_token.lock().unwrap().clone()
    }

    fn respond<T>(&self, body: &Mutex<Option<Value>>, token: &str) -> Result<T>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        *self.last_token.lock().unwrap() = Some(token.to_owned());
        let body = body
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ClientError::github_api("simulated network failure"))?;
        serde_json::from_value(body).map_err(|e| ClientError::json_parse("fake", "bad body", e))
    }
}

impl GithubClient for FakeGithub {
    async fn get_rate_limit(&self, token: &str) -> Result<RateLimitResponse> {
        self.rate_limit_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(&self.rate_limit_body, token)
    }

    async fn get_repository_details(
        &self,
        _owner: &str,
        _name: &str,
        token: &str,
    ) -> Result<RepositoryDetails> {
        self.repo_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.wait().await;
        }
        self.respond(&self.repo_body, token)
    }
}

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap();
        Self { now: Mutex::new(start) }
    }
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
pub struct RecordingBadge {
    shown: Mutex<Vec<BadgeState>>,
}

impl RecordingBadge {
    pub fn last(&self) -> Option<BadgeState> {
        self.shown.lock().unwrap().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.shown.lock().unwrap().len()
    }
}

impl BadgeSink for RecordingBadge {
    fn show(&self, badge: BadgeState) {
        self.shown.lock().unwrap().push(badge);
    }
}

#[derive(Default)]
pub struct CountingRefresher {
    count: AtomicUsize,
}

impl CountingRefresher {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl RateLimitRefresh for CountingRefresher {
    fn spawn_refresh(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Storage whose every operation fails
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> storage::Result<Option<String>> {
        Err(StorageError::Unavailable("simulated read failure".into()))
    }

    async fn set(&self, _key: &str, _value: &str) -> storage::Result<()> {
        Err(StorageError::Unavailable("simulated write failure".into()))
    }
}

/// Poll `condition` until it holds, panicking after two seconds
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    panic!("condition not met within two seconds");
}
