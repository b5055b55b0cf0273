//! Request routing for messages from the extension

use std::{fmt, str::FromStr, sync::Arc};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::{
    client::GithubClient,
    credentials::AccessToken,
    result::{Result, StarsError},
    service::StarsService,
    storage::KeyValueStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    GetAccessToken,
    SetAccessToken,
    GetRateLimit,
    GetStars,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::GetAccessToken => "get-access-token",
            Route::SetAccessToken => "set-access-token",
            Route::GetRateLimit => "get-rate-limit",
            Route::GetStars => "get-stars",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Route {
    type Err = StarsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "get-access-token" | "/access-token/get" => Ok(Route::GetAccessToken),
            "set-access-token" | "/access-token/set" => Ok(Route::SetAccessToken),
            "get-rate-limit" | "/rate-limit" => Ok(Route::GetRateLimit),
            "get-stars" | "/stars/get" => Ok(Route::GetStars),
            other => Err(StarsError::UnknownRoute(other.into())),
        }
    }
}

/// Inbound message; payload fields sit beside `route`
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Option<Value>,
    pub route: CompactString,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub id: Option<Value>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self { id, ok: true, result: Some(result), error: None }
    }

    pub fn failure(id: Option<Value>, error: impl fmt::Display) -> Self {
        Self { id, ok: false, result: None, error: Some(error.to_string()) }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SetAccessTokenBody {
    #[serde(rename = "accessToken", default)]
    access_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StarsBody {
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

pub struct MessageRouter<C, S> {
    service: Arc<StarsService<C, S>>,
}

impl<C, S> Clone for MessageRouter<C, S> {
    fn clone(&self) -> Self {
        Self { service: Arc::clone(&self.service) }
    }
}

impl<C, S> MessageRouter<C, S>
where
    C: GithubClient,
    S: KeyValueStore,
{
    pub fn new(service: Arc<StarsService<C, S>>) -> Self {
        Self { service }
    }

    /// Run the handler for `request` and wrap its outcome in a response
    #[instrument(skip_all, fields(route = %request.route))]
    pub async fn handle(&self, request: Request) -> Response {
        let Request { id, route, payload } = request;

        match self.dispatch(&route, payload).await {
            Ok(result) => {
                debug!("Request handled");
                Response::success(id, result)
            },
            Err(e) => {
                warn!(error = %e, "Request failed");
                Response::failure(id, e)
            },
        }
    }

    async fn dispatch(&self, route: &str, payload: Map<String, Value>) -> Result<Value> {
        match route.parse::<Route>()? {
            Route::GetAccessToken => {
                let token = self.service.access_token().await?;
                Ok(Value::from(token.as_str()))
            },
            Route::SetAccessToken => {
                let body: SetAccessTokenBody = serde_json::from_value(Value::Object(payload))?;
                let token = AccessToken::new(body.access_token.unwrap_or_default());
                Ok(Value::from(self.service.set_access_token(token).await?))
            },
            Route::GetRateLimit => {
                let snapshot = self.service.rate_limit().await;
                Ok(serde_json::to_value(snapshot)?)
            },
            Route::GetStars => {
                let body: StarsBody = serde_json::from_value(Value::Object(payload))?;
                let stars = self
                    .service
                    .stars(body.owner.as_deref(), body.name.as_deref())
                    .await?;
                Ok(Value::from(stars))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        clock::SystemClock,
        domain::STARS_UNAVAILABLE,
        storage::MemoryStore,
        test_support::{FailingStore, FakeGithub, RecordingBadge},
    };

    fn router_with<S: KeyValueStore>(
        github: Arc<FakeGithub>,
        storage: S,
    ) -> MessageRouter<FakeGithub, S> {
        let service = StarsService::new(
            github,
            storage,
            Arc::new(SystemClock),
            Arc::new(RecordingBadge::default()),
        )
        .unwrap();
        MessageRouter::new(Arc::new(service))
    }

    fn request(value: Value) -> Request {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn routes_parse_with_aliases() {
        assert_eq!("get-stars".parse::<Route>().unwrap(), Route::GetStars);
        assert_eq!("/stars/get".parse::<Route>().unwrap(), Route::GetStars);
        assert_eq!(
            "/access-token/set".parse::<Route>().unwrap(),
            Route::SetAccessToken
        );
        assert_eq!("/rate-limit".parse::<Route>().unwrap(), Route::GetRateLimit);
        assert!(matches!(
            "delete-stars".parse::<Route>(),
            Err(StarsError::UnknownRoute(_))
        ));
    }

    #[test]
    fn request_collects_payload_beside_route() {
        let req = request(json!({ "id": 7, "route": "get-stars", "owner": "o", "name": "n" }));

        assert_eq!(req.id, Some(json!(7)));
        assert_eq!(req.route, "get-stars");
        assert_eq!(req.payload.get("owner"), Some(&json!("o")));
        assert!(!req.payload.contains_key("route"));
    }

    #[tokio::test]
    async fn unknown_route_is_an_error_response() {
        let router = router_with(Arc::new(FakeGithub::new()), MemoryStore::new());

        let response = router
            .handle(request(json!({ "id": 1, "route": "nope" })))
            .await;

        assert!(!response.ok);
        assert_eq!(response.id, Some(json!(1)));
        assert!(response.error.unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn token_round_trips_through_routes() {
        let github = Arc::new(FakeGithub::new().with_rate_limit(4200, 5000));
        let router = router_with(github.clone(), MemoryStore::new());

        let set = router
            .handle(request(json!({ "route": "set-access-token", "accessToken": "abc123" })))
            .await;
        assert_eq!(set, Response::success(None, json!(true)));
        assert_eq!(github.rate_limit_calls(), 1);

        let get = router
            .handle(request(json!({ "id": 2, "route": "/access-token/get" })))
            .await;
        assert_eq!(get.result, Some(json!("abc123")));
    }

    #[tokio::test]
    async fn missing_access_token_clears_it() {
        let router = router_with(
            Arc::new(FakeGithub::new().with_rate_limit(60, 60)),
            MemoryStore::new(),
        );

        router
            .handle(request(json!({ "route": "set-access-token", "accessToken": "x" })))
            .await;
        router
            .handle(request(json!({ "route": "set-access-token" })))
            .await;

        let get = router
            .handle(request(json!({ "route": "get-access-token" })))
            .await;
        assert_eq!(get.result, Some(json!("")));
    }

    #[tokio::test]
    async fn rate_limit_route_returns_snapshot() {
        let router = router_with(
            Arc::new(FakeGithub::new().with_rate_limit(850, 5000)),
            MemoryStore::new(),
        );

        let response = router
            .handle(request(json!({ "route": "get-rate-limit" })))
            .await;

        assert_eq!(response.result, Some(json!({ "remaining": 850, "limit": 5000 })));
    }

    #[tokio::test]
    async fn rate_limit_failure_is_still_ok() {
        let router = router_with(
            Arc::new(FakeGithub::new().failing_rate_limit()),
            MemoryStore::new(),
        );

        let response = router
            .handle(request(json!({ "route": "get-rate-limit" })))
            .await;

        assert!(response.ok);
        assert_eq!(response.result, Some(json!({ "remaining": 0, "limit": 0 })));
    }

    #[tokio::test]
    async fn stars_without_name_is_zero_and_offline() {
        let github = Arc::new(FakeGithub::new().with_stars(json!(5)));
        let router = router_with(github.clone(), MemoryStore::new());

        let response = router
            .handle(request(json!({ "route": "get-stars", "owner": "o" })))
            .await;

        assert_eq!(response.result, Some(json!(0)));
        assert_eq!(github.repo_calls(), 0);
    }

    #[tokio::test]
    async fn stars_route_reports_count_or_sentinel() {
        let github = Arc::new(FakeGithub::new().failing_repos());
        let router = router_with(github.clone(), MemoryStore::new());
        let req = json!({ "route": "/stars/get", "owner": "o", "name": "n" });

        let failed = router.handle(request(req.clone())).await;
        assert!(failed.ok);
        assert_eq!(failed.result, Some(json!(STARS_UNAVAILABLE)));

        github.set_stars(Some(json!(1234)));
        let found = router.handle(request(req)).await;
        assert_eq!(found.result, Some(json!(1234)));
    }

    #[tokio::test]
    async fn storage_failure_becomes_error_response() {
        let router = router_with(Arc::new(FakeGithub::new()), FailingStore);

        let response = router
            .handle(request(json!({ "id": 3, "route": "get-access-token" })))
            .await;

        assert!(!response.ok);
        assert_eq!(response.id, Some(json!(3)));
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected() {
        let github = Arc::new(FakeGithub::new().with_stars(json!(5)));
        let router = router_with(github.clone(), MemoryStore::new());

        let response = router
            .handle(request(json!({ "route": "get-stars", "owner": 1, "name": "n" })))
            .await;

        assert!(!response.ok);
        assert_eq!(github.repo_calls(), 0);
    }

    #[test]
    fn response_serializes_envelope() {
        let ok = serde_json::to_value(Response::success(Some(json!(9)), json!(42))).unwrap();
        assert_eq!(ok, json!({ "id": 9, "ok": true, "result": 42 }));

        let err = serde_json::to_value(Response::failure(None, "boom")).unwrap();
        assert_eq!(err, json!({ "id": null, "ok": false, "error": "boom" }));
    }
}
