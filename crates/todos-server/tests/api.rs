//! End-to-end tests against the assembled router.
//!
//! Requests are driven through `tower::ServiceExt::oneshot` without
//! binding a socket; each test builds its own isolated state.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use todos_auth::TokenService;
use todos_core::{Todo, TodoDraft, TodoId};
use todos_db_memory::MemoryStore;
use todos_server::{AppConfig, AppState, ListingCache, build_app};
use todos_storage::{Page, StorageError, TodoStore, TodoTransaction};

const SECRET: &str = "integration-test-secret";

fn app_with(store: Arc<dyn TodoStore>, cache_ttl: Duration) -> Router {
    let state = AppState::new(
        store,
        Arc::new(TokenService::new(SECRET)),
        ListingCache::new(cache_ttl),
    );
    build_app(state, &AppConfig::default())
}

fn app() -> Router {
    app_with(Arc::new(MemoryStore::new()), Duration::from_secs(60))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login(app: &Router, user_id: u64) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::post(format!("/login?userid={user_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["token"].as_str().unwrap().to_string()
}

fn authed(token: &str, method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, token);
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

// ---- Full lifecycle ----

#[tokio::test]
async fn scenario_login_create_get_delete() {
    let app = app();
    let token = login(&app, 7).await;

    // Create
    let (status, created) = send(
        &app,
        authed(
            &token,
            "POST",
            "/todos",
            Some(json!({"title": "a", "description": "b"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["id"], 1);
    assert_eq!(created["title"], "a");
    assert_eq!(created["description"], "b");
    assert!(created["created_at"].is_string());
    assert!(created["updated_at"].is_string());

    // Get returns the same record
    let (status, fetched) = send(&app, authed(&token, "GET", "/todos/1", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    // Delete confirms with a message, not the record
    let (status, deleted) = send(&app, authed(&token, "DELETE", "/todos/1", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["message"], "Todo deleted successfully");

    // Soft deletion is observable as absence
    let (status, missing) = send(&app, authed(&token, "GET", "/todos/1", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["error"], "Todo not found");
}

// ---- Authentication gate ----

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = app();

    for (method, uri) in [
        ("GET", "/todos"),
        ("POST", "/todos"),
        ("GET", "/todos/1"),
        ("GET", "/manytodos"),
        ("POST", "/manytodos"),
        ("GET", "/cached-todos"),
    ] {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{method} {uri} must be gated"
        );
    }
}

#[tokio::test]
async fn invalid_token_is_rejected_before_the_handler() {
    let app = app();
    let (status, body) = send(&app, authed("garbage", "GET", "/todos", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn foreign_signature_is_rejected() {
    let app = app();
    let foreign = TokenService::new("some-other-secret").issue(7).unwrap();
    let (status, _) = send(&app, authed(&foreign, "GET", "/todos", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(TokenService::with_ttl(SECRET, Duration::ZERO)),
        ListingCache::new(Duration::from_secs(60)),
    );
    let app = build_app(state, &AppConfig::default());

    let token = login(&app, 7).await;
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let (status, body) = send(&app, authed(&token, "GET", "/todos", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token expired");
}

#[tokio::test]
async fn public_endpoints_do_not_require_a_token() {
    let app = app();

    let response = app
        .clone()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, banner) = send(&app, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(banner["service"], "todos-server");
}

// ---- Login ----

#[tokio::test]
async fn login_validates_the_userid_parameter() {
    let app = app();

    for uri in ["/login", "/login?userid=abc", "/login?userid=-1"] {
        let response = app
            .clone()
            .oneshot(Request::post(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn issued_token_round_trips_the_user_id() {
    let app = app();
    let token = login(&app, 42).await;
    let claims = TokenService::new(SECRET).verify(&token).unwrap();
    assert_eq!(claims.user_id, 42);
}

// ---- Create / Update validation ----

#[tokio::test]
async fn create_rejects_unparsable_payloads() {
    let app = app();
    let token = login(&app, 1).await;

    let req = Request::post("/todos")
        .header(header::AUTHORIZATION, &token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_rejects_empty_titles() {
    let app = app();
    let token = login(&app, 1).await;

    let (status, body) = send(
        &app,
        authed(
            &token,
            "POST",
            "/todos",
            Some(json!({"title": "", "description": "x"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("title"));
}

#[tokio::test]
async fn create_ignores_client_supplied_identity_and_timestamps() {
    let app = app();
    let token = login(&app, 1).await;

    let (status, created) = send(
        &app,
        authed(
            &token,
            "POST",
            "/todos",
            Some(json!({
                "id": 999,
                "title": "a",
                "description": "b",
                "created_at": "1999-01-01T00:00:00Z"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["id"], 1);
    assert_ne!(created["created_at"], "1999-01-01T00:00:00Z");
}

#[tokio::test]
async fn update_on_missing_identity_is_not_found_regardless_of_payload() {
    let app = app();
    let token = login(&app, 1).await;

    // Valid payload, missing record.
    let (status, _) = send(
        &app,
        authed(
            &token,
            "PUT",
            "/todos/99",
            Some(json!({"title": "t", "description": "d"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Unparsable payload, still 404: identity wins.
    let req = Request::put("/todos/99")
        .header(header::AUTHORIZATION, &token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{broken"))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_overwrites_title_and_description_only() {
    let app = app();
    let token = login(&app, 1).await;

    let (_, created) = send(
        &app,
        authed(
            &token,
            "POST",
            "/todos",
            Some(json!({"title": "before", "description": "old"})),
        ),
    )
    .await;

    let (status, updated) = send(
        &app,
        authed(
            &token,
            "PUT",
            "/todos/1",
            Some(json!({"title": "after", "description": "new"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["title"], "after");
    assert_eq!(updated["description"], "new");
    assert_eq!(updated["created_at"], created["created_at"]);

    let (_, bad) = send(
        &app,
        authed(
            &token,
            "PUT",
            "/todos/1",
            Some(json!({"title": "", "description": ""})),
        ),
    )
    .await;
    assert_eq!(bad["error"], "Invalid record: title must not be empty");
}

#[tokio::test]
async fn non_numeric_id_reads_as_missing_record() {
    let app = app();
    let token = login(&app, 1).await;

    let (status, body) = send(&app, authed(&token, "GET", "/todos/abc", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Todo not found");
}

#[tokio::test]
async fn delete_missing_identity_is_not_found() {
    let app = app();
    let token = login(&app, 1).await;

    let (status, _) = send(&app, authed(&token, "DELETE", "/todos/5", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---- List & pagination ----

#[tokio::test]
async fn list_returns_only_live_records() {
    let app = app();
    let token = login(&app, 1).await;

    for title in ["one", "two", "three"] {
        send(
            &app,
            authed(
                &token,
                "POST",
                "/todos",
                Some(json!({"title": title, "description": ""})),
            ),
        )
        .await;
    }
    send(&app, authed(&token, "DELETE", "/todos/2", None)).await;

    let (status, listed) = send(&app, authed(&token, "GET", "/todos", None)).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["one", "three"]);
}

#[tokio::test]
async fn pagination_windows_and_defaults() {
    let app = app();
    let token = login(&app, 1).await;

    for i in 0..7 {
        send(
            &app,
            authed(
                &token,
                "POST",
                "/todos",
                Some(json!({"title": format!("todo-{i}"), "description": ""})),
            ),
        )
        .await;
    }

    // count=2, offset=0 -> exactly 2 records
    let (status, page) = send(
        &app,
        authed(&token, "GET", "/manytodos?count=2&offset=0", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page.as_array().unwrap().len(), 2);

    // Defaults: count=5, offset=0
    let (_, page) = send(&app, authed(&token, "GET", "/manytodos", None)).await;
    assert_eq!(page.as_array().unwrap().len(), 5);

    // Offset shifts the window
    let (_, page) = send(&app, authed(&token, "GET", "/manytodos?offset=5", None)).await;
    assert_eq!(page.as_array().unwrap().len(), 2);

    // count=0 is a valid empty window
    let (status, page) = send(&app, authed(&token, "GET", "/manytodos?count=0", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn pagination_rejects_bad_parameters() {
    let app = app();
    let token = login(&app, 1).await;

    for uri in [
        "/manytodos?count=-1",
        "/manytodos?count=abc",
        "/manytodos?count=1.5",
        "/manytodos?offset=-3",
        "/manytodos?offset=x",
    ] {
        let (status, body) = send(&app, authed(&token, "GET", uri, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string());
    }
}

// ---- Batch create ----

#[tokio::test]
async fn batch_create_returns_assigned_ids() {
    // The response carries the persisted records, store-assigned ids and
    // timestamps included, not an echo of the client payload.
    let app = app();
    let token = login(&app, 1).await;

    let (status, created) = send(
        &app,
        authed(
            &token,
            "POST",
            "/manytodos",
            Some(json!([
                {"title": "a", "description": ""},
                {"title": "b", "description": ""},
                {"title": "c", "description": ""}
            ])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let ids: Vec<u64> = created
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(created[0]["created_at"].is_string());

    let (_, listed) = send(&app, authed(&token, "GET", "/todos", None)).await;
    assert_eq!(listed.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn batch_create_is_all_or_nothing() {
    let app = app();
    let token = login(&app, 1).await;

    send(
        &app,
        authed(
            &token,
            "POST",
            "/todos",
            Some(json!({"title": "pre-existing", "description": ""})),
        ),
    )
    .await;

    // One invalid element among valid ones: nothing is persisted.
    let (status, body) = send(
        &app,
        authed(
            &token,
            "POST",
            "/manytodos",
            Some(json!([
                {"title": "ok-1", "description": ""},
                {"title": "", "description": "invalid"},
                {"title": "ok-2", "description": ""}
            ])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("title"));

    let (_, listed) = send(&app, authed(&token, "GET", "/todos", None)).await;
    assert_eq!(listed.as_array().unwrap().len(), 1, "batch must roll back");
}

#[tokio::test]
async fn batch_create_rejects_non_array_payloads() {
    let app = app();
    let token = login(&app, 1).await;

    let (status, _) = send(
        &app,
        authed(
            &token,
            "POST",
            "/manytodos",
            Some(json!({"title": "not-an-array", "description": ""})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---- Cached listing ----

/// Store wrapper counting full-listing reads, to observe cache hits.
struct CountingStore {
    inner: MemoryStore,
    list_calls: AtomicUsize,
}

impl CountingStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            list_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TodoStore for CountingStore {
    async fn create(&self, draft: TodoDraft) -> Result<Todo, StorageError> {
        self.inner.create(draft).await
    }
    async fn get(&self, id: TodoId) -> Result<Option<Todo>, StorageError> {
        self.inner.get(id).await
    }
    async fn list(&self) -> Result<Vec<Todo>, StorageError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list().await
    }
    async fn page(&self, page: Page) -> Result<Vec<Todo>, StorageError> {
        self.inner.page(page).await
    }
    async fn update(&self, id: TodoId, draft: TodoDraft) -> Result<Todo, StorageError> {
        self.inner.update(id, draft).await
    }
    async fn delete(&self, id: TodoId) -> Result<(), StorageError> {
        self.inner.delete(id).await
    }
    async fn begin_transaction(&self) -> Result<Box<dyn TodoTransaction>, StorageError> {
        self.inner.begin_transaction().await
    }
    fn supports_transactions(&self) -> bool {
        self.inner.supports_transactions()
    }
    fn backend_name(&self) -> &'static str {
        "counting-memory"
    }
}

#[tokio::test]
async fn cached_list_reads_through_once_per_ttl_window() {
    let store = CountingStore::new();
    let app = app_with(store.clone(), Duration::from_millis(120));
    let token = login(&app, 1).await;

    send(
        &app,
        authed(
            &token,
            "POST",
            "/todos",
            Some(json!({"title": "cached", "description": ""})),
        ),
    )
    .await;

    // Cold start: one store read populates the cache.
    let (status, first) = send(&app, authed(&token, "GET", "/cached-todos", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);

    // Within the TTL window: identical data, no new store read.
    let (_, second) = send(&app, authed(&token, "GET", "/cached-todos", None)).await;
    assert_eq!(second, first);
    assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);

    // After expiry: a fresh store read even though nothing changed.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let (_, third) = send(&app, authed(&token, "GET", "/cached-todos", None)).await;
    assert_eq!(third, first);
    assert_eq!(store.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cached_list_serves_stale_data_until_expiry() {
    // Writes do not invalidate the cache slot; staleness up to the TTL
    // is the documented behavior, not a bug.
    let store = CountingStore::new();
    let app = app_with(store.clone(), Duration::from_millis(150));
    let token = login(&app, 1).await;

    send(
        &app,
        authed(
            &token,
            "POST",
            "/todos",
            Some(json!({"title": "first", "description": ""})),
        ),
    )
    .await;

    let (_, snapshot) = send(&app, authed(&token, "GET", "/cached-todos", None)).await;
    assert_eq!(snapshot.as_array().unwrap().len(), 1);

    // A write after the snapshot...
    send(
        &app,
        authed(
            &token,
            "POST",
            "/todos",
            Some(json!({"title": "second", "description": ""})),
        ),
    )
    .await;

    // ...is not visible through the cache yet.
    let (_, stale) = send(&app, authed(&token, "GET", "/cached-todos", None)).await;
    assert_eq!(stale.as_array().unwrap().len(), 1);

    // The uncached listing sees it immediately.
    let (_, live) = send(&app, authed(&token, "GET", "/todos", None)).await;
    assert_eq!(live.as_array().unwrap().len(), 2);

    // After natural expiry the cache catches up.
    tokio::time::sleep(Duration::from_millis(250)).await;
    let (_, fresh) = send(&app, authed(&token, "GET", "/cached-todos", None)).await;
    assert_eq!(fresh.as_array().unwrap().len(), 2);
}
