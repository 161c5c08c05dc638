//! One handler per operation.
//!
//! Handlers validate input, call the record store (or the listing cache),
//! and map every outcome onto the response contract: a 200 JSON payload
//! or an [`ApiError`]. They hold no state of their own beyond what
//! [`AppState`] shares; each request is independent once admitted by the
//! auth middleware.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

use todos_core::{Todo, TodoDraft, TodoId};
use todos_storage::Page;

use crate::error::ApiError;
use crate::state::AppState;

/// Cache slot holding the most recent full listing.
pub const TODOS_CACHE_KEY: &str = "todos";

const DEFAULT_PAGE_COUNT: usize = 5;
const DEFAULT_PAGE_OFFSET: usize = 0;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "todos-server",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

// ---- Authentication ----

/// POST /login?userid=N — issues a token for the given user identifier.
/// The only operation not gated by the auth middleware.
pub async fn login(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let raw = params
        .get("userid")
        .ok_or_else(|| ApiError::bad_request("Missing userid parameter"))?;
    let user_id: u64 = raw
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid userid: {raw}")))?;

    let token = state.tokens.issue(user_id)?;

    tracing::debug!(user_id, "token issued");
    Ok(Json(json!({ "token": token })))
}

// ---- Record CRUD ----

/// POST /todos
pub async fn create_todo(
    State(state): State<AppState>,
    payload: Result<Json<TodoDraft>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    let Json(draft) = payload?;
    let todo = state.store.create(draft).await?;
    Ok(Json(todo))
}

/// GET /todos
pub async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

/// A path segment that does not parse as a record id can never name a
/// record, so it reports the same way as a missing one.
fn record_id(path: Result<Path<TodoId>, PathRejection>) -> Result<TodoId, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::not_found("Todo not found"))
}

/// GET /todos/{id}
pub async fn get_todo(
    State(state): State<AppState>,
    path: Result<Path<TodoId>, PathRejection>,
) -> Result<Json<Todo>, ApiError> {
    let id = record_id(path)?;
    state
        .store
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Todo not found"))
}

/// PUT /todos/{id}
pub async fn update_todo(
    State(state): State<AppState>,
    path: Result<Path<TodoId>, PathRejection>,
    payload: Result<Json<TodoDraft>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    let id = record_id(path)?;
    // Identity is checked before the payload: an unknown id is 404 no
    // matter what the body looks like.
    if state.store.get(id).await?.is_none() {
        return Err(ApiError::not_found("Todo not found"));
    }

    let Json(draft) = payload?;
    let todo = state.store.update(id, draft).await?;
    Ok(Json(todo))
}

/// DELETE /todos/{id}
pub async fn delete_todo(
    State(state): State<AppState>,
    path: Result<Path<TodoId>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = record_id(path)?;
    state.store.delete(id).await?;
    Ok(Json(json!({ "message": "Todo deleted successfully" })))
}

// ---- Batch & paginated listing ----

/// GET /manytodos?count=&offset=
pub async fn list_paginated(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Todo>>, ApiError> {
    let count = parse_page_param(&params, "count", DEFAULT_PAGE_COUNT)?;
    let offset = parse_page_param(&params, "offset", DEFAULT_PAGE_OFFSET)?;

    let todos = state.store.page(Page::new(offset, count)).await?;
    Ok(Json(todos))
}

/// Page parameters are non-negative integers with defaults; anything
/// else (negative, fractional, non-numeric) is a client error.
fn parse_page_param(
    params: &HashMap<String, String>,
    key: &str,
    default: usize,
) -> Result<usize, ApiError> {
    match params.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| ApiError::bad_request(format!("Invalid {key} parameter: {raw}"))),
    }
}

/// POST /manytodos — inserts the whole array inside one transaction.
///
/// All-or-nothing: the first failing insert rolls the batch back and is
/// reported as the request's error; on success the response carries the
/// persisted records with their store-assigned ids and timestamps.
pub async fn batch_create(
    State(state): State<AppState>,
    payload: Result<Json<Vec<TodoDraft>>, JsonRejection>,
) -> Result<Json<Vec<Todo>>, ApiError> {
    let Json(drafts) = payload?;

    let mut tx = state.store.begin_transaction().await?;
    let mut created = Vec::with_capacity(drafts.len());
    for draft in drafts {
        match tx.create(draft).await {
            Ok(todo) => created.push(todo),
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    tracing::warn!(error = %rb, "rollback failed");
                }
                return Err(ApiError::bad_request(e.to_string()));
            }
        }
    }
    tx.commit()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    tracing::debug!(count = created.len(), "batch committed");
    Ok(Json(created))
}

// ---- Cached listing ----

/// GET /cached-todos — read-through listing snapshot.
///
/// On a hit the cached bytes are returned verbatim; on a miss or after
/// TTL expiry the store is read and the slot repopulated. Writes never
/// evict the slot, so this endpoint may serve data staler than the
/// record store by up to the configured TTL.
pub async fn cached_list(State(state): State<AppState>) -> Result<Response, ApiError> {
    if let Some(bytes) = state.cache.get(TODOS_CACHE_KEY) {
        return Ok(json_bytes(&bytes));
    }

    let todos = state.store.list().await?;
    let bytes =
        serde_json::to_vec(&todos).map_err(|e| ApiError::internal(e.to_string()))?;
    state.cache.set(TODOS_CACHE_KEY, bytes.clone());

    Ok(json_bytes(&bytes))
}

fn json_bytes(bytes: &[u8]) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        bytes.to_vec(),
    )
        .into_response()
}
