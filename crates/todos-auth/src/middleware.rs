//! Authentication middleware.
//!
//! Gates every protected route: the `Authorization` header carries the
//! raw token (no scheme prefix), which is verified before the handler
//! runs. On success the verified user id is attached to the request
//! extensions as [`AuthUser`]; on any failure the request is terminated
//! with 401 before dispatch. Layered via
//! `axum::middleware::from_fn_with_state` with the shared
//! [`TokenService`] as state, forming an ordered interceptor chain that
//! short-circuits with a terminal response.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::token::TokenService;

/// Verified identity attached to request extensions by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: u64,
}

/// Authentication middleware that validates the raw `Authorization`
/// token and injects [`AuthUser`].
pub async fn require_auth(
    State(tokens): State<Arc<TokenService>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = match req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
    {
        Some(token) if !token.is_empty() => token,
        _ => {
            tracing::debug!(path = %req.uri().path(), "No Authorization header");
            return unauthorized_response("Authentication required");
        }
    };

    match tokens.verify(token) {
        Ok(claims) => {
            tracing::debug!(user_id = claims.user_id, "Token verified");
            req.extensions_mut().insert(AuthUser {
                user_id: claims.user_id,
            });
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Token verification failed");
            unauthorized_response(&e.to_string())
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
}
