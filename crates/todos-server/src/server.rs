use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use todos_auth::{TokenService, require_auth};
use todos_db_memory::MemoryStore;
use todos_storage::TodoStore;

use crate::cache::ListingCache;
use crate::{config::AppConfig, handlers, middleware as app_middleware, state::AppState};

pub struct TodosServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;

    // Protected operations: everything except login and the operational
    // endpoints goes through the auth interceptor.
    let protected = Router::new()
        .route(
            "/todos",
            get(handlers::list_todos).post(handlers::create_todo),
        )
        .route(
            "/todos/{id}",
            get(handlers::get_todo)
                .put(handlers::update_todo)
                .delete(handlers::delete_todo),
        )
        .route(
            "/manytodos",
            get(handlers::list_paginated).post(handlers::batch_create),
        )
        .route("/cached-todos", get(handlers::cached_list))
        .route_layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            require_auth,
        ));

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        // Token issuance is the one unauthenticated operation
        .route("/login", post(handlers::login))
        .merge(protected)
        // Middleware stack (order: request id -> trace -> body limit)
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Opens the record store, builds the token service and cache from
    /// configuration, and assembles the router.
    pub async fn build(self) -> anyhow::Result<TodosServer> {
        let store = MemoryStore::open(&self.config.storage.path).await?;
        tracing::info!(
            path = %self.config.storage.path,
            backend = store.backend_name(),
            records = store.count().await,
            "record store opened"
        );

        let tokens = Arc::new(TokenService::with_ttl(
            &self.config.auth.secret,
            self.config.token_ttl(),
        ));
        let cache = ListingCache::new(self.config.cache_ttl());

        let state = AppState::new(Arc::new(store), tokens, cache);
        let app = build_app(state, &self.config);

        Ok(TodosServer {
            addr: self.addr,
            app,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TodosServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!(addr = %self.addr, "listening");
        axum::serve(listener, self.app).await?;
        Ok(())
    }
}
