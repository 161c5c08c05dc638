//! HTTP server for the todos service.
//!
//! Wires the record store, token service and listing cache into an axum
//! router. See `server::build_app` for the route table and middleware
//! stack.

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod state;

pub use cache::ListingCache;
pub use config::{AppConfig, load_config};
pub use error::ApiError;
pub use server::{ServerBuilder, TodosServer, build_app};
pub use state::AppState;
