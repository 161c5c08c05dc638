//! Shared application state.
//!
//! Everything the handlers need is built once at startup and passed
//! through router state — no process-wide globals.

use std::sync::Arc;

use todos_auth::TokenService;
use todos_storage::TodoStore;

use crate::cache::ListingCache;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TodoStore>,
    pub tokens: Arc<TokenService>,
    pub cache: ListingCache,
}

impl AppState {
    pub fn new(store: Arc<dyn TodoStore>, tokens: Arc<TokenService>, cache: ListingCache) -> Self {
        Self {
            store,
            tokens,
            cache,
        }
    }
}
