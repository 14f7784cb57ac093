pub mod content;
pub mod health;
pub mod listen;
pub mod search;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::state::AppState;

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config().max_request_bytes();
    Router::new()
        .merge(health::routes())
        .merge(content::routes())
        .merge(search::routes())
        .merge(listen::routes())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}
