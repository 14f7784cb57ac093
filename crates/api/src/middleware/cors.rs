use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};

/// Build the CORS layer. Any origin may read; editing still needs a token.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
}
