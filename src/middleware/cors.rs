use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// The quiz front-end is served from another origin and sends its token in
/// the `Authorization` header.
pub fn quiz_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(Any)
}
