use std::fmt;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

pub async fn require_bearer_token(mut req: Request, next: Next) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"missing_authorization"})),
        )
            .into_response();
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"bad_authorization"})),
        )
            .into_response();
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"unsupported_scheme"})),
        )
            .into_response();
    };
    let token = BearerToken::new(token.trim());
    if token.as_str().is_empty() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"empty_token"})),
        )
            .into_response();
    }

    req.extensions_mut().insert(token);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Extension, Router};
    use tower::ServiceExt;

    async fn echo_token(Extension(token): Extension<BearerToken>) -> String {
        token.as_str().to_string()
    }

    fn app() -> Router {
        Router::new()
            .route("/whoami", get(echo_token))
            .layer(axum::middleware::from_fn(require_bearer_token))
    }

    #[tokio::test]
    async fn trimmed_token_reaches_handler() {
        let req = axum::http::Request::builder()
            .uri("/whoami")
            .header("authorization", "Bearer  abc123 ")
            .body(Body::empty())
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"abc123");
    }

    #[tokio::test]
    async fn blank_token_is_rejected() {
        let req = axum::http::Request::builder()
            .uri("/whoami")
            .header("authorization", "Bearer   ")
            .body(Body::empty())
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn debug_hides_token() {
        let token = BearerToken::new("secret-value");
        assert_eq!(format!("{:?}", token), "BearerToken(***)");
        assert_eq!(token.as_str(), "secret-value");
    }
}
