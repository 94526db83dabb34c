pub mod attempts;
pub mod health;
pub mod quizzes;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{auth::require_bearer_token, cors::quiz_cors, rate_limit};
use crate::AppState;

pub fn router(state: AppState, public_rps: u32) -> Router {
    let base_routes = Router::new().route("/health", get(health::health));

    let quiz_api = Router::new()
        .route(
            "/api/courses/:course_id/quizzes",
            get(quizzes::list_course_quizzes),
        )
        .route("/api/attempts", post(attempts::start_attempt))
        .route(
            "/api/attempts/:id",
            get(attempts::get_attempt).delete(attempts::close_attempt),
        )
        .route("/api/attempts/:id/select", post(attempts::select_option))
        .route("/api/attempts/:id/next", post(attempts::go_to_next))
        .route("/api/attempts/:id/previous", post(attempts::go_to_previous))
        .route("/api/attempts/:id/jump", post(attempts::jump_to))
        .route("/api/attempts/:id/submit", post(attempts::submit_attempt))
        .route("/api/attempts/:id/retry", post(attempts::retry_attempt))
        .layer(axum::middleware::from_fn(require_bearer_token))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(public_rps),
            rate_limit::rps_middleware,
        ));

    base_routes
        .merge(quiz_api)
        .with_state(state)
        .layer(quiz_cors())
        .layer(TraceLayer::new_for_http())
}
