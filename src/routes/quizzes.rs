use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::dto::attempt_dto::CourseQuizzesResponse;
use crate::middleware::auth::BearerToken;
use crate::AppState;

#[axum::debug_handler]
pub async fn list_course_quizzes(
    State(state): State<AppState>,
    Extension(token): Extension<BearerToken>,
    Path(course_id): Path<i64>,
) -> crate::error::Result<Json<CourseQuizzesResponse>> {
    match state
        .attempt_service
        .list_course_quizzes(&token, course_id)
        .await
    {
        Ok(listing) => Ok(Json(listing)),
        Err(e) => {
            tracing::warn!(course_id, "Failed to load course quizzes: {}", e);
            Err(e)
        }
    }
}
