use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::attempt_dto::{
    AttemptStatus, AttemptView, JumpRequest, SelectOptionRequest, StartAttemptRequest,
};
use crate::error::{Error, Result};
use crate::middleware::auth::BearerToken;
use crate::AppState;

#[axum::debug_handler]
pub async fn start_attempt(
    State(state): State<AppState>,
    Extension(token): Extension<BearerToken>,
    Json(req): Json<StartAttemptRequest>,
) -> Result<Response> {
    req.validate()?;
    let session = state.attempt_service.start_attempt(token, req).await?;
    Ok((StatusCode::CREATED, Json(session.view().await)).into_response())
}

#[axum::debug_handler]
pub async fn get_attempt(
    State(state): State<AppState>,
    Extension(token): Extension<BearerToken>,
    Path(id): Path<Uuid>,
) -> Result<Json<AttemptView>> {
    let session = state.attempt_service.get(id, &token).await?;
    Ok(Json(session.view().await))
}

#[axum::debug_handler]
pub async fn select_option(
    State(state): State<AppState>,
    Extension(token): Extension<BearerToken>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectOptionRequest>,
) -> Result<Json<AttemptView>> {
    req.validate()?;
    let session = state.attempt_service.get(id, &token).await?;
    Ok(Json(session.select_option(&req.option).await?))
}

#[axum::debug_handler]
pub async fn go_to_next(
    State(state): State<AppState>,
    Extension(token): Extension<BearerToken>,
    Path(id): Path<Uuid>,
) -> Result<Json<AttemptView>> {
    let session = state.attempt_service.get(id, &token).await?;
    Ok(Json(session.go_to_next().await?))
}

#[axum::debug_handler]
pub async fn go_to_previous(
    State(state): State<AppState>,
    Extension(token): Extension<BearerToken>,
    Path(id): Path<Uuid>,
) -> Result<Json<AttemptView>> {
    let session = state.attempt_service.get(id, &token).await?;
    Ok(Json(session.go_to_previous().await?))
}

#[axum::debug_handler]
pub async fn jump_to(
    State(state): State<AppState>,
    Extension(token): Extension<BearerToken>,
    Path(id): Path<Uuid>,
    Json(req): Json<JumpRequest>,
) -> Result<Json<AttemptView>> {
    let session = state.attempt_service.get(id, &token).await?;
    Ok(Json(session.jump_to(req.index).await?))
}

/// Manual submission requires an answer on the question being shown.
#[axum::debug_handler]
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(token): Extension<BearerToken>,
    Path(id): Path<Uuid>,
) -> Result<Json<AttemptView>> {
    let session = state.attempt_service.get(id, &token).await?;
    let current = session.view().await;
    if current.status == AttemptStatus::InProgress && current.selected_option.is_none() {
        return Err(Error::BadRequest(
            "Select an answer for the current question before submitting".to_string(),
        ));
    }
    match session.submit().await {
        Ok(view) => Ok(Json(view)),
        Err(e) => {
            tracing::error!(attempt_id = %id, "Failed to submit quiz: {}", e);
            Err(e)
        }
    }
}

#[axum::debug_handler]
pub async fn retry_attempt(
    State(state): State<AppState>,
    Extension(token): Extension<BearerToken>,
    Path(id): Path<Uuid>,
) -> Result<Json<AttemptView>> {
    let session = state.attempt_service.get(id, &token).await?;
    Ok(Json(session.retry().await?))
}

#[axum::debug_handler]
pub async fn close_attempt(
    State(state): State<AppState>,
    Extension(token): Extension<BearerToken>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.attempt_service.close(id, &token).await?;
    Ok(StatusCode::NO_CONTENT)
}
