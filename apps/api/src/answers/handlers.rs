//! Axum route handlers for the Answers API.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::answers::pipeline::{self, GradingStatus, SubmitAnswerRequest, SubmittedAnswer};
use crate::auth::{ownership, AuthUser};
use crate::errors::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::models::interview::AnswerRow;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingStatusResponse {
    pub answer_id: Uuid,
    pub status: GradingStatus,
}

/// POST /api/v1/answers
///
/// Stores (or rewrites) the answer for a question. Returns 201 once the answer
/// is durable; `evaluation` is present only if grading finished inline.
pub async fn handle_submit_answer(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<SubmitAnswerRequest>,
) -> Result<(StatusCode, Json<SubmittedAnswer>), AppError> {
    let submitted = pipeline::submit_answer(&state, user.id, request).await?;
    Ok((StatusCode::CREATED, Json(submitted)))
}

/// GET /api/v1/answers/:id
pub async fn handle_get_answer(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<AnswerRow>, AppError> {
    let answer = ownership::answer(state.store.as_ref(), user.id, id)
        .await?
        .require("Answer", id)?;
    Ok(Json(answer))
}

/// GET /api/v1/answers/:id/grading-status
pub async fn handle_grading_status(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<GradingStatusResponse>, AppError> {
    let answer = ownership::answer(state.store.as_ref(), user.id, id)
        .await?
        .require("Answer", id)?;
    let status = pipeline::grading_status(state.store.as_ref(), &answer).await?;
    Ok(Json(GradingStatusResponse {
        answer_id: id,
        status,
    }))
}
