//! Axum route handlers for the Interviews API.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{ownership, AuthUser};
use crate::errors::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::interviews::lifecycle::{self, StartInterviewRequest};
use crate::models::interview::{AnswerRow, InterviewResponse, QuestionRow};
use crate::routes::DeletedResponse;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInterviewRequest {
    pub current_question_index: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct InterviewDetail {
    #[serde(flatten)]
    pub interview: InterviewResponse,
    pub questions: Vec<QuestionRow>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/interviews
///
/// Generates a question set and starts a new active interview, superseding
/// the previous one. 403 with a quota code when the tier does not allow it.
pub async fn handle_start_interview(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<StartInterviewRequest>,
) -> Result<(StatusCode, Json<InterviewDetail>), AppError> {
    let started = lifecycle::start(
        state.store.as_ref(),
        state.generator.as_ref(),
        user.id,
        request,
        Utc::now(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(InterviewDetail {
            interview: started.interview.into(),
            questions: started.questions,
        }),
    ))
}

/// GET /api/v1/interviews
pub async fn handle_list_interviews(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<InterviewResponse>>, AppError> {
    let rows = state.store.list_interviews(user.id).await?;
    Ok(Json(rows.into_iter().map(InterviewResponse::from).collect()))
}

/// GET /api/v1/interviews/active
///
/// 404 when the user has no active session.
pub async fn handle_get_active_interview(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<InterviewDetail>, AppError> {
    let interview = state
        .store
        .active_interview(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("No active interview".to_string()))?;
    let questions = state.store.list_questions(interview.id).await?;
    Ok(Json(InterviewDetail {
        interview: interview.into(),
        questions,
    }))
}

/// GET /api/v1/interviews/:id
pub async fn handle_get_interview(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<InterviewDetail>, AppError> {
    let interview = ownership::interview(state.store.as_ref(), user.id, id)
        .await?
        .require("Interview", id)?;
    let questions = state.store.list_questions(id).await?;
    Ok(Json(InterviewDetail {
        interview: interview.into(),
        questions,
    }))
}

/// PATCH /api/v1/interviews/:id
///
/// Moves the question pointer and/or changes which interview is active.
pub async fn handle_update_interview(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateInterviewRequest>,
) -> Result<Json<InterviewResponse>, AppError> {
    if request.current_question_index.is_none() && request.is_active.is_none() {
        return Err(AppError::Validation(
            "Provide currentQuestionIndex and/or isActive".to_string(),
        ));
    }

    let mut interview = ownership::interview(state.store.as_ref(), user.id, id)
        .await?
        .require("Interview", id)?;

    if let Some(index) = request.current_question_index {
        interview = lifecycle::advance(state.store.as_ref(), &interview, index).await?;
    }
    if let Some(active) = request.is_active {
        interview = lifecycle::set_active(state.store.as_ref(), &interview, active).await?;
    }

    Ok(Json(interview.into()))
}

/// DELETE /api/v1/interviews/:id
///
/// Removes the interview with its questions, answers and ratings.
pub async fn handle_delete_interview(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DeletedResponse>, AppError> {
    let interview = ownership::interview(state.store.as_ref(), user.id, id)
        .await?
        .require("Interview", id)?;
    lifecycle::delete(state.store.as_ref(), &interview).await?;
    Ok(Json(DeletedResponse { id, deleted: true }))
}

/// POST /api/v1/interviews/:id/complete
pub async fn handle_complete_interview(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<InterviewResponse>, AppError> {
    let interview = ownership::interview(state.store.as_ref(), user.id, id)
        .await?
        .require("Interview", id)?;
    let completed = lifecycle::complete(state.store.as_ref(), &interview, Utc::now()).await?;
    Ok(Json(completed.into()))
}

/// GET /api/v1/interviews/:id/questions
pub async fn handle_list_questions(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<QuestionRow>>, AppError> {
    ownership::interview(state.store.as_ref(), user.id, id)
        .await?
        .require("Interview", id)?;
    Ok(Json(state.store.list_questions(id).await?))
}

/// GET /api/v1/interviews/:id/answers
pub async fn handle_list_answers(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<AnswerRow>>, AppError> {
    ownership::interview(state.store.as_ref(), user.id, id)
        .await?
        .require("Interview", id)?;
    Ok(Json(state.store.list_answers(id).await?))
}

/// GET /api/v1/questions/:id
pub async fn handle_get_question(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<QuestionRow>, AppError> {
    let question = ownership::question(state.store.as_ref(), user.id, id)
        .await?
        .require("Question", id)?;
    Ok(Json(question))
}
