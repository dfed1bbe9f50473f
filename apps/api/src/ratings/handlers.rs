//! Axum route handlers for the Ratings API.
//!
//! Every handler walks rating → answer → interview before touching the row.
//! Ratings are normally written by the grading path; the direct create here
//! refuses to overwrite one (409).

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::auth::{ownership, AuthUser};
use crate::errors::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::grading::evaluator::MAX_SCORE;
use crate::models::rating::RatingRow;
use crate::routes::DeletedResponse;
use crate::state::AppState;
use crate::store::{NewRating, RatingPatch};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRatingRequest {
    pub answer_id: Uuid,
    pub overall_score: f64,
    #[serde(default = "empty_object")]
    pub competency_scores: Value,
    #[serde(default = "empty_object")]
    pub star_analysis: Value,
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvement_areas: Vec<String>,
    #[serde(default)]
    pub improved_text: String,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRatingRequest {
    pub overall_score: Option<f64>,
    pub feedback: Option<String>,
    pub strengths: Option<Vec<String>>,
    pub improvement_areas: Option<Vec<String>>,
    pub improved_text: Option<String>,
}

fn validate_score(score: f64) -> Result<(), AppError> {
    if score.is_finite() && (0.0..=MAX_SCORE).contains(&score) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "overallScore must be between 0 and {MAX_SCORE}"
        )))
    }
}

/// POST /api/v1/ratings
pub async fn handle_create_rating(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<CreateRatingRequest>,
) -> Result<(StatusCode, Json<RatingRow>), AppError> {
    validate_score(request.overall_score)?;
    if request.feedback.trim().is_empty() {
        return Err(AppError::Validation("feedback cannot be empty".to_string()));
    }
    let answer = ownership::answer(state.store.as_ref(), user.id, request.answer_id)
        .await?
        .require("Answer", request.answer_id)?;

    let inserted = state
        .store
        .insert_rating(NewRating {
            answer_id: answer.id,
            overall_score: request.overall_score,
            competency_scores: request.competency_scores,
            star_analysis: request.star_analysis,
            feedback: request.feedback,
            strengths: request.strengths,
            improvement_areas: request.improvement_areas,
            improved_text: request.improved_text,
        })
        .await?
        .ok_or_else(|| AppError::Conflict(format!("Answer {} already has a rating", answer.id)))?;

    Ok((StatusCode::CREATED, Json(inserted)))
}

/// GET /api/v1/ratings/:id
pub async fn handle_get_rating(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<RatingRow>, AppError> {
    let rating = ownership::rating(state.store.as_ref(), user.id, id)
        .await?
        .require("Rating", id)?;
    Ok(Json(rating))
}

/// GET /api/v1/ratings/by-answer/:answer_id
///
/// 404 while the answer is ungraded: a missing rating is an expected state.
pub async fn handle_get_rating_by_answer(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(answer_id): ApiPath<Uuid>,
) -> Result<Json<RatingRow>, AppError> {
    ownership::answer(state.store.as_ref(), user.id, answer_id)
        .await?
        .require("Answer", answer_id)?;
    let rating = state
        .store
        .rating_for_answer(answer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No rating for answer {answer_id} yet")))?;
    Ok(Json(rating))
}

/// PATCH /api/v1/ratings/:id
pub async fn handle_update_rating(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateRatingRequest>,
) -> Result<Json<RatingRow>, AppError> {
    if let Some(score) = request.overall_score {
        validate_score(score)?;
    }
    ownership::rating(state.store.as_ref(), user.id, id)
        .await?
        .require("Rating", id)?;

    let patch = RatingPatch {
        overall_score: request.overall_score,
        feedback: request.feedback,
        strengths: request.strengths,
        improvement_areas: request.improvement_areas,
        improved_text: request.improved_text,
    };
    let updated = state
        .store
        .update_rating(id, patch)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Rating {id} not found")))?;
    Ok(Json(updated))
}

/// DELETE /api/v1/ratings/:id
pub async fn handle_delete_rating(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DeletedResponse>, AppError> {
    ownership::rating(state.store.as_ref(), user.id, id)
        .await?
        .require("Rating", id)?;
    if !state.store.delete_rating(id).await? {
        return Err(AppError::NotFound(format!("Rating {id} not found")));
    }
    info!("Rating {id} deleted by user {}", user.id);
    Ok(Json(DeletedResponse { id, deleted: true }))
}
