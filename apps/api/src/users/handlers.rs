//! Axum route handlers for the current user.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::user::SubscriptionTier;
use crate::quota::{self, QuotaReason};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub tier: SubscriptionTier,
    pub can_create_interview: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<QuotaReason>,
    pub starter_interviews_used: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starter_expires_at: Option<DateTime<Utc>>,
}

/// GET /api/v1/me/subscription
///
/// The quota decision the next `POST /interviews` would get, for rendering
/// upgrade prompts ahead of time.
pub async fn handle_get_subscription(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let row = state
        .store
        .get_user(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.id)))?;
    let decision = quota::evaluate(&row, Utc::now());

    Ok(Json(SubscriptionResponse {
        tier: decision.tier,
        can_create_interview: decision.allows_new_interview(),
        reason: decision.reason,
        starter_interviews_used: row.starter_interviews_used,
        starter_expires_at: row.starter_expires_at,
    }))
}
