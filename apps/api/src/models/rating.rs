use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Persisted evaluator feedback for one answer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RatingRow {
    pub id: Uuid,
    pub answer_id: Uuid,
    pub overall_score: f64,
    /// `{ "<competency>": score }`
    pub competency_scores: Value,
    /// Situation / task / action / result breakdown.
    pub star_analysis: Value,
    pub feedback: String,
    pub strengths: Vec<String>,
    pub improvement_areas: Vec<String>,
    pub improved_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dead-letter record for an answer whose grading exhausted its retries.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GradingFailureRow {
    pub answer_id: Uuid,
    pub attempts: i32,
    pub last_error: String,
    pub failed_at: DateTime<Utc>,
}
