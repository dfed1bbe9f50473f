use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Persisted session state. A deleted interview has no row at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    /// The user's current session. At most one per user.
    Active,
    /// Replaced by a newer session or abandoned by the user.
    Superseded,
    /// Explicitly finished by the user; `completed_at` is set.
    Completed,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Active => "active",
            InterviewStatus::Superseded => "superseded",
            InterviewStatus::Completed => "completed",
        }
    }
}

impl FromStr for InterviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(InterviewStatus::Active),
            "superseded" => Ok(InterviewStatus::Superseded),
            "completed" => Ok(InterviewStatus::Completed),
            other => Err(format!("unknown interview status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_title: String,
    pub job_grade: String,
    pub framework: String,
    pub competencies: Vec<String>,
    pub total_questions: i32,
    pub current_question_index: i32,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl InterviewRow {
    pub fn status(&self) -> InterviewStatus {
        // The column carries a CHECK constraint; anything else is treated as inert.
        self.status.parse().unwrap_or(InterviewStatus::Superseded)
    }

    pub fn is_active(&self) -> bool {
        self.status() == InterviewStatus::Active
    }

    /// Whether `index` addresses one of this interview's questions.
    pub fn accepts_index(&self, index: i32) -> bool {
        index >= 0 && index < self.total_questions
    }
}

/// Client-facing view of an interview with the derived `isActive` flag.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_title: String,
    pub job_grade: String,
    pub framework: String,
    pub competencies: Vec<String>,
    pub total_questions: i32,
    pub current_question_index: i32,
    pub status: InterviewStatus,
    pub is_active: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<InterviewRow> for InterviewResponse {
    fn from(row: InterviewRow) -> Self {
        let status = row.status();
        Self {
            id: row.id,
            user_id: row.user_id,
            job_title: row.job_title,
            job_grade: row.job_grade,
            framework: row.framework,
            competencies: row.competencies,
            total_questions: row.total_questions,
            current_question_index: row.current_question_index,
            status,
            is_active: status == InterviewStatus::Active,
            started_at: row.started_at,
            completed_at: row.completed_at,
        }
    }
}

/// A generated question. Immutable once written; removed only with its interview.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRow {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub user_id: Uuid,
    pub position: i32,
    pub competency: String,
    pub text: String,
    pub difficulty: String,
    pub created_at: DateTime<Utc>,
}

/// The candidate's answer to one question. One row per question, rewritten on resubmission.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRow {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub question_id: Uuid,
    pub text: String,
    /// Seconds spent composing the answer, as reported by the client.
    pub time_spent: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
