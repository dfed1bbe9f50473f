//! Entity Store: typed persistence for users, documents, interviews,
//! questions, answers, ratings and grading dead letters.
//!
//! No business rules live here. Every lookup by id returns `Ok(None)` when the
//! row does not exist; callers decide whether absence is a 404 or a legitimate
//! "not graded yet" state.
//!
//! `AppState` holds an `Arc<dyn EntityStore>`. Production uses `PgEntityStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::document::{DocumentKind, DocumentRow};
use crate::models::interview::{AnswerRow, InterviewRow, QuestionRow};
use crate::models::rating::{GradingFailureRow, RatingRow};
use crate::models::user::UserRow;

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgEntityStore;

// ────────────────────────────────────────────────────────────────────────────
// Write models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub user_id: Uuid,
    pub kind: DocumentKind,
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct NewInterview {
    pub user_id: Uuid,
    pub job_title: String,
    pub job_grade: String,
    pub framework: String,
    pub competencies: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub competency: String,
    pub text: String,
    pub difficulty: String,
}

#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub interview_id: Uuid,
    pub question_id: Uuid,
    pub text: String,
    pub time_spent: i32,
}

#[derive(Debug, Clone)]
pub struct NewRating {
    pub answer_id: Uuid,
    pub overall_score: f64,
    pub competency_scores: Value,
    pub star_analysis: Value,
    pub feedback: String,
    pub strengths: Vec<String>,
    pub improvement_areas: Vec<String>,
    pub improved_text: String,
}

/// Partial update for a rating; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct RatingPatch {
    pub overall_score: Option<f64>,
    pub feedback: Option<String>,
    pub strengths: Option<Vec<String>>,
    pub improvement_areas: Option<Vec<String>>,
    pub improved_text: Option<String>,
}

/// Result of the atomic interview-start unit.
#[derive(Debug, Clone)]
pub enum StartOutcome {
    Started {
        interview: InterviewRow,
        questions: Vec<QuestionRow>,
        /// The interview this one replaced as the user's active session.
        superseded: Option<Uuid>,
    },
    /// The starter allowance was consumed by a concurrent start; nothing was written.
    StarterQuotaExhausted,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait EntityStore: Send + Sync {
    // Users
    async fn get_user(&self, id: Uuid) -> Result<Option<UserRow>, AppError>;

    // Documents
    async fn insert_document(&self, doc: NewDocument) -> Result<DocumentRow, AppError>;
    async fn get_document(&self, id: Uuid) -> Result<Option<DocumentRow>, AppError>;
    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<DocumentRow>, AppError>;
    /// Most recently uploaded document of `kind` that has an analysis.
    async fn latest_analyzed_document(
        &self,
        user_id: Uuid,
        kind: DocumentKind,
    ) -> Result<Option<DocumentRow>, AppError>;
    /// Most recently uploaded document of `kind`, analyzed or not.
    async fn latest_document(
        &self,
        user_id: Uuid,
        kind: DocumentKind,
    ) -> Result<Option<DocumentRow>, AppError>;
    async fn set_document_analysis(
        &self,
        id: Uuid,
        analysis: Value,
    ) -> Result<Option<DocumentRow>, AppError>;
    async fn delete_document(&self, id: Uuid) -> Result<bool, AppError>;

    // Interviews
    async fn get_interview(&self, id: Uuid) -> Result<Option<InterviewRow>, AppError>;
    async fn list_interviews(&self, user_id: Uuid) -> Result<Vec<InterviewRow>, AppError>;
    async fn active_interview(&self, user_id: Uuid) -> Result<Option<InterviewRow>, AppError>;
    /// One atomic unit: consume one starter interview when `starter_limit` is set
    /// (failing if the user is already at the limit), supersede the user's active
    /// interview, insert the interview and its questions.
    async fn start_interview(
        &self,
        interview: NewInterview,
        questions: Vec<NewQuestion>,
        starter_limit: Option<i32>,
    ) -> Result<StartOutcome, AppError>;
    async fn set_question_index(
        &self,
        id: Uuid,
        index: i32,
    ) -> Result<Option<InterviewRow>, AppError>;
    /// Marks an active interview superseded. Non-active interviews are returned unchanged.
    async fn supersede_interview(&self, id: Uuid) -> Result<Option<InterviewRow>, AppError>;
    /// Makes a non-completed interview the user's active one, superseding any other.
    async fn activate_interview(&self, id: Uuid) -> Result<Option<InterviewRow>, AppError>;
    async fn complete_interview(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<InterviewRow>, AppError>;
    /// Deletes ratings → answers → questions → interview as one unit.
    /// Returns whether the interview row itself was removed.
    async fn delete_interview(&self, id: Uuid) -> Result<bool, AppError>;

    // Questions
    async fn get_question(&self, id: Uuid) -> Result<Option<QuestionRow>, AppError>;
    async fn list_questions(&self, interview_id: Uuid) -> Result<Vec<QuestionRow>, AppError>;

    // Answers
    /// Inserts the answer or rewrites the existing answer for the same question in place.
    async fn upsert_answer(&self, answer: NewAnswer) -> Result<AnswerRow, AppError>;
    async fn get_answer(&self, id: Uuid) -> Result<Option<AnswerRow>, AppError>;
    async fn list_answers(&self, interview_id: Uuid) -> Result<Vec<AnswerRow>, AppError>;

    // Ratings
    async fn get_rating(&self, id: Uuid) -> Result<Option<RatingRow>, AppError>;
    async fn rating_for_answer(&self, answer_id: Uuid) -> Result<Option<RatingRow>, AppError>;
    /// Inserts only if the answer has no rating yet; `Ok(None)` on conflict.
    async fn insert_rating(&self, rating: NewRating) -> Result<Option<RatingRow>, AppError>;
    /// Inserts or replaces the answer's rating, but only while the answer is
    /// still at `answer_version` (its `updated_at` when it was graded).
    /// `Ok(None)` when the answer was resubmitted or deleted in the meantime.
    async fn upsert_rating(
        &self,
        rating: NewRating,
        answer_version: DateTime<Utc>,
    ) -> Result<Option<RatingRow>, AppError>;
    async fn update_rating(
        &self,
        id: Uuid,
        patch: RatingPatch,
    ) -> Result<Option<RatingRow>, AppError>;
    async fn delete_rating(&self, id: Uuid) -> Result<bool, AppError>;

    // Grading dead letters
    async fn record_grading_failure(
        &self,
        answer_id: Uuid,
        attempts: i32,
        last_error: &str,
    ) -> Result<(), AppError>;
    async fn grading_failure(&self, answer_id: Uuid)
        -> Result<Option<GradingFailureRow>, AppError>;
}
