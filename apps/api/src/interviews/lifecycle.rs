//! Interview Lifecycle Manager: start, advance, activate, complete and delete.
//!
//! Start pipeline: validate → quota (fail fast) → CV/job spec lookup →
//! generate questions → atomic store start (quota re-checked under lock).
//! Handlers run the ownership check before calling anything here except `start`.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interviews::frameworks::Framework;
use crate::interviews::generator::{GenerationRequest, QuestionGenerator};
use crate::models::document::DocumentKind;
use crate::models::interview::{InterviewRow, InterviewStatus, QuestionRow};
use crate::quota::{self, QuotaReason};
use crate::store::{EntityStore, NewInterview, StartOutcome};

pub const MAX_QUESTIONS: i32 = 20;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartInterviewRequest {
    pub total_questions: i32,
    pub job_title: String,
    pub job_grade: String,
    pub framework: String,
    #[serde(default)]
    pub competency_focus: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct StartedInterview {
    pub interview: InterviewRow,
    pub questions: Vec<QuestionRow>,
}

pub async fn start(
    store: &dyn EntityStore,
    generator: &dyn QuestionGenerator,
    user_id: Uuid,
    request: StartInterviewRequest,
    now: DateTime<Utc>,
) -> Result<StartedInterview, AppError> {
    let framework = validate_start(&request)?;

    let user = store
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;
    let decision = quota::evaluate(&user, now);
    if let Some(reason) = decision.reason {
        info!("Interview start refused for user {user_id}: {}", reason.code());
        return Err(AppError::QuotaExceeded(reason));
    }

    let cv_analysis = store
        .latest_analyzed_document(user_id, DocumentKind::Cv)
        .await?
        .and_then(|doc| doc.analysis)
        .ok_or_else(|| {
            AppError::Validation(
                "Upload and analyze a CV before starting an interview".to_string(),
            )
        })?;
    let job_spec = store
        .latest_document(user_id, DocumentKind::JobSpec)
        .await?
        .map(|doc| match doc.analysis {
            Some(analysis) => job_spec_text(&analysis),
            None => doc.content,
        });

    let competencies = framework.competencies(request.competency_focus.as_deref());
    let total = request.total_questions as usize;
    let generated = generator
        .generate_questions(&GenerationRequest {
            cv_analysis,
            job_spec,
            competencies: competencies.clone(),
            framework,
            job_title: request.job_title.trim().to_string(),
            job_grade: request.job_grade.trim().to_string(),
            total_questions: total,
        })
        .await?;
    let questions = generated.into_new_questions(total);
    if questions.is_empty() {
        return Err(AppError::Llm(
            "Question generation returned no usable questions".to_string(),
        ));
    }

    let outcome = store
        .start_interview(
            NewInterview {
                user_id,
                job_title: request.job_title.trim().to_string(),
                job_grade: request.job_grade.trim().to_string(),
                framework: framework.as_str().to_string(),
                competencies,
            },
            questions,
            decision.starter_limit(),
        )
        .await?;

    match outcome {
        StartOutcome::Started {
            interview,
            questions,
            superseded,
        } => {
            if let Some(previous) = superseded {
                info!("Interview {previous} superseded by {}", interview.id);
            }
            info!(
                "Started interview {} for user {user_id} ({} questions, tier {})",
                interview.id,
                questions.len(),
                decision.tier
            );
            Ok(StartedInterview {
                interview,
                questions,
            })
        }
        StartOutcome::StarterQuotaExhausted => {
            Err(AppError::QuotaExceeded(QuotaReason::StarterLimitReached))
        }
    }
}

fn validate_start(request: &StartInterviewRequest) -> Result<Framework, AppError> {
    if !(1..=MAX_QUESTIONS).contains(&request.total_questions) {
        return Err(AppError::Validation(format!(
            "totalQuestions must be between 1 and {MAX_QUESTIONS}"
        )));
    }
    if request.job_title.trim().is_empty() {
        return Err(AppError::Validation("jobTitle cannot be empty".to_string()));
    }
    if request.job_grade.trim().is_empty() {
        return Err(AppError::Validation("jobGrade cannot be empty".to_string()));
    }
    request.framework.parse().map_err(AppError::Validation)
}

fn job_spec_text(analysis: &Value) -> String {
    match analysis.get("summary").and_then(|v| v.as_str()) {
        Some(summary) => format!("{summary}\n{analysis}"),
        None => analysis.to_string(),
    }
}

/// Moves the question pointer. Out-of-range indices are rejected, not clamped.
pub async fn advance(
    store: &dyn EntityStore,
    interview: &InterviewRow,
    index: i32,
) -> Result<InterviewRow, AppError> {
    if !interview.accepts_index(index) {
        return Err(AppError::Validation(format!(
            "currentQuestionIndex must be between 0 and {}",
            interview.total_questions - 1
        )));
    }
    store
        .set_question_index(interview.id, index)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {} not found", interview.id)))
}

/// `true` makes the interview the user's active one; `false` supersedes it.
pub async fn set_active(
    store: &dyn EntityStore,
    interview: &InterviewRow,
    active: bool,
) -> Result<InterviewRow, AppError> {
    let updated = if active {
        if interview.status() == InterviewStatus::Completed {
            return Err(AppError::Validation(
                "A completed interview cannot be reactivated".to_string(),
            ));
        }
        store.activate_interview(interview.id).await?
    } else {
        store.supersede_interview(interview.id).await?
    };
    updated.ok_or_else(|| AppError::NotFound(format!("Interview {} not found", interview.id)))
}

/// Idempotent: completing twice keeps the first `completed_at`.
pub async fn complete(
    store: &dyn EntityStore,
    interview: &InterviewRow,
    now: DateTime<Utc>,
) -> Result<InterviewRow, AppError> {
    let row = store
        .complete_interview(interview.id, now)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {} not found", interview.id)))?;
    info!("Interview {} completed", row.id);
    Ok(row)
}

pub async fn delete(store: &dyn EntityStore, interview: &InterviewRow) -> Result<(), AppError> {
    if store.delete_interview(interview.id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(format!(
            "Interview {} not found",
            interview.id
        )))
    }
}
