//! Answer Submission Pipeline.
//!
//! ownership → question/interview check → atomic upsert → bounded inline
//! grading. The answer is durable before the evaluator is called; anything
//! that goes wrong afterwards only leaves the rating pending and hands the
//! answer to the grading queue.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::ownership;
use crate::errors::AppError;
use crate::grading::evaluator::{evaluate_within, Evaluation};
use crate::grading::queue::GradingJob;
use crate::grading::{evaluation_request, persist_rating, RatingWrite};
use crate::models::interview::{AnswerRow, QuestionRow};
use crate::state::AppState;
use crate::store::{EntityStore, NewAnswer};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    pub interview_id: Uuid,
    pub question_id: Uuid,
    pub answer_text: String,
    /// Seconds.
    pub time_spent: i32,
}

/// The stored answer, plus the evaluation when grading finished inline.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedAnswer {
    #[serde(flatten)]
    pub answer: AnswerRow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingStatus {
    Graded,
    Pending,
    Failed,
}

pub async fn submit_answer(
    state: &AppState,
    user_id: Uuid,
    request: SubmitAnswerRequest,
) -> Result<SubmittedAnswer, AppError> {
    if request.answer_text.trim().is_empty() {
        return Err(AppError::Validation("answerText cannot be empty".to_string()));
    }
    if request.time_spent < 0 {
        return Err(AppError::Validation(
            "timeSpent must be zero or more seconds".to_string(),
        ));
    }

    let store = state.store.as_ref();
    let interview = ownership::interview(store, user_id, request.interview_id)
        .await?
        .require("Interview", request.interview_id)?;
    let question = store
        .get_question(request.question_id)
        .await?
        .filter(|q| q.interview_id == interview.id)
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Question {} does not belong to interview {}",
                request.question_id, interview.id
            ))
        })?;

    let answer = store
        .upsert_answer(NewAnswer {
            interview_id: interview.id,
            question_id: question.id,
            text: request.answer_text,
            time_spent: request.time_spent,
        })
        .await?;
    info!(
        "Stored answer {} for question {} of interview {}",
        answer.id, question.id, interview.id
    );

    let evaluation = match grade_inline(state, user_id, &question, &answer).await {
        InlineGrade::Graded(evaluation) => Some(evaluation),
        // A newer submission of this answer owns the grading now.
        InlineGrade::Superseded => None,
        InlineGrade::Pending => {
            hand_off(state, &answer).await;
            None
        }
    };

    Ok(SubmittedAnswer { answer, evaluation })
}

enum InlineGrade {
    /// Evaluated and stored.
    Graded(Evaluation),
    Superseded,
    /// Not graded inline; the workers take over.
    Pending,
}

async fn grade_inline(
    state: &AppState,
    user_id: Uuid,
    question: &QuestionRow,
    answer: &AnswerRow,
) -> InlineGrade {
    let limit = state.grading.inline_timeout;
    if limit.is_zero() {
        return InlineGrade::Pending;
    }

    let store = state.store.as_ref();
    let request = match evaluation_request(store, user_id, question, answer).await {
        Ok(request) => request,
        Err(e) => {
            error!("Could not build evaluation request for answer {}: {e}", answer.id);
            return InlineGrade::Pending;
        }
    };

    match evaluate_within(state.evaluator.as_ref(), &request, limit).await {
        Ok(evaluation) => match persist_rating(store, answer, &evaluation).await {
            RatingWrite::Stored(_) => InlineGrade::Graded(evaluation),
            RatingWrite::Stale => InlineGrade::Superseded,
            RatingWrite::Failed => InlineGrade::Pending,
        },
        Err(e) => {
            warn!("Inline grading of answer {} did not finish: {e}", answer.id);
            InlineGrade::Pending
        }
    }
}

async fn hand_off(state: &AppState, answer: &AnswerRow) {
    let job = GradingJob::first(answer.id, answer.updated_at);
    match state.grading_queue.enqueue(job).await {
        Ok(()) => info!("Answer {} queued for background grading", answer.id),
        Err(e) => error!("Could not queue answer {} for grading: {e}", answer.id),
    }
}

/// A rating or dead letter only counts if it is at least as new as the answer text.
pub async fn grading_status(
    store: &dyn EntityStore,
    answer: &AnswerRow,
) -> Result<GradingStatus, AppError> {
    if let Some(rating) = store.rating_for_answer(answer.id).await? {
        if rating.updated_at >= answer.updated_at {
            return Ok(GradingStatus::Graded);
        }
    }
    if let Some(failure) = store.grading_failure(answer.id).await? {
        if failure.failed_at >= answer.updated_at {
            return Ok(GradingStatus::Failed);
        }
    }
    Ok(GradingStatus::Pending)
}
