// Answer grading: the evaluator contract, the hand-off queue and the
// background workers. Shared by the inline submission path and the workers.

pub mod evaluator;
pub mod prompts;
pub mod queue;
pub mod worker;

use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::grading::evaluator::{Evaluation, EvaluationRequest};
use crate::models::document::DocumentKind;
use crate::models::interview::{AnswerRow, QuestionRow};
use crate::models::rating::RatingRow;
use crate::store::{EntityStore, NewRating};

/// CV context handed to the evaluator is capped so a long CV cannot crowd out the answer.
const MAX_CV_CONTEXT_CHARS: usize = 4000;

/// Builds the evaluator input for an answer whose question is already loaded.
pub async fn evaluation_request(
    store: &dyn EntityStore,
    user_id: Uuid,
    question: &QuestionRow,
    answer: &AnswerRow,
) -> Result<EvaluationRequest, AppError> {
    let cv_context = store
        .latest_analyzed_document(user_id, DocumentKind::Cv)
        .await?
        .and_then(|doc| doc.analysis)
        .map(|analysis| cv_context_from_analysis(&analysis));

    Ok(EvaluationRequest {
        question_text: question.text.clone(),
        answer_text: answer.text.clone(),
        competency: question.competency.clone(),
        cv_context,
    })
}

/// Loads the question behind `answer` and builds the evaluator input.
/// `Ok(None)` when the question is gone (interview deleted mid-flight).
pub async fn evaluation_request_for_answer(
    store: &dyn EntityStore,
    answer: &AnswerRow,
) -> Result<Option<EvaluationRequest>, AppError> {
    let Some(question) = store.get_question(answer.question_id).await? else {
        return Ok(None);
    };
    evaluation_request(store, question.user_id, &question, answer)
        .await
        .map(Some)
}

/// Result of writing an evaluation back to the store.
#[derive(Debug)]
pub enum RatingWrite {
    Stored(RatingRow),
    /// The answer was resubmitted or deleted while it was being graded.
    Stale,
    Failed,
}

/// Stores the rating for the graded version of `answer`, replacing any
/// earlier one. Failures are logged and swallowed: the answer is already durable.
pub async fn persist_rating(
    store: &dyn EntityStore,
    answer: &AnswerRow,
    evaluation: &Evaluation,
) -> RatingWrite {
    match store
        .upsert_rating(NewRating::from_evaluation(answer.id, evaluation), answer.updated_at)
        .await
    {
        Ok(Some(rating)) => {
            info!(
                "Stored rating {} for answer {} (overall {:.1})",
                rating.id, answer.id, rating.overall_score
            );
            RatingWrite::Stored(rating)
        }
        Ok(None) => {
            info!("Discarded evaluation of an outdated version of answer {}", answer.id);
            RatingWrite::Stale
        }
        Err(e) => {
            error!("Failed to store rating for answer {}: {e}", answer.id);
            RatingWrite::Failed
        }
    }
}

/// Flattens a CV analysis into prompt text: the `summary` field when present,
/// the whole analysis as JSON otherwise.
pub fn cv_context_from_analysis(analysis: &Value) -> String {
    let text = match analysis.get("summary").and_then(|v| v.as_str()) {
        Some(summary) => summary.to_string(),
        None => analysis.to_string(),
    };
    truncate_chars(&text, MAX_CV_CONTEXT_CHARS)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}
