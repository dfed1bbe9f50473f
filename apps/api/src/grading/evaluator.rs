//! Evaluator: grades one answer against its question and competency.
//!
//! `AppState` holds an `Arc<dyn Evaluator>`; production uses [`LlmEvaluator`].
//! Evaluator failures never fail an answer submission, they only leave the
//! rating missing until a retry succeeds.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grading::prompts::{EVALUATION_PROMPT_TEMPLATE, EVALUATION_ROLE};
use crate::llm_client::prompts::{json_system, EVIDENCE_INSTRUCTION, STAR_INSTRUCTION};
use crate::llm_client::{LlmClient, LlmError};
use crate::store::NewRating;

/// Scores are on a 0–10 scale.
pub const MAX_SCORE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRequest {
    pub question_text: String,
    pub answer_text: String,
    pub competency: String,
    pub cv_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarComponent {
    pub score: f64,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarAnalysis {
    pub situation: StarComponent,
    pub task: StarComponent,
    pub action: StarComponent,
    pub result: StarComponent,
}

impl StarAnalysis {
    fn components(&self) -> [(&'static str, &StarComponent); 4] {
        [
            ("situation", &self.situation),
            ("task", &self.task),
            ("action", &self.action),
            ("result", &self.result),
        ]
    }
}

/// Structured feedback returned by the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub overall_score: f64,
    pub competency_scores: BTreeMap<String, f64>,
    pub star_analysis: StarAnalysis,
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvement_areas: Vec<String>,
    #[serde(default)]
    pub improved_text: String,
}

impl Evaluation {
    /// Rejects payloads that parsed but cannot be trusted as a grade.
    pub fn validate(&self) -> Result<(), EvaluationError> {
        check_score("overallScore", self.overall_score)?;
        for (competency, score) in &self.competency_scores {
            check_score(competency, *score)?;
        }
        for (name, component) in self.star_analysis.components() {
            check_score(name, component.score)?;
        }
        if self.feedback.trim().is_empty() {
            return Err(EvaluationError::Malformed("feedback is empty".to_string()));
        }
        Ok(())
    }
}

fn check_score(field: &str, score: f64) -> Result<(), EvaluationError> {
    if score.is_finite() && (0.0..=MAX_SCORE).contains(&score) {
        Ok(())
    } else {
        Err(EvaluationError::Malformed(format!(
            "{field} score {score} outside 0-{MAX_SCORE}"
        )))
    }
}

impl NewRating {
    pub fn from_evaluation(answer_id: uuid::Uuid, evaluation: &Evaluation) -> Self {
        NewRating {
            answer_id,
            overall_score: evaluation.overall_score,
            competency_scores: serde_json::to_value(&evaluation.competency_scores)
                .unwrap_or_default(),
            star_analysis: serde_json::to_value(&evaluation.star_analysis).unwrap_or_default(),
            feedback: evaluation.feedback.clone(),
            strengths: evaluation.strengths.clone(),
            improvement_areas: evaluation.improvement_areas.clone(),
            improved_text: evaluation.improved_text.clone(),
        }
    }
}

/// Why an evaluation is missing. Logged, never returned to the submitting client.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("evaluator upstream unavailable: {0}")]
    Unavailable(String),

    #[error("malformed evaluation: {0}")]
    Malformed(String),

    #[error("evaluator timed out after {0:?}")]
    TimedOut(Duration),
}

impl From<LlmError> for EvaluationError {
    fn from(e: LlmError) -> Self {
        if e.is_upstream_unavailable() {
            EvaluationError::Unavailable(e.to_string())
        } else {
            EvaluationError::Malformed(e.to_string())
        }
    }
}

#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<Evaluation, EvaluationError>;
}

/// Runs the evaluator with an upper bound on how long the caller waits.
pub async fn evaluate_within(
    evaluator: &dyn Evaluator,
    request: &EvaluationRequest,
    limit: Duration,
) -> Result<Evaluation, EvaluationError> {
    match tokio::time::timeout(limit, evaluator.evaluate(request)).await {
        Ok(result) => result,
        Err(_) => Err(EvaluationError::TimedOut(limit)),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LlmEvaluator
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmEvaluator {
    llm: LlmClient,
    system: String,
}

impl LlmEvaluator {
    pub fn new(llm: LlmClient) -> Self {
        Self {
            llm,
            system: json_system(EVALUATION_ROLE),
        }
    }
}

#[async_trait]
impl Evaluator for LlmEvaluator {
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<Evaluation, EvaluationError> {
        let prompt = build_evaluation_prompt(request);
        let evaluation: Evaluation = self.llm.call_json(&prompt, &self.system).await?;
        evaluation.validate()?;
        Ok(evaluation)
    }
}

fn build_evaluation_prompt(request: &EvaluationRequest) -> String {
    let cv_context = request
        .cv_context
        .as_deref()
        .unwrap_or("No CV context available.");

    EVALUATION_PROMPT_TEMPLATE
        .replace("{evidence_instruction}", EVIDENCE_INSTRUCTION)
        .replace("{star_instruction}", STAR_INSTRUCTION)
        .replace("{competency}", &request.competency)
        .replace("{question_text}", &request.question_text)
        .replace("{cv_context}", cv_context)
        .replace("{answer_text}", &request.answer_text)
}
