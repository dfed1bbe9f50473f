//! Fixtures and stub collaborators shared by the unit and router tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::GradingSettings;
use crate::errors::AppError;
use crate::grading::evaluator::{
    Evaluation, EvaluationError, EvaluationRequest, Evaluator, StarAnalysis, StarComponent,
};
use crate::grading::queue::ChannelGradingQueue;
use crate::interviews::generator::{
    GeneratedQuestion, GeneratedQuestions, GenerationRequest, QuestionGenerator,
};
use crate::models::document::{DocumentKind, DocumentRow};
use crate::models::interview::{InterviewRow, QuestionRow};
use crate::models::user::UserRow;
use crate::state::AppState;
use crate::store::memory::MemoryEntityStore;
use crate::store::{EntityStore, NewDocument, NewInterview, NewQuestion, StartOutcome};

pub fn user_row(tier: &str, starter_used: i32) -> UserRow {
    let id = Uuid::new_v4();
    UserRow {
        id,
        email: format!("{id}@example.com"),
        subscription_tier: tier.to_string(),
        starter_interviews_used: starter_used,
        starter_expires_at: None,
        created_at: Utc::now(),
    }
}

fn star(score: f64, comment: &str) -> StarComponent {
    StarComponent {
        score,
        comment: comment.to_string(),
    }
}

pub fn sample_evaluation() -> Evaluation {
    Evaluation {
        overall_score: 6.5,
        competency_scores: BTreeMap::from([("Delivering at Pace".to_string(), 6.5)]),
        star_analysis: StarAnalysis {
            situation: star(7.0, "Context is clear"),
            task: star(6.5, "Responsibility stated"),
            action: star(7.0, "First-person actions"),
            result: star(6.0, "Outcome lacks a metric"),
        },
        feedback: "A well-structured answer. Quantify the result.".to_string(),
        strengths: vec!["Clear structure".to_string()],
        improvement_areas: vec!["Measurable outcome".to_string()],
        improved_text: "In 2023 I led...".to_string(),
    }
}

/// Inserts a CV for `user_id` and stores an analysis with a fixed summary.
pub async fn analyzed_cv(store: &MemoryEntityStore, user_id: Uuid) -> DocumentRow {
    let doc = store
        .insert_document(NewDocument {
            user_id,
            kind: DocumentKind::Cv,
            title: Some("CV".to_string()),
            content: "Delivery lead, ten years in central government.".to_string(),
        })
        .await
        .unwrap();
    store
        .set_document_analysis(doc.id, json!({"summary": "Experienced delivery lead."}))
        .await
        .unwrap()
        .unwrap()
}

/// Analyzed CV plus an active interview with `questions` questions.
pub async fn seed_interview(
    store: &MemoryEntityStore,
    user_id: Uuid,
    questions: usize,
) -> (InterviewRow, Vec<QuestionRow>) {
    analyzed_cv(store, user_id).await;
    let outcome = store
        .start_interview(
            NewInterview {
                user_id,
                job_title: "Delivery Manager".to_string(),
                job_grade: "G7".to_string(),
                framework: "civil_service".to_string(),
                competencies: vec!["Delivering at Pace".to_string()],
            },
            (0..questions)
                .map(|n| NewQuestion {
                    competency: "Delivering at Pace".to_string(),
                    text: format!("Question {n}: tell me about a tight deadline."),
                    difficulty: "medium".to_string(),
                })
                .collect(),
            None,
        )
        .await
        .unwrap();
    match outcome {
        StartOutcome::Started {
            interview,
            questions,
            ..
        } => (interview, questions),
        StartOutcome::StarterQuotaExhausted => panic!("seeding does not consume quota"),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stub collaborators
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum EvaluatorMode {
    Succeed,
    Unavailable,
    Malformed,
}

pub struct StubEvaluator {
    mode: EvaluatorMode,
    calls: AtomicUsize,
}

impl StubEvaluator {
    fn with_mode(mode: EvaluatorMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn succeeding() -> Self {
        Self::with_mode(EvaluatorMode::Succeed)
    }

    pub fn unavailable() -> Self {
        Self::with_mode(EvaluatorMode::Unavailable)
    }

    pub fn malformed() -> Self {
        Self::with_mode(EvaluatorMode::Malformed)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Evaluator for StubEvaluator {
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<Evaluation, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            EvaluatorMode::Succeed => {
                let mut evaluation = sample_evaluation();
                evaluation.competency_scores =
                    BTreeMap::from([(request.competency.clone(), evaluation.overall_score)]);
                Ok(evaluation)
            }
            EvaluatorMode::Unavailable => Err(EvaluationError::Unavailable(
                "529 overloaded".to_string(),
            )),
            EvaluatorMode::Malformed => Err(EvaluationError::Malformed(
                "expected value at line 1".to_string(),
            )),
        }
    }
}

/// Generates one question per requested slot, cycling through the competencies.
pub struct StubGenerator {
    empty: bool,
    calls: AtomicUsize,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl StubGenerator {
    pub fn new() -> Self {
        Self {
            empty: false,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn empty() -> Self {
        Self {
            empty: true,
            ..Self::new()
        }
    }

    pub fn generation_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuestionGenerator for StubGenerator {
    async fn analyze_document(&self, kind: DocumentKind, content: &str) -> Result<Value, AppError> {
        Ok(json!({
            "summary": format!("{} with {} characters", kind.as_str(), content.chars().count()),
        }))
    }

    async fn generate_questions(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedQuestions, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if self.empty {
            return Ok(GeneratedQuestions {
                questions: Vec::new(),
                total_questions: Some(0),
            });
        }
        let questions = request
            .competencies
            .iter()
            .cycle()
            .take(request.total_questions)
            .enumerate()
            .map(|(n, competency)| GeneratedQuestion {
                competency: competency.clone(),
                text: format!("Q{}: describe a time you showed {competency}.", n + 1),
                difficulty: "medium".to_string(),
            })
            .collect();
        Ok(GeneratedQuestions {
            questions,
            total_questions: Some(request.total_questions),
        })
    }
}

/// App state over the in-memory store with an in-process grading queue.
pub fn test_state(
    store: Arc<MemoryEntityStore>,
    evaluator: Arc<dyn Evaluator>,
    grading: GradingSettings,
) -> AppState {
    let store: Arc<dyn EntityStore> = store;
    AppState {
        store,
        evaluator,
        generator: Arc::new(StubGenerator::new()),
        grading_queue: Arc::new(ChannelGradingQueue::new()),
        grading,
    }
}
