use std::sync::Arc;

use crate::config::GradingSettings;
use crate::grading::evaluator::Evaluator;
use crate::grading::queue::GradingQueue;
use crate::interviews::generator::QuestionGenerator;
use crate::store::EntityStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Default: PgEntityStore. Tests use the in-memory store.
    pub store: Arc<dyn EntityStore>,
    /// Default: LlmEvaluator.
    pub evaluator: Arc<dyn Evaluator>,
    /// Default: LlmQuestionGenerator.
    pub generator: Arc<dyn QuestionGenerator>,
    /// Redis list when REDIS_URL is set, in-process channel otherwise.
    pub grading_queue: Arc<dyn GradingQueue>,
    pub grading: GradingSettings,
}
