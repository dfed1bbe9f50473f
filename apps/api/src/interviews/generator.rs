//! Question Generator: document analysis and tailored question sets.
//!
//! `AppState` holds an `Arc<dyn QuestionGenerator>`; production uses
//! [`LlmQuestionGenerator`]. Unlike grading, generation failures fail the
//! request: there is nothing durable to keep.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::errors::AppError;
use crate::interviews::frameworks::Framework;
use crate::interviews::prompts::{
    ANALYSIS_ROLE, CV_ANALYSIS_PROMPT_TEMPLATE, GENERATION_ROLE,
    JOB_SPEC_ANALYSIS_PROMPT_TEMPLATE, QUESTION_PROMPT_TEMPLATE,
};
use crate::llm_client::prompts::{json_system, EVIDENCE_INSTRUCTION, STAR_INSTRUCTION};
use crate::llm_client::LlmClient;
use crate::models::document::DocumentKind;
use crate::store::NewQuestion;

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub cv_analysis: Value,
    /// Analysis of the latest job spec, or its raw text when not yet analyzed.
    pub job_spec: Option<String>,
    pub competencies: Vec<String>,
    pub framework: Framework,
    pub job_title: String,
    pub job_grade: String,
    pub total_questions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub competency: String,
    pub text: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
}

fn default_difficulty() -> String {
    "medium".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestions {
    pub questions: Vec<GeneratedQuestion>,
    #[serde(default)]
    pub total_questions: Option<usize>,
}

impl GeneratedQuestions {
    /// How many questions short of `requested` the batch is. A stated
    /// `totalQuestions` below the number of questions present counts.
    pub fn shortfall(&self, requested: usize) -> Option<usize> {
        let delivered = self
            .total_questions
            .unwrap_or(self.questions.len())
            .min(self.questions.len());
        (delivered < requested).then(|| requested - delivered)
    }

    /// Keeps at most `limit` questions with non-empty text.
    pub fn into_new_questions(self, limit: usize) -> Vec<NewQuestion> {
        self.questions
            .into_iter()
            .filter(|q| !q.text.trim().is_empty())
            .take(limit)
            .map(|q| NewQuestion {
                competency: q.competency.trim().to_string(),
                text: q.text.trim().to_string(),
                difficulty: q.difficulty,
            })
            .collect()
    }
}

#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn analyze_document(&self, kind: DocumentKind, content: &str) -> Result<Value, AppError>;

    async fn generate_questions(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedQuestions, AppError>;
}

pub struct LlmQuestionGenerator {
    llm: LlmClient,
}

impl LlmQuestionGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl QuestionGenerator for LlmQuestionGenerator {
    async fn analyze_document(&self, kind: DocumentKind, content: &str) -> Result<Value, AppError> {
        let template = match kind {
            DocumentKind::Cv => CV_ANALYSIS_PROMPT_TEMPLATE,
            DocumentKind::JobSpec => JOB_SPEC_ANALYSIS_PROMPT_TEMPLATE,
        };
        let prompt = template.replace("{content}", content);
        self.llm
            .call_json::<Value>(&prompt, &json_system(ANALYSIS_ROLE))
            .await
            .map_err(|e| AppError::Llm(format!("{} analysis failed: {e}", kind.as_str())))
    }

    async fn generate_questions(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedQuestions, AppError> {
        let prompt = build_question_prompt(request);
        let generated = self
            .llm
            .call_json::<GeneratedQuestions>(&prompt, &json_system(GENERATION_ROLE))
            .await
            .map_err(|e| AppError::Llm(format!("Question generation failed: {e}")))?;
        if let Some(shortfall) = generated.shortfall(request.total_questions) {
            warn!(
                "Generator returned {} of {} requested questions",
                request.total_questions - shortfall,
                request.total_questions
            );
        }
        Ok(generated)
    }
}

fn build_question_prompt(request: &GenerationRequest) -> String {
    QUESTION_PROMPT_TEMPLATE
        .replace("{evidence_instruction}", EVIDENCE_INSTRUCTION)
        .replace("{star_instruction}", STAR_INSTRUCTION)
        .replace("{total_questions}", &request.total_questions.to_string())
        .replace("{job_title}", &request.job_title)
        .replace("{job_grade}", &request.job_grade)
        .replace("{framework}", request.framework.as_str())
        .replace("{competencies}", &request.competencies.join(", "))
        .replace("{cv_analysis}", &request.cv_analysis.to_string())
        .replace(
            "{job_spec}",
            request
                .job_spec
                .as_deref()
                .unwrap_or("No job specification provided."),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question(text: &str) -> GeneratedQuestion {
        GeneratedQuestion {
            competency: " Leadership ".to_string(),
            text: text.to_string(),
            difficulty: "hard".to_string(),
        }
    }

    #[test]
    fn test_into_new_questions_truncates_and_skips_blank() {
        let generated = GeneratedQuestions {
            questions: vec![question("  "), question("Q1"), question("Q2"), question("Q3")],
            total_questions: Some(4),
        };
        let kept = generated.into_new_questions(2);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].text, "Q1");
        assert_eq!(kept[0].competency, "Leadership");
        assert_eq!(kept[1].text, "Q2");
    }

    #[test]
    fn test_shortfall_uses_smaller_of_stated_and_present() {
        let full = GeneratedQuestions {
            questions: vec![question("Q1"), question("Q2")],
            total_questions: Some(2),
        };
        assert_eq!(full.shortfall(2), None);
        assert_eq!(full.shortfall(5), Some(3));

        let understated = GeneratedQuestions {
            questions: vec![question("Q1"), question("Q2")],
            total_questions: Some(1),
        };
        assert_eq!(understated.shortfall(2), Some(1));

        let unstated = GeneratedQuestions {
            questions: vec![question("Q1")],
            total_questions: None,
        };
        assert_eq!(unstated.shortfall(1), None);
    }

    #[test]
    fn test_generated_questions_parse_without_difficulty() {
        let parsed: GeneratedQuestions = serde_json::from_value(json!({
            "questions": [{"competency": "Teamwork", "text": "Tell me about a time..."}]
        }))
        .unwrap();
        assert_eq!(parsed.questions[0].difficulty, "medium");
        assert_eq!(parsed.total_questions, None);
    }

    #[test]
    fn test_question_prompt_fills_every_placeholder() {
        let prompt = build_question_prompt(&GenerationRequest {
            cv_analysis: json!({"summary": "Ward manager"}),
            job_spec: None,
            competencies: vec!["Compassion".to_string(), "Everyone Counts".to_string()],
            framework: Framework::Nhs,
            job_title: "Senior Nurse".to_string(),
            job_grade: "Band 7".to_string(),
            total_questions: 5,
        });
        assert!(prompt.starts_with("Write 5 competency-based"));
        assert!(prompt.contains("Compassion, Everyone Counts"));
        assert!(prompt.contains("Ward manager"));
        assert!(prompt.contains("No job specification provided."));
        assert!(!prompt.contains("{job_grade}"));
    }
}
