//! In-memory `EntityStore` for tests. A single mutex makes every trait call
//! atomic, matching the transactional guarantees of the Postgres backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::document::{DocumentKind, DocumentRow};
use crate::models::interview::{AnswerRow, InterviewRow, InterviewStatus, QuestionRow};
use crate::models::rating::{GradingFailureRow, RatingRow};
use crate::models::user::UserRow;
use crate::store::{
    EntityStore, NewAnswer, NewDocument, NewInterview, NewQuestion, NewRating, RatingPatch,
    StartOutcome,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserRow>,
    documents: HashMap<Uuid, DocumentRow>,
    interviews: HashMap<Uuid, InterviewRow>,
    questions: HashMap<Uuid, QuestionRow>,
    answers: HashMap<Uuid, AnswerRow>,
    ratings: HashMap<Uuid, RatingRow>,
    grading_failures: HashMap<Uuid, GradingFailureRow>,
}

#[derive(Default)]
pub struct MemoryEntityStore {
    tables: Mutex<Tables>,
    fail_rating_writes: AtomicBool,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: UserRow) {
        self.lock().users.insert(user.id, user);
    }

    /// Makes every rating write fail with a database error.
    pub fn fail_rating_writes(&self, fail: bool) {
        self.fail_rating_writes.store(fail, Ordering::SeqCst);
    }

    pub fn answers_for_question(&self, question_id: Uuid) -> Vec<AnswerRow> {
        self.lock()
            .answers
            .values()
            .filter(|a| a.question_id == question_id)
            .cloned()
            .collect()
    }

    pub fn active_count(&self, user_id: Uuid) -> usize {
        self.lock()
            .interviews
            .values()
            .filter(|i| i.user_id == user_id && i.is_active())
            .count()
    }

    /// Rows of any kind still referencing `interview_id`, the interview included.
    pub fn rows_referencing_interview(&self, interview_id: Uuid) -> usize {
        let t = self.lock();
        let answer_ids: Vec<Uuid> = t
            .answers
            .values()
            .filter(|a| a.interview_id == interview_id)
            .map(|a| a.id)
            .collect();
        t.interviews.contains_key(&interview_id) as usize
            + t.questions
                .values()
                .filter(|q| q.interview_id == interview_id)
                .count()
            + answer_ids.len()
            + t.ratings
                .values()
                .filter(|r| answer_ids.contains(&r.answer_id))
                .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_rating_writes(&self) -> Result<(), AppError> {
        if self.fail_rating_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

fn latest<'a>(docs: impl Iterator<Item = &'a DocumentRow>) -> Option<DocumentRow> {
    docs.max_by_key(|d| d.created_at).cloned()
}

fn rating_from(new: NewRating, id: Uuid, created_at: DateTime<Utc>) -> RatingRow {
    RatingRow {
        id,
        answer_id: new.answer_id,
        overall_score: new.overall_score,
        competency_scores: new.competency_scores,
        star_analysis: new.star_analysis,
        feedback: new.feedback,
        strengths: new.strengths,
        improvement_areas: new.improvement_areas,
        improved_text: new.improved_text,
        created_at,
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<UserRow>, AppError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn insert_document(&self, doc: NewDocument) -> Result<DocumentRow, AppError> {
        let now = Utc::now();
        let row = DocumentRow {
            id: Uuid::new_v4(),
            user_id: doc.user_id,
            kind: doc.kind.as_str().to_string(),
            title: doc.title,
            content: doc.content,
            analysis: None,
            created_at: now,
            updated_at: now,
        };
        self.lock().documents.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<DocumentRow>, AppError> {
        Ok(self.lock().documents.get(&id).cloned())
    }

    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<DocumentRow>, AppError> {
        let mut docs: Vec<_> = self
            .lock()
            .documents
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs)
    }

    async fn latest_analyzed_document(
        &self,
        user_id: Uuid,
        kind: DocumentKind,
    ) -> Result<Option<DocumentRow>, AppError> {
        Ok(latest(self.lock().documents.values().filter(|d| {
            d.user_id == user_id && d.kind == kind.as_str() && d.analysis.is_some()
        })))
    }

    async fn latest_document(
        &self,
        user_id: Uuid,
        kind: DocumentKind,
    ) -> Result<Option<DocumentRow>, AppError> {
        Ok(latest(
            self.lock()
                .documents
                .values()
                .filter(|d| d.user_id == user_id && d.kind == kind.as_str()),
        ))
    }

    async fn set_document_analysis(
        &self,
        id: Uuid,
        analysis: Value,
    ) -> Result<Option<DocumentRow>, AppError> {
        let mut t = self.lock();
        Ok(t.documents.get_mut(&id).map(|d| {
            d.analysis = Some(analysis);
            d.updated_at = Utc::now();
            d.clone()
        }))
    }

    async fn delete_document(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.lock().documents.remove(&id).is_some())
    }

    async fn get_interview(&self, id: Uuid) -> Result<Option<InterviewRow>, AppError> {
        Ok(self.lock().interviews.get(&id).cloned())
    }

    async fn list_interviews(&self, user_id: Uuid) -> Result<Vec<InterviewRow>, AppError> {
        let mut rows: Vec<_> = self
            .lock()
            .interviews
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(rows)
    }

    async fn active_interview(&self, user_id: Uuid) -> Result<Option<InterviewRow>, AppError> {
        Ok(self
            .lock()
            .interviews
            .values()
            .find(|i| i.user_id == user_id && i.is_active())
            .cloned())
    }

    async fn start_interview(
        &self,
        interview: NewInterview,
        questions: Vec<NewQuestion>,
        starter_limit: Option<i32>,
    ) -> Result<StartOutcome, AppError> {
        let user_id = interview.user_id;
        let mut t = self.lock();

        let user = t
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;
        if let Some(limit) = starter_limit {
            if user.starter_interviews_used >= limit {
                return Ok(StartOutcome::StarterQuotaExhausted);
            }
            user.starter_interviews_used += 1;
        }

        let mut superseded = None;
        for existing in t.interviews.values_mut() {
            if existing.user_id == user_id && existing.is_active() {
                existing.status = InterviewStatus::Superseded.as_str().to_string();
                superseded = Some(existing.id);
            }
        }

        let now = Utc::now();
        let row = InterviewRow {
            id: Uuid::new_v4(),
            user_id,
            job_title: interview.job_title,
            job_grade: interview.job_grade,
            framework: interview.framework,
            competencies: interview.competencies,
            total_questions: questions.len() as i32,
            current_question_index: 0,
            status: InterviewStatus::Active.as_str().to_string(),
            started_at: now,
            completed_at: None,
        };
        t.interviews.insert(row.id, row.clone());

        let mut inserted = Vec::with_capacity(questions.len());
        for (position, q) in questions.into_iter().enumerate() {
            let question = QuestionRow {
                id: Uuid::new_v4(),
                interview_id: row.id,
                user_id,
                position: position as i32,
                competency: q.competency,
                text: q.text,
                difficulty: q.difficulty,
                created_at: now,
            };
            t.questions.insert(question.id, question.clone());
            inserted.push(question);
        }

        Ok(StartOutcome::Started {
            interview: row,
            questions: inserted,
            superseded,
        })
    }

    async fn set_question_index(
        &self,
        id: Uuid,
        index: i32,
    ) -> Result<Option<InterviewRow>, AppError> {
        let mut t = self.lock();
        Ok(t.interviews.get_mut(&id).map(|i| {
            i.current_question_index = index;
            i.clone()
        }))
    }

    async fn supersede_interview(&self, id: Uuid) -> Result<Option<InterviewRow>, AppError> {
        let mut t = self.lock();
        Ok(t.interviews.get_mut(&id).map(|i| {
            if i.is_active() {
                i.status = InterviewStatus::Superseded.as_str().to_string();
            }
            i.clone()
        }))
    }

    async fn activate_interview(&self, id: Uuid) -> Result<Option<InterviewRow>, AppError> {
        let mut t = self.lock();
        let Some(target) = t.interviews.get(&id).cloned() else {
            return Ok(None);
        };
        if target.status() != InterviewStatus::Superseded {
            return Ok(Some(target));
        }
        for other in t.interviews.values_mut() {
            if other.user_id == target.user_id && other.is_active() {
                other.status = InterviewStatus::Superseded.as_str().to_string();
            }
        }
        Ok(t.interviews.get_mut(&id).map(|i| {
            i.status = InterviewStatus::Active.as_str().to_string();
            i.clone()
        }))
    }

    async fn complete_interview(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<InterviewRow>, AppError> {
        let mut t = self.lock();
        Ok(t.interviews.get_mut(&id).map(|i| {
            i.status = InterviewStatus::Completed.as_str().to_string();
            i.completed_at.get_or_insert(completed_at);
            i.clone()
        }))
    }

    async fn delete_interview(&self, id: Uuid) -> Result<bool, AppError> {
        let mut t = self.lock();
        let answer_ids: Vec<Uuid> = t
            .answers
            .values()
            .filter(|a| a.interview_id == id)
            .map(|a| a.id)
            .collect();
        t.ratings.retain(|_, r| !answer_ids.contains(&r.answer_id));
        t.grading_failures
            .retain(|answer_id, _| !answer_ids.contains(answer_id));
        t.answers.retain(|_, a| a.interview_id != id);
        t.questions.retain(|_, q| q.interview_id != id);
        Ok(t.interviews.remove(&id).is_some())
    }

    async fn get_question(&self, id: Uuid) -> Result<Option<QuestionRow>, AppError> {
        Ok(self.lock().questions.get(&id).cloned())
    }

    async fn list_questions(&self, interview_id: Uuid) -> Result<Vec<QuestionRow>, AppError> {
        let mut rows: Vec<_> = self
            .lock()
            .questions
            .values()
            .filter(|q| q.interview_id == interview_id)
            .cloned()
            .collect();
        rows.sort_by_key(|q| q.position);
        Ok(rows)
    }

    async fn upsert_answer(&self, answer: NewAnswer) -> Result<AnswerRow, AppError> {
        let mut t = self.lock();
        let now = Utc::now();
        if let Some(existing) = t
            .answers
            .values_mut()
            .find(|a| a.question_id == answer.question_id)
        {
            existing.text = answer.text;
            existing.time_spent = answer.time_spent;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let row = AnswerRow {
            id: Uuid::new_v4(),
            interview_id: answer.interview_id,
            question_id: answer.question_id,
            text: answer.text,
            time_spent: answer.time_spent,
            created_at: now,
            updated_at: now,
        };
        t.answers.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_answer(&self, id: Uuid) -> Result<Option<AnswerRow>, AppError> {
        Ok(self.lock().answers.get(&id).cloned())
    }

    async fn list_answers(&self, interview_id: Uuid) -> Result<Vec<AnswerRow>, AppError> {
        let t = self.lock();
        let mut rows: Vec<_> = t
            .answers
            .values()
            .filter(|a| a.interview_id == interview_id)
            .cloned()
            .collect();
        rows.sort_by_key(|a| t.questions.get(&a.question_id).map(|q| q.position));
        Ok(rows)
    }

    async fn get_rating(&self, id: Uuid) -> Result<Option<RatingRow>, AppError> {
        Ok(self.lock().ratings.get(&id).cloned())
    }

    async fn rating_for_answer(&self, answer_id: Uuid) -> Result<Option<RatingRow>, AppError> {
        Ok(self
            .lock()
            .ratings
            .values()
            .find(|r| r.answer_id == answer_id)
            .cloned())
    }

    async fn insert_rating(&self, rating: NewRating) -> Result<Option<RatingRow>, AppError> {
        self.check_rating_writes()?;
        let mut t = self.lock();
        if t.ratings.values().any(|r| r.answer_id == rating.answer_id) {
            return Ok(None);
        }
        let row = rating_from(rating, Uuid::new_v4(), Utc::now());
        t.ratings.insert(row.id, row.clone());
        Ok(Some(row))
    }

    async fn upsert_rating(
        &self,
        rating: NewRating,
        answer_version: DateTime<Utc>,
    ) -> Result<Option<RatingRow>, AppError> {
        self.check_rating_writes()?;
        let mut t = self.lock();
        let current = t
            .answers
            .get(&rating.answer_id)
            .is_some_and(|a| a.updated_at == answer_version);
        if !current {
            return Ok(None);
        }
        let existing = t
            .ratings
            .values()
            .find(|r| r.answer_id == rating.answer_id)
            .map(|r| (r.id, r.created_at));
        let row = match existing {
            Some((id, created_at)) => rating_from(rating, id, created_at),
            None => rating_from(rating, Uuid::new_v4(), Utc::now()),
        };
        t.ratings.insert(row.id, row.clone());
        Ok(Some(row))
    }

    async fn update_rating(
        &self,
        id: Uuid,
        patch: RatingPatch,
    ) -> Result<Option<RatingRow>, AppError> {
        self.check_rating_writes()?;
        let mut t = self.lock();
        Ok(t.ratings.get_mut(&id).map(|r| {
            if let Some(score) = patch.overall_score {
                r.overall_score = score;
            }
            if let Some(feedback) = patch.feedback {
                r.feedback = feedback;
            }
            if let Some(strengths) = patch.strengths {
                r.strengths = strengths;
            }
            if let Some(areas) = patch.improvement_areas {
                r.improvement_areas = areas;
            }
            if let Some(text) = patch.improved_text {
                r.improved_text = text;
            }
            r.updated_at = Utc::now();
            r.clone()
        }))
    }

    async fn delete_rating(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.lock().ratings.remove(&id).is_some())
    }

    async fn record_grading_failure(
        &self,
        answer_id: Uuid,
        attempts: i32,
        last_error: &str,
    ) -> Result<(), AppError> {
        self.lock().grading_failures.insert(
            answer_id,
            GradingFailureRow {
                answer_id,
                attempts,
                last_error: last_error.to_string(),
                failed_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn grading_failure(
        &self,
        answer_id: Uuid,
    ) -> Result<Option<GradingFailureRow>, AppError> {
        Ok(self.lock().grading_failures.get(&answer_id).cloned())
    }
}
