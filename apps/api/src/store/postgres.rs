use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{error, info};
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

/// PostgreSQL-backed entity store.
///
/// Uniqueness of answers per question, ratings per answer and active
/// interviews per user is enforced by the schema, not by read-then-write.
#[derive(Clone)]
pub struct PgEntityStore {
    pool: PgPool,
}

impl PgEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn delete_interview_tx(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let ratings = sqlx::query(
            "DELETE FROM ratings WHERE answer_id IN (SELECT id FROM answers WHERE interview_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let answers = sqlx::query("DELETE FROM answers WHERE interview_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let questions = sqlx::query("DELETE FROM questions WHERE interview_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let interview = sqlx::query("DELETE FROM interviews WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            "Deleted interview {id}: {} ratings, {} answers, {} questions",
            ratings.rows_affected(),
            answers.rows_affected(),
            questions.rows_affected()
        );

        Ok(interview.rows_affected() > 0)
    }
}

#[async_trait]
impl EntityStore for PgEntityStore {
    // ── Users ───────────────────────────────────────────────────────────────

    async fn get_user(&self, id: Uuid) -> Result<Option<UserRow>, AppError> {
        Ok(
            sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    // ── Documents ───────────────────────────────────────────────────────────

    async fn insert_document(&self, doc: NewDocument) -> Result<DocumentRow, AppError> {
        Ok(sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO documents (id, user_id, kind, title, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(doc.user_id)
        .bind(doc.kind.as_str())
        .bind(&doc.title)
        .bind(&doc.content)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<DocumentRow>, AppError> {
        Ok(
            sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<DocumentRow>, AppError> {
        Ok(sqlx::query_as::<_, DocumentRow>(
            "SELECT * FROM documents WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn latest_analyzed_document(
        &self,
        user_id: Uuid,
        kind: DocumentKind,
    ) -> Result<Option<DocumentRow>, AppError> {
        Ok(sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT * FROM documents
            WHERE user_id = $1 AND kind = $2 AND analysis IS NOT NULL
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn latest_document(
        &self,
        user_id: Uuid,
        kind: DocumentKind,
    ) -> Result<Option<DocumentRow>, AppError> {
        Ok(sqlx::query_as::<_, DocumentRow>(
            "SELECT * FROM documents WHERE user_id = $1 AND kind = $2 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn set_document_analysis(
        &self,
        id: Uuid,
        analysis: Value,
    ) -> Result<Option<DocumentRow>, AppError> {
        Ok(sqlx::query_as::<_, DocumentRow>(
            "UPDATE documents SET analysis = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&analysis)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_document(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Interviews ──────────────────────────────────────────────────────────

    async fn get_interview(&self, id: Uuid) -> Result<Option<InterviewRow>, AppError> {
        Ok(
            sqlx::query_as::<_, InterviewRow>("SELECT * FROM interviews WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_interviews(&self, user_id: Uuid) -> Result<Vec<InterviewRow>, AppError> {
        Ok(sqlx::query_as::<_, InterviewRow>(
            "SELECT * FROM interviews WHERE user_id = $1 ORDER BY started_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn active_interview(&self, user_id: Uuid) -> Result<Option<InterviewRow>, AppError> {
        Ok(sqlx::query_as::<_, InterviewRow>(
            "SELECT * FROM interviews WHERE user_id = $1 AND status = 'active'",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn start_interview(
        &self,
        interview: NewInterview,
        questions: Vec<NewQuestion>,
        starter_limit: Option<i32>,
    ) -> Result<StartOutcome, AppError> {
        let user_id = interview.user_id;
        let mut tx = self.pool.begin().await?;

        // Row lock serialises concurrent starts for the same user.
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!("User {user_id} not found")));
        }

        if let Some(limit) = starter_limit {
            let consumed = sqlx::query(
                r#"
                UPDATE users
                SET starter_interviews_used = starter_interviews_used + 1
                WHERE id = $1 AND starter_interviews_used < $2
                "#,
            )
            .bind(user_id)
            .bind(limit)
            .execute(&mut *tx)
            .await?;

            if consumed.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(StartOutcome::StarterQuotaExhausted);
            }
        }

        let superseded: Option<Uuid> = sqlx::query_scalar(
            "UPDATE interviews SET status = 'superseded' WHERE user_id = $1 AND status = 'active' RETURNING id",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, InterviewRow>(
            r#"
            INSERT INTO interviews
                (id, user_id, job_title, job_grade, framework, competencies,
                 total_questions, current_question_index, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, 'active')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&interview.job_title)
        .bind(&interview.job_grade)
        .bind(&interview.framework)
        .bind(&interview.competencies)
        .bind(questions.len() as i32)
        .fetch_one(&mut *tx)
        .await?;

        let mut inserted = Vec::with_capacity(questions.len());
        for (position, question) in questions.iter().enumerate() {
            let q = sqlx::query_as::<_, QuestionRow>(
                r#"
                INSERT INTO questions
                    (id, interview_id, user_id, position, competency, text, difficulty)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(row.id)
            .bind(user_id)
            .bind(position as i32)
            .bind(&question.competency)
            .bind(&question.text)
            .bind(&question.difficulty)
            .fetch_one(&mut *tx)
            .await?;
            inserted.push(q);
        }

        tx.commit().await?;

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
        Ok(sqlx::query_as::<_, InterviewRow>(
            "UPDATE interviews SET current_question_index = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(index)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn supersede_interview(&self, id: Uuid) -> Result<Option<InterviewRow>, AppError> {
        let updated = sqlx::query_as::<_, InterviewRow>(
            "UPDATE interviews SET status = 'superseded' WHERE id = $1 AND status = 'active' RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(row) => Ok(Some(row)),
            None => self.get_interview(id).await,
        }
    }

    async fn activate_interview(&self, id: Uuid) -> Result<Option<InterviewRow>, AppError> {
        let Some(owner) = sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM interviews WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut tx = self.pool.begin().await?;

        // Same lock order as start_interview: user row first, then interviews.
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(owner)
            .execute(&mut *tx)
            .await?;

        let target = sqlx::query_as::<_, InterviewRow>(
            "SELECT * FROM interviews WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(target) = target else {
            return Ok(None);
        };
        if target.status() != InterviewStatus::Superseded {
            tx.commit().await?;
            return Ok(Some(target));
        }

        sqlx::query(
            "UPDATE interviews SET status = $3 WHERE user_id = $1 AND status = $4 AND id <> $2",
        )
        .bind(target.user_id)
        .bind(id)
        .bind(InterviewStatus::Superseded.as_str())
        .bind(InterviewStatus::Active.as_str())
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, InterviewRow>(
            "UPDATE interviews SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(InterviewStatus::Active.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Reactivated interview {id} for user {owner}");
        Ok(Some(row))
    }

    async fn complete_interview(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<InterviewRow>, AppError> {
        Ok(sqlx::query_as::<_, InterviewRow>(
            r#"
            UPDATE interviews
            SET status = 'completed', completed_at = COALESCE(completed_at, $2)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(completed_at)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_interview(&self, id: Uuid) -> Result<bool, AppError> {
        self.delete_interview_tx(id).await.map_err(|e| {
            error!("Cascading delete of interview {id} failed and was rolled back: {e}");
            AppError::Database(e)
        })
    }

    // ── Questions ───────────────────────────────────────────────────────────

    async fn get_question(&self, id: Uuid) -> Result<Option<QuestionRow>, AppError> {
        Ok(
            sqlx::query_as::<_, QuestionRow>("SELECT * FROM questions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_questions(&self, interview_id: Uuid) -> Result<Vec<QuestionRow>, AppError> {
        Ok(sqlx::query_as::<_, QuestionRow>(
            "SELECT * FROM questions WHERE interview_id = $1 ORDER BY position",
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?)
    }

    // ── Answers ─────────────────────────────────────────────────────────────

    async fn upsert_answer(&self, answer: NewAnswer) -> Result<AnswerRow, AppError> {
        Ok(sqlx::query_as::<_, AnswerRow>(
            r#"
            INSERT INTO answers (id, interview_id, question_id, text, time_spent)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (question_id) DO UPDATE
                SET text = EXCLUDED.text,
                    time_spent = EXCLUDED.time_spent,
                    updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(answer.interview_id)
        .bind(answer.question_id)
        .bind(&answer.text)
        .bind(answer.time_spent)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_answer(&self, id: Uuid) -> Result<Option<AnswerRow>, AppError> {
        Ok(
            sqlx::query_as::<_, AnswerRow>("SELECT * FROM answers WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_answers(&self, interview_id: Uuid) -> Result<Vec<AnswerRow>, AppError> {
        Ok(sqlx::query_as::<_, AnswerRow>(
            r#"
            SELECT a.* FROM answers a
            JOIN questions q ON q.id = a.question_id
            WHERE a.interview_id = $1
            ORDER BY q.position
            "#,
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?)
    }

    // ── Ratings ─────────────────────────────────────────────────────────────

    async fn get_rating(&self, id: Uuid) -> Result<Option<RatingRow>, AppError> {
        Ok(
            sqlx::query_as::<_, RatingRow>("SELECT * FROM ratings WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn rating_for_answer(&self, answer_id: Uuid) -> Result<Option<RatingRow>, AppError> {
        Ok(
            sqlx::query_as::<_, RatingRow>("SELECT * FROM ratings WHERE answer_id = $1")
                .bind(answer_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn insert_rating(&self, rating: NewRating) -> Result<Option<RatingRow>, AppError> {
        Ok(sqlx::query_as::<_, RatingRow>(
            r#"
            INSERT INTO ratings
                (id, answer_id, overall_score, competency_scores, star_analysis,
                 feedback, strengths, improvement_areas, improved_text)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (answer_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(rating.answer_id)
        .bind(rating.overall_score)
        .bind(&rating.competency_scores)
        .bind(&rating.star_analysis)
        .bind(&rating.feedback)
        .bind(&rating.strengths)
        .bind(&rating.improvement_areas)
        .bind(&rating.improved_text)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn upsert_rating(
        &self,
        rating: NewRating,
        answer_version: DateTime<Utc>,
    ) -> Result<Option<RatingRow>, AppError> {
        // The answer row is share-locked so a concurrent resubmission either
        // commits first (no row matches) or waits until the rating is written.
        Ok(sqlx::query_as::<_, RatingRow>(
            r#"
            WITH graded AS (
                SELECT id FROM answers
                WHERE id = $2 AND updated_at = $10
                FOR SHARE
            )
            INSERT INTO ratings
                (id, answer_id, overall_score, competency_scores, star_analysis,
                 feedback, strengths, improvement_areas, improved_text)
            SELECT $1, graded.id, $3, $4, $5, $6, $7, $8, $9
            FROM graded
            ON CONFLICT (answer_id) DO UPDATE
                SET overall_score = EXCLUDED.overall_score,
                    competency_scores = EXCLUDED.competency_scores,
                    star_analysis = EXCLUDED.star_analysis,
                    feedback = EXCLUDED.feedback,
                    strengths = EXCLUDED.strengths,
                    improvement_areas = EXCLUDED.improvement_areas,
                    improved_text = EXCLUDED.improved_text,
                    updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(rating.answer_id)
        .bind(rating.overall_score)
        .bind(&rating.competency_scores)
        .bind(&rating.star_analysis)
        .bind(&rating.feedback)
        .bind(&rating.strengths)
        .bind(&rating.improvement_areas)
        .bind(&rating.improved_text)
        .bind(answer_version)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update_rating(
        &self,
        id: Uuid,
        patch: RatingPatch,
    ) -> Result<Option<RatingRow>, AppError> {
        Ok(sqlx::query_as::<_, RatingRow>(
            r#"
            UPDATE ratings
            SET overall_score = COALESCE($2, overall_score),
                feedback = COALESCE($3, feedback),
                strengths = COALESCE($4, strengths),
                improvement_areas = COALESCE($5, improvement_areas),
                improved_text = COALESCE($6, improved_text),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.overall_score)
        .bind(&patch.feedback)
        .bind(&patch.strengths)
        .bind(&patch.improvement_areas)
        .bind(&patch.improved_text)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_rating(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM ratings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Grading dead letters ────────────────────────────────────────────────

    async fn record_grading_failure(
        &self,
        answer_id: Uuid,
        attempts: i32,
        last_error: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO grading_failures (answer_id, attempts, last_error)
            VALUES ($1, $2, $3)
            ON CONFLICT (answer_id) DO UPDATE
                SET attempts = EXCLUDED.attempts,
                    last_error = EXCLUDED.last_error,
                    failed_at = now()
            "#,
        )
        .bind(answer_id)
        .bind(attempts)
        .bind(last_error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn grading_failure(
        &self,
        answer_id: Uuid,
    ) -> Result<Option<GradingFailureRow>, AppError> {
        Ok(sqlx::query_as::<_, GradingFailureRow>(
            "SELECT * FROM grading_failures WHERE answer_id = $1",
        )
        .bind(answer_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}
