//! Ownership Guard: walks the shortest relation chain from an entity up to
//! its owning user.
//!
//! - Document / Interview / Question: `user_id` on the row itself
//! - Answer: answer → interview
//! - Rating: rating → answer → interview
//!
//! A broken chain (parent row missing) is reported as `NotFound`.

use uuid::Uuid;

use crate::errors::AppError;
use crate::models::document::DocumentRow;
use crate::models::interview::{AnswerRow, InterviewRow, QuestionRow};
use crate::models::rating::RatingRow;
use crate::store::EntityStore;

#[derive(Debug, Clone, PartialEq)]
pub enum Ownership<T> {
    Authorized(T),
    NotFound,
    Forbidden,
}

impl<T> Ownership<T> {
    fn resolve(row: Option<T>, user_id: Uuid, owner: impl FnOnce(&T) -> Uuid) -> Self {
        match row {
            None => Ownership::NotFound,
            Some(row) if owner(&row) == user_id => Ownership::Authorized(row),
            Some(_) => Ownership::Forbidden,
        }
    }

    /// Converts the outcome into the handler-facing result: 404 or 403 on failure.
    pub fn require(self, entity: &str, id: Uuid) -> Result<T, AppError> {
        match self {
            Ownership::Authorized(row) => Ok(row),
            Ownership::NotFound => Err(AppError::NotFound(format!("{entity} {id} not found"))),
            Ownership::Forbidden => Err(AppError::Forbidden),
        }
    }
}

pub async fn document(
    store: &dyn EntityStore,
    user_id: Uuid,
    id: Uuid,
) -> Result<Ownership<DocumentRow>, AppError> {
    let row = store.get_document(id).await?;
    Ok(Ownership::resolve(row, user_id, |d| d.user_id))
}

pub async fn interview(
    store: &dyn EntityStore,
    user_id: Uuid,
    id: Uuid,
) -> Result<Ownership<InterviewRow>, AppError> {
    let row = store.get_interview(id).await?;
    Ok(Ownership::resolve(row, user_id, |i| i.user_id))
}

pub async fn question(
    store: &dyn EntityStore,
    user_id: Uuid,
    id: Uuid,
) -> Result<Ownership<QuestionRow>, AppError> {
    let row = store.get_question(id).await?;
    Ok(Ownership::resolve(row, user_id, |q| q.user_id))
}

pub async fn answer(
    store: &dyn EntityStore,
    user_id: Uuid,
    id: Uuid,
) -> Result<Ownership<AnswerRow>, AppError> {
    let Some(answer) = store.get_answer(id).await? else {
        return Ok(Ownership::NotFound);
    };
    Ok(match interview(store, user_id, answer.interview_id).await? {
        Ownership::Authorized(_) => Ownership::Authorized(answer),
        Ownership::NotFound => Ownership::NotFound,
        Ownership::Forbidden => Ownership::Forbidden,
    })
}

pub async fn rating(
    store: &dyn EntityStore,
    user_id: Uuid,
    id: Uuid,
) -> Result<Ownership<RatingRow>, AppError> {
    let Some(rating) = store.get_rating(id).await? else {
        return Ok(Ownership::NotFound);
    };
    Ok(match answer(store, user_id, rating.answer_id).await? {
        Ownership::Authorized(_) => Ownership::Authorized(rating),
        Ownership::NotFound => Ownership::NotFound,
        Ownership::Forbidden => Ownership::Forbidden,
    })
}
