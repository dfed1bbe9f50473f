pub mod health;


use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::answers::handlers as answers;
use crate::documents::handlers as documents;
use crate::interviews::handlers as interviews;
use crate::ratings::handlers as ratings;
use crate::state::AppState;
use crate::users::handlers as users;

/// Body returned by every DELETE endpoint.
#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: Uuid,
    pub deleted: bool,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/api/v1", api_routes())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Account
        .route("/me/subscription", get(users::handle_get_subscription))
        // Documents
        .route(
            "/documents",
            post(documents::handle_create_document).get(documents::handle_list_documents),
        )
        .route(
            "/documents/:id",
            get(documents::handle_get_document).delete(documents::handle_delete_document),
        )
        .route(
            "/documents/:id/analyze",
            post(documents::handle_analyze_document),
        )
        // Interviews
        .route(
            "/interviews",
            post(interviews::handle_start_interview).get(interviews::handle_list_interviews),
        )
        .route(
            "/interviews/active",
            get(interviews::handle_get_active_interview),
        )
        .route(
            "/interviews/:id",
            get(interviews::handle_get_interview)
                .patch(interviews::handle_update_interview)
                .delete(interviews::handle_delete_interview),
        )
        .route(
            "/interviews/:id/complete",
            post(interviews::handle_complete_interview),
        )
        .route(
            "/interviews/:id/questions",
            get(interviews::handle_list_questions),
        )
        .route(
            "/interviews/:id/answers",
            get(interviews::handle_list_answers),
        )
        .route("/questions/:id", get(interviews::handle_get_question))
        // Answers
        .route("/answers", post(answers::handle_submit_answer))
        .route("/answers/:id", get(answers::handle_get_answer))
        .route(
            "/answers/:id/grading-status",
            get(answers::handle_grading_status),
        )
        // Ratings
        .route("/ratings", post(ratings::handle_create_rating))
        .route(
            "/ratings/:id",
            get(ratings::handle_get_rating)
                .patch(ratings::handle_update_rating)
                .delete(ratings::handle_delete_rating),
        )
        .route(
            "/ratings/by-answer/:answer_id",
            get(ratings::handle_get_rating_by_answer),
        )
}
