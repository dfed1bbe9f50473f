//! Axum route handlers for the Documents API.
//!
//! Documents arrive as already-extracted text. Analysis is a separate call so
//! a CV can be re-analyzed without re-uploading it.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::{ownership, AuthUser};
use crate::errors::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::models::document::{DocumentKind, DocumentRow};
use crate::routes::DeletedResponse;
use crate::state::AppState;
use crate::store::NewDocument;

pub const MAX_CONTENT_CHARS: usize = 200_000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    pub kind: DocumentKind,
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
}

fn validate_content(content: &str) -> Result<(), AppError> {
    if content.trim().is_empty() {
        return Err(AppError::Validation("content cannot be empty".to_string()));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::Validation(format!(
            "content exceeds {MAX_CONTENT_CHARS} characters"
        )));
    }
    Ok(())
}

/// POST /api/v1/documents
pub async fn handle_create_document(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentRow>), AppError> {
    validate_content(&request.content)?;

    let doc = state
        .store
        .insert_document(NewDocument {
            user_id: user.id,
            kind: request.kind,
            title: request
                .title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            content: request.content,
        })
        .await?;
    info!("Stored {} document {} for user {}", doc.kind, doc.id, user.id);

    Ok((StatusCode::CREATED, Json(doc)))
}

/// GET /api/v1/documents
pub async fn handle_list_documents(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<DocumentRow>>, AppError> {
    Ok(Json(state.store.list_documents(user.id).await?))
}

/// GET /api/v1/documents/:id
pub async fn handle_get_document(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DocumentRow>, AppError> {
    let doc = ownership::document(state.store.as_ref(), user.id, id)
        .await?
        .require("Document", id)?;
    Ok(Json(doc))
}

/// DELETE /api/v1/documents/:id
pub async fn handle_delete_document(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DeletedResponse>, AppError> {
    ownership::document(state.store.as_ref(), user.id, id)
        .await?
        .require("Document", id)?;
    if !state.store.delete_document(id).await? {
        return Err(AppError::NotFound(format!("Document {id} not found")));
    }
    Ok(Json(DeletedResponse { id, deleted: true }))
}

/// POST /api/v1/documents/:id/analyze
///
/// Runs (or re-runs) the analysis and stores it on the document.
pub async fn handle_analyze_document(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DocumentRow>, AppError> {
    let doc = ownership::document(state.store.as_ref(), user.id, id)
        .await?
        .require("Document", id)?;
    let kind: DocumentKind = doc
        .kind
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;

    let analysis = state.generator.analyze_document(kind, &doc.content).await?;
    let updated = state
        .store
        .set_document_analysis(id, analysis)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {id} not found")))?;
    info!("Analyzed {} document {id}", updated.kind);

    Ok(Json(updated))
}
