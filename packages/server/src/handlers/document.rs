use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::prelude::Uuid;
use sea_orm::*;
use tracing::instrument;

use crate::entity::document;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::document::*;
use crate::state::AppState;
use crate::workflow::documents;

#[utoipa::path(
    post,
    path = "/",
    tag = "Documents",
    operation_id = "createDocument",
    summary = "Register an uploaded document",
    description = "Records the file's metadata and returns the storage key it lives under. The document stays unattached until a challenge or submission save lists it in `document_ids`.",
    request_body = CreateDocumentRequest,
    responses(
        (status = 201, description = "Document registered", body = DocumentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, filename = %payload.filename))]
pub async fn create_document(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateDocumentRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_document(&payload)
        .into_result()
        .map_err(|e| e.with_input(&payload))?;

    let filename = payload.filename.trim().to_string();
    let extension = extension_of(&filename).unwrap_or_default();
    let model = document::ActiveModel {
        user_id: Set(auth_user.user_id),
        challenge_id: Set(None),
        submission_id: Set(None),
        key: Set(format!("{}.{}", Uuid::new_v4(), extension)),
        filename: Set(filename),
        extension: Set(extension),
        name: Set(payload.name.map(|n| n.trim().to_string())),
        section: Set(payload.section),
        deleted_at: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(DocumentResponse::from(model))))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Documents",
    operation_id = "deleteDocument",
    summary = "Delete a document",
    description = "Soft-deletes the document. Allowed for its uploader and administrators.",
    params(("id" = i32, Path, description = "Document ID")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_document(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let doc = document::Entity::find_by_id(id)
        .filter(document::Column::DeletedAt.is_null())
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".into()))?;
    if doc.user_id != auth_user.user_id && !auth_user.is_admin() {
        return Err(AppError::PermissionDenied);
    }
    documents::soft_delete(&state.db, doc).await?;
    Ok(StatusCode::NO_CONTENT)
}
