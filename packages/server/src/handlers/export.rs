use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use common::JudgingStatus;
use sea_orm::*;
use tracing::instrument;

use crate::entity::submission_export::ExportStatus;
use crate::error::{AppError, ErrorBody};
use crate::export::submissions::{ExportScope, SubmissionExportService};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::export::*;
use crate::state::AppState;
use crate::workflow::challenges::ChallengeService;

/// CSV body served as a file download.
pub(crate) fn csv_attachment(filename: &str, body: String) -> impl IntoResponse + use<> {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
}

/// Exports are for administrators and current owners holding `submission:export`.
async fn require_export_access<C: ConnectionTrait>(
    conn: &C,
    auth_user: &AuthUser,
    challenge_id: i32,
) -> Result<(), AppError> {
    auth_user.require_permission("submission:export")?;
    let service = ChallengeService::new(conn);
    service.find(challenge_id).await?;
    if auth_user.is_admin() || service.is_owner(challenge_id, auth_user.user_id).await? {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

fn parse_scope(payload: &CreateExportRequest) -> Result<ExportScope, AppError> {
    let judging_status = match payload.judging_status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(
            raw.parse::<JudgingStatus>()
                .map_err(|e| AppError::field("judging_status", e.to_string()))?,
        ),
    };
    let mut phase_ids = payload.phase_ids.clone();
    phase_ids.sort_unstable();
    phase_ids.dedup();
    Ok(ExportScope {
        phase_ids,
        judging_status,
    })
}

#[utoipa::path(
    post,
    path = "/{id}/exports",
    tag = "Exports",
    operation_id = "createSubmissionExport",
    summary = "Export a challenge's submissions",
    description = "Renders the submitted entries of the selected phases (all phases when empty) as CSV and stores the result. `judging_status` narrows the rows the same way the listing filter does. Requires `submission:export` permission and ownership of the challenge, or an administrator.",
    params(("id" = i32, Path, description = "Challenge ID")),
    request_body = CreateExportRequest,
    responses(
        (status = 201, description = "Export created", body = ExportResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_export(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<CreateExportRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_export_access(&state.db, &auth_user, id).await?;
    let scope = parse_scope(&payload).map_err(|e| e.with_input(&payload))?;
    let export = SubmissionExportService::new(&state.db)
        .create(id, &scope)
        .await
        .map_err(|e| e.with_input(&payload))?;

    Ok((StatusCode::CREATED, Json(ExportResponse::from(export))))
}

#[utoipa::path(
    get,
    path = "/{id}/exports",
    tag = "Exports",
    operation_id = "listSubmissionExports",
    summary = "List a challenge's exports",
    params(("id" = i32, Path, description = "Challenge ID")),
    responses(
        (status = 200, description = "Exports, newest first", body = Vec<ExportResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_exports(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<ExportResponse>>, AppError> {
    require_export_access(&state.db, &auth_user, id).await?;
    let exports = SubmissionExportService::new(&state.db).list(id).await?;
    Ok(Json(exports.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/{id}/exports/{export_id}",
    tag = "Exports",
    operation_id = "downloadSubmissionExport",
    summary = "Download an export",
    description = "Serves the stored CSV. An outdated export is regenerated first.",
    params(
        ("id" = i32, Path, description = "Challenge ID"),
        ("export_id" = i32, Path, description = "Export ID"),
    ),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn download_export(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, export_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    require_export_access(&state.db, &auth_user, id).await?;
    let service = SubmissionExportService::new(&state.db);
    let mut export = service.find(id, export_id).await?;
    if export.status == ExportStatus::Outdated || export.content.is_none() {
        export = service.regenerate(export).await?;
    }

    Ok(csv_attachment(
        &format!("challenge-{id}-submissions-{export_id}.csv"),
        export.content.unwrap_or_default(),
    ))
}

#[utoipa::path(
    post,
    path = "/{id}/exports/{export_id}/regenerate",
    tag = "Exports",
    operation_id = "regenerateSubmissionExport",
    summary = "Regenerate an export",
    description = "Re-renders the export with its original phases and judging status.",
    params(
        ("id" = i32, Path, description = "Challenge ID"),
        ("export_id" = i32, Path, description = "Export ID"),
    ),
    responses(
        (status = 200, description = "Export regenerated", body = ExportResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn regenerate_export(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, export_id)): Path<(i32, i32)>,
) -> Result<Json<ExportResponse>, AppError> {
    require_export_access(&state.db, &auth_user, id).await?;
    let service = SubmissionExportService::new(&state.db);
    let export = service.find(id, export_id).await?;
    Ok(Json(service.regenerate(export).await?.into()))
}
