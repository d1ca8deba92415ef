use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::*;
use tracing::instrument;

use crate::entity::agency;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::agency::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Agencies",
    operation_id = "listAgencies",
    summary = "List agencies",
    description = "Every agency, by name. Used to pick a challenge's agency and federal partners.",
    responses(
        (status = 200, description = "Agencies", body = Vec<AgencyResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_agencies(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AgencyResponse>>, AppError> {
    let agencies = agency::Entity::find()
        .order_by_asc(agency::Column::Name)
        .all(&state.db)
        .await?;
    Ok(Json(agencies.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Agencies",
    operation_id = "createAgency",
    summary = "Create an agency",
    description = "Requires `agency:manage` permission.",
    request_body = CreateAgencyRequest,
    responses(
        (status = 201, description = "Agency created", body = AgencyResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Name already used (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_agency(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateAgencyRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("agency:manage")?;
    validate_create_agency(&payload)
        .into_result()
        .map_err(|e| e.with_input(&payload))?;

    let model = agency::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        acronym: Set(payload
            .acronym
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("An agency with this name already exists".into())
        }
        _ => AppError::from(e),
    })?;

    Ok((StatusCode::CREATED, Json(AgencyResponse::from(model))))
}
