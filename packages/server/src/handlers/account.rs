use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use sea_orm::*;
use serde_json::{Value, json};
use tracing::instrument;

use crate::audit::{Actor, CertificationLogService, SecurityLogService, Target, details};
use crate::entity::security_log::SecurityAction;
use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::account::*;
use crate::models::admin::CertificationResponse;
use crate::state::AppState;
use crate::utils::hash;

pub(crate) async fn find_user<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Account",
    operation_id = "getAccount",
    summary = "Current account",
    responses(
        (status = 200, description = "Account details", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_account(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let user = find_user(&state.db, auth_user.user_id).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    patch,
    path = "/",
    tag = "Account",
    operation_id = "updateAccount",
    summary = "Edit the current account",
    description = "Updates names and phone number. Changing the password requires `current_password`. Changed field names are written to the security log.",
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account updated", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn update_account(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateAccountRequest>,
) -> Result<Json<UserResponse>, AppError> {
    validate_update_account(&payload)
        .into_result()
        .map_err(|e| e.with_input(&payload))?;

    let txn = state.db.begin().await?;
    let user = find_user(&txn, auth_user.user_id).await?;

    let mut changed: Vec<&str> = Vec::new();
    let mut active: user::ActiveModel = user.clone().into();
    if let Some(first_name) = &payload.first_name {
        active.first_name = Set(first_name.trim().to_string());
        changed.push("first_name");
    }
    if let Some(last_name) = &payload.last_name {
        active.last_name = Set(last_name.trim().to_string());
        changed.push("last_name");
    }
    if let Some(phone_number) = &payload.phone_number {
        active.phone_number = Set(phone_number.as_deref().map(|p| p.trim().to_string()));
        changed.push("phone_number");
    }
    if let Some(new_password) = &payload.new_password {
        let current = payload.current_password.as_deref().unwrap_or_default();
        let is_valid = hash::verify_password(current, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;
        if !is_valid {
            return Err(AppError::field("current_password", "is incorrect").with_input(&payload));
        }
        let password_hash = hash::hash_password(new_password)
            .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;
        active.password_hash = Set(password_hash);
        changed.push("password");
    }

    if changed.is_empty() {
        return Ok(Json(user.into()));
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    SecurityLogService::new(&txn)
        .track(
            SecurityAction::AccountUpdate,
            &Actor::from(&auth_user),
            Some(&Target::user(&updated)),
            Some(details([(
                "fields",
                Value::Array(changed.into_iter().map(|f| json!(f)).collect()),
            )])),
        )
        .await?;
    txn.commit().await?;

    Ok(Json(updated.into()))
}

#[utoipa::path(
    post,
    path = "/recertify",
    tag = "Account",
    operation_id = "requestRecertification",
    summary = "Ask for account recertification",
    description = "Appends a certification request for an administrator to decide.",
    responses(
        (status = 201, description = "Request recorded", body = CertificationResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "A request is already waiting (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn request_recertification(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    let user = find_user(&txn, auth_user.user_id).await?;
    let certifications = CertificationLogService::new(&txn);
    if certifications
        .latest_for(user.id)
        .await?
        .is_some_and(|c| c.is_open_request())
    {
        return Err(AppError::Conflict(
            "A recertification request is already waiting for a decision".into(),
        ));
    }

    let entry = certifications
        .request(&user, auth_user.remote_ip.clone())
        .await?;
    SecurityLogService::new(&txn)
        .track(
            SecurityAction::RenewalRequest,
            &Actor::from(&auth_user),
            Some(&Target::user(&user)),
            None,
        )
        .await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(CertificationResponse::from(entry))))
}
