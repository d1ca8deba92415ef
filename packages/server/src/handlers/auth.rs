use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};
use common::{Role, UserStatus};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set, SqlErr,
    TransactionTrait,
};
use serde_json::json;
use tracing::instrument;

use crate::audit::{Actor, SecurityLogService, details};
use crate::entity::security_log::SecurityAction;
use crate::entity::user;
use crate::error::{AppError, ErrorBody, FieldErrors};
use crate::extractors::auth::{AuthUser, RemoteIp};
use crate::extractors::json::AppJson;
use crate::mailer;
use crate::models::account::UserResponse;
use crate::models::auth::*;
use crate::notifications;
use crate::seed::permissions_for_role;
use crate::state::AppState;
use crate::utils::{hash, jwt};

const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, a reset link has been sent";

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    operation_id = "register",
    summary = "Register a new account",
    description = "Creates a solver (active) or challenge owner (pending activation) account and emails a verification link. Sign-in requires a verified email.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Email already registered (EMAIL_TAKEN)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)
        .into_result()
        .map_err(|e| e.with_input(&payload))?;

    let email = normalize_email(&payload.email);
    let exists = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .count(&state.db)
        .await?;
    if exists > 0 {
        return Err(AppError::EmailTaken);
    }

    let password_hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;
    let token = hash::generate_token();
    let role = payload.role.unwrap_or(Role::Solver);
    let status = if role == Role::ChallengeOwner {
        UserStatus::Pending
    } else {
        UserStatus::Active
    };

    let now = Utc::now();
    let new_user = user::ActiveModel {
        email: Set(email),
        password_hash: Set(password_hash),
        first_name: Set(payload.first_name.trim().to_string()),
        last_name: Set(payload.last_name.trim().to_string()),
        role: Set(role),
        status: Set(status),
        email_verification_token: Set(Some(hash::digest_token(&token))),
        terms_of_use_accepted_at: Set(Some(now)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let user = new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Registration race condition: unique constraint caught on insert");
            AppError::EmailTaken
        }
        _ => AppError::from(e),
    })?;

    mailer::dispatch(
        state.mailer.clone(),
        vec![notifications::email_verification(
            &user,
            &token,
            &state.config.mailer.base_url,
        )],
    );

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[utoipa::path(
    post,
    path = "/verify",
    tag = "Auth",
    operation_id = "verifyEmail",
    summary = "Confirm an email address",
    description = "Consumes the token from the verification email.",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Unknown or used token (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    AppJson(payload): AppJson<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let user = user::Entity::find()
        .filter(user::Column::EmailVerificationToken.eq(hash::digest_token(payload.token.trim())))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::field("token", "is invalid or has already been used"))?;

    let now = Utc::now();
    let mut active: user::ActiveModel = user.into();
    active.email_verification_token = Set(None);
    active.email_verified_at = Set(Some(now));
    active.updated_at = Set(now);
    active.update(&state.db).await?;

    Ok(Json(MessageResponse::new("Email verified")))
}

#[utoipa::path(
    post,
    path = "/password/forgot",
    tag = "Auth",
    operation_id = "forgotPassword",
    summary = "Request a password reset",
    description = "Emails a reset link valid for one hour. The response is the same whether or not the account exists.",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Request accepted", body = MessageResponse),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let user = user::Entity::find()
        .filter(user::Column::Email.eq(normalize_email(&payload.email)))
        .one(&state.db)
        .await?;

    if let Some(user) = user.filter(|u| u.status.can_sign_in()) {
        let token = hash::generate_token();
        let now = Utc::now();
        let mut active: user::ActiveModel = user.into();
        active.password_reset_token = Set(Some(hash::digest_token(&token)));
        active.password_reset_expires_at = Set(Some(
            now + Duration::minutes(state.config.auth.reset_token_ttl_minutes),
        ));
        active.updated_at = Set(now);
        let user = active.update(&state.db).await?;

        mailer::dispatch(
            state.mailer.clone(),
            vec![notifications::password_reset(
                &user,
                &token,
                &state.config.mailer.base_url,
            )],
        );
    }

    Ok(Json(MessageResponse::new(FORGOT_PASSWORD_MESSAGE)))
}

#[utoipa::path(
    post,
    path = "/password/reset",
    tag = "Auth",
    operation_id = "resetPassword",
    summary = "Set a new password with a reset token",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid or expired token, weak password (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let mut errors = FieldErrors::new();
    validate_password(&mut errors, "password", &payload.password);
    errors.into_result()?;

    let now = Utc::now();
    let user = user::Entity::find()
        .filter(user::Column::PasswordResetToken.eq(hash::digest_token(payload.token.trim())))
        .filter(user::Column::PasswordResetExpiresAt.gt(now))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::field("token", "is invalid or has expired"))?;

    let password_hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let mut active: user::ActiveModel = user.into();
    active.password_hash = Set(password_hash);
    active.password_reset_token = Set(None);
    active.password_reset_expires_at = Set(None);
    active.updated_at = Set(now);
    active.update(&state.db).await?;

    Ok(Json(MessageResponse::new("Password changed")))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Sign in",
    description = "Checks the password and returns a bearer token carrying the user's role and permissions. Suspended, revoked and deactivated accounts are refused; accounts pending activation sign in without permissions.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Email not verified (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Wrong email or password (INVALID_CREDENTIALS)", body = ErrorBody),
        (status = 403, description = "Account disabled (PERMISSION_DENIED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, remote_ip, payload), fields(email = %payload.email))]
pub async fn login(
    State(state): State<AppState>,
    RemoteIp(remote_ip): RemoteIp,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = user::Entity::find()
        .filter(user::Column::Email.eq(normalize_email(&payload.email)))
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = hash::verify_password(&payload.password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;
    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }
    if !user.status.can_sign_in() {
        return Err(AppError::PermissionDenied);
    }
    if user.email_verified_at.is_none() {
        return Err(AppError::field("email", "must be verified before signing in"));
    }

    let permissions = if user.status == UserStatus::Active {
        permissions_for_role(&state.db, user.role.as_str()).await?
    } else {
        Vec::new()
    };

    let token = jwt::sign(
        user.id,
        &user.email,
        user.role.as_str(),
        permissions.clone(),
        state.config.auth.token_ttl_days,
        &state.config.auth.jwt_secret,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    let txn = state.db.begin().await?;
    SecurityLogService::new(&txn)
        .track(
            SecurityAction::AccessedSite,
            &Actor::from_user(&user, remote_ip),
            None,
            None,
        )
        .await?;
    let mut active: user::ActiveModel = user.into();
    active.last_active_at = Set(Some(Utc::now()));
    let user = active.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
        permissions,
    }))
}

#[utoipa::path(
    post,
    path = "/logout",
    tag = "Auth",
    operation_id = "logout",
    summary = "Sign out",
    description = "Records how long the session lasted. The token itself stays valid until it expires.",
    responses(
        (status = 204, description = "Signed out"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn logout(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let now = Utc::now();
    let duration = std::cmp::max((now - auth_user.issued_at).num_seconds(), 0);

    let txn = state.db.begin().await?;
    SecurityLogService::new(&txn)
        .track(
            SecurityAction::SessionDuration,
            &Actor::from(&auth_user),
            None,
            Some(details([("duration", json!(duration))])),
        )
        .await?;
    user::Entity::update_many()
        .col_expr(
            user::Column::LastActiveAt,
            sea_orm::prelude::Expr::value(Some(now)),
        )
        .filter(user::Column::Id.eq(auth_user.user_id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
