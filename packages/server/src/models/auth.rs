use common::Role;
use serde::{Deserialize, Serialize};

use super::account::UserResponse;
use crate::error::FieldErrors;

/// Request body for account registration.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    #[serde(skip_serializing)]
    pub password: String,
    #[schema(example = "Ada")]
    pub first_name: String,
    #[schema(example = "Lovelace")]
    pub last_name: String,
    /// `solver` (default) or `challenge_owner`.
    pub role: Option<Role>,
    #[serde(default)]
    pub terms_accepted: bool,
}

/// Loose shape check: one `@`, something on both sides, a dot in the domain.
pub fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.contains(char::is_whitespace)
}

pub fn validate_password(errors: &mut FieldErrors, field: &str, password: &str) {
    let len = password.chars().count();
    if !(8..=128).contains(&len) {
        errors.add(field, "must be 8-128 characters");
    }
}

fn validate_name(errors: &mut FieldErrors, field: &str, name: &str) {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 100 {
        errors.add(field, "must be 1-100 characters");
    }
}

pub fn validate_register_request(payload: &RegisterRequest) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if !is_email(payload.email.trim()) {
        errors.add("email", "must be a valid email address");
    }
    validate_password(&mut errors, "password", &payload.password);
    validate_name(&mut errors, "first_name", &payload.first_name);
    validate_name(&mut errors, "last_name", &payload.last_name);
    if payload.role.is_some_and(|r| r.is_admin()) {
        errors.add("role", "must be solver or challenge_owner");
    }
    if !payload.terms_accepted {
        errors.add("terms_accepted", "must be accepted");
    }
    errors
}

/// Request body for login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

/// Successful login response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    pub user: UserResponse,
    /// Permissions granted to the user's role.
    #[schema(example = json!(["submission:submit"]))]
    pub permissions: Vec<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct VerifyEmailRequest {
    /// Token from the verification email.
    pub token: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ForgotPasswordRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ResetPasswordRequest {
    /// Token from the reset email.
    pub token: String,
    pub password: String,
}

/// Plain acknowledgement.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    #[schema(example = "If the account exists, a reset email is on its way")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
