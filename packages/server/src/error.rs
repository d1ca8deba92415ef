use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `INVALID_CREDENTIALS`, `PERMISSION_DENIED`, `NOT_FOUND`,
    /// `CONFLICT`, `EMAIL_TAKEN`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Title must be 1-256 characters")]
    pub message: String,
    /// Field-level messages for rejected form input.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub fields: Option<BTreeMap<String, Vec<String>>>,
    /// The rejected input, echoed back for re-display.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub input: Option<serde_json::Value>,
}

/// Field-level validation messages, keyed by field name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when no messages were collected.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Form {
                errors: self,
                input: None,
            })
        }
    }

    fn summary(&self) -> String {
        self.0
            .iter()
            .flat_map(|(field, messages)| messages.iter().map(move |m| format!("{field}: {m}")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    /// Field-level validation failure, optionally echoing the rejected input.
    Form {
        errors: FieldErrors,
        input: Option<serde_json::Value>,
    },
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    /// Opaque "not permitted"; never carries detail.
    PermissionDenied,
    NotFound(String),
    Conflict(String),
    EmailTaken,
    Internal(String),
}

impl AppError {
    /// Single-field validation failure.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        AppError::Form {
            errors,
            input: None,
        }
    }

    /// Attach the rejected input to a validation failure so the caller can re-display it.
    /// Other errors pass through unchanged.
    pub fn with_input<T: Serialize>(self, input: &T) -> Self {
        match self {
            AppError::Form { errors, .. } => AppError::Form {
                errors,
                input: serde_json::to_value(input).ok(),
            },
            AppError::Validation(message) => {
                let mut errors = FieldErrors::new();
                errors.add("base", message);
                AppError::Form {
                    errors,
                    input: serde_json::to_value(input).ok(),
                }
            }
            other => other,
        }
    }

    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        let simple = |status, code, message: String| {
            (
                status,
                ErrorBody {
                    code,
                    message,
                    fields: None,
                    input: None,
                },
            )
        };

        match self {
            AppError::Validation(msg) => simple(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AppError::Form { errors, input } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: errors.summary(),
                    fields: Some(errors.0),
                    input,
                },
            ),
            AppError::TokenMissing => simple(
                StatusCode::UNAUTHORIZED,
                "TOKEN_MISSING",
                "Authentication required".into(),
            ),
            AppError::TokenInvalid => simple(
                StatusCode::UNAUTHORIZED,
                "TOKEN_INVALID",
                "Invalid or expired token".into(),
            ),
            AppError::InvalidCredentials => simple(
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid email or password".into(),
            ),
            AppError::PermissionDenied => simple(
                StatusCode::FORBIDDEN,
                "PERMISSION_DENIED",
                "Not permitted".into(),
            ),
            AppError::NotFound(msg) => simple(StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::Conflict(msg) => simple(StatusCode::CONFLICT, "CONFLICT", msg),
            AppError::EmailTaken => simple(
                StatusCode::CONFLICT,
                "EMAIL_TAKEN",
                "An account with this email already exists".into(),
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                simple(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred".into(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::workflow::permissions::NotPermitted> for AppError {
    fn from(_: crate::workflow::permissions::NotPermitted) -> Self {
        AppError::PermissionDenied
    }
}
