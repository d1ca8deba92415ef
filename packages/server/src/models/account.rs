use chrono::{DateTime, Utc};
use common::{Role, UserStatus};
use serde::{Deserialize, Serialize};

use super::auth::validate_password;
use super::shared::{Pagination, double_option};
use crate::entity::user;
use crate::error::FieldErrors;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: i32,
    #[schema(example = "ada@example.com")]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub last_active_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            phone_number: u.phone_number,
            role: u.role,
            status: u.status,
            email_verified_at: u.email_verified_at,
            last_active_at: u.last_active_at,
            created_at: u.created_at,
        }
    }
}

/// Self-service profile update. Changing the password needs the current one.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UpdateAccountRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Send `null` to clear.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub phone_number: Option<Option<String>>,
    #[serde(skip_serializing)]
    pub current_password: Option<String>,
    #[serde(skip_serializing)]
    pub new_password: Option<String>,
}

pub fn validate_update_account(payload: &UpdateAccountRequest) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for (field, value) in [
        ("first_name", &payload.first_name),
        ("last_name", &payload.last_name),
    ] {
        if let Some(name) = value
            && (name.trim().is_empty() || name.chars().count() > 100)
        {
            errors.add(field, "must be 1-100 characters");
        }
    }
    if let Some(Some(phone)) = &payload.phone_number
        && (phone.chars().count() > 32
            || !phone
                .chars()
                .all(|c| c.is_ascii_digit() || " +-().".contains(c)))
    {
        errors.add("phone_number", "must be a phone number");
    }
    if let Some(new_password) = &payload.new_password {
        validate_password(&mut errors, "new_password", new_password);
        if payload.current_password.is_none() {
            errors.add("current_password", "is required to change the password");
        }
    }
    errors
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UpdateStatusRequest {
    pub status: UserStatus,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    pub pagination: Pagination,
}
