use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::agency;
use crate::error::FieldErrors;

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateAgencyRequest {
    #[schema(example = "General Services Administration")]
    pub name: String,
    #[schema(example = "GSA")]
    pub acronym: Option<String>,
}

pub fn validate_create_agency(payload: &CreateAgencyRequest) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let name = payload.name.trim();
    if name.is_empty() || name.chars().count() > 256 {
        errors.add("name", "must be 1-256 characters");
    }
    if let Some(acronym) = &payload.acronym
        && acronym.chars().count() > 32
    {
        errors.add("acronym", "must be at most 32 characters");
    }
    errors
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AgencyResponse {
    pub id: i32,
    pub name: String,
    pub acronym: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<agency::Model> for AgencyResponse {
    fn from(a: agency::Model) -> Self {
        Self {
            id: a.id,
            name: a.name,
            acronym: a.acronym,
            created_at: a.created_at,
        }
    }
}
