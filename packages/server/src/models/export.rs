use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::submission_export::{self, ExportStatus};

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateExportRequest {
    /// Phases to include; empty means every phase.
    #[serde(default)]
    pub phase_ids: Vec<i32>,
    /// `all` (default) or a judging status, matched the same way as listing filters.
    #[schema(example = "selected")]
    pub judging_status: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ExportResponse {
    pub id: i32,
    pub challenge_id: i32,
    pub phase_ids: Vec<i32>,
    pub judging_status: String,
    pub format: String,
    pub status: ExportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<submission_export::Model> for ExportResponse {
    fn from(e: submission_export::Model) -> Self {
        Self {
            id: e.id,
            challenge_id: e.challenge_id,
            phase_ids: serde_json::from_value(e.phase_ids).unwrap_or_default(),
            judging_status: e.judging_status,
            format: e.format,
            status: e.status,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}
