use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::certification_log;

/// Record counts shown on the admin dashboard.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DashboardResponse {
    pub users_total: u64,
    /// Accounts waiting for activation.
    pub users_pending: u64,
    /// Challenges handed in and waiting for review.
    pub challenges_pending: u64,
    pub challenges_published: u64,
    pub submissions_submitted: u64,
    /// Recertification requests without a decision.
    pub certifications_requested: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CertificationDecision {
    Certify,
    Deny,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CertificationDecisionRequest {
    pub decision: CertificationDecision,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CertificationResponse {
    pub id: i32,
    pub user_id: i32,
    pub approver_id: Option<i32>,
    pub requested_at: Option<DateTime<Utc>>,
    pub certified_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub denied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<certification_log::Model> for CertificationResponse {
    fn from(c: certification_log::Model) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            approver_id: c.approver_id,
            requested_at: c.requested_at,
            certified_at: c.certified_at,
            expires_at: c.expires_at,
            denied_at: c.denied_at,
            created_at: c.created_at,
        }
    }
}

/// Date range for log exports; both ends inclusive and optional.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct LogExportQuery {
    /// `YYYY-MM-DD` or RFC 3339.
    pub start_date: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339.
    pub end_date: Option<String>,
}
