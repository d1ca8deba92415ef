use sea_orm::entity::prelude::*;
use sea_orm::prelude::StringLen;
use serde::{Deserialize, Serialize};

/// Kind of audited event.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum SecurityAction {
    #[sea_orm(string_value = "accessed_site")]
    AccessedSite,
    #[sea_orm(string_value = "session_duration")]
    SessionDuration,
    #[sea_orm(string_value = "account_update")]
    AccountUpdate,
    #[sea_orm(string_value = "role_change")]
    RoleChange,
    #[sea_orm(string_value = "status_change")]
    StatusChange,
    #[sea_orm(string_value = "renewal_request")]
    RenewalRequest,
    #[sea_orm(string_value = "challenge_status_change")]
    ChallengeStatusChange,
    #[sea_orm(string_value = "challenge_delete")]
    ChallengeDelete,
}

impl SecurityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessedSite => "accessed_site",
            Self::SessionDuration => "session_duration",
            Self::AccountUpdate => "account_update",
            Self::RoleChange => "role_change",
            Self::StatusChange => "status_change",
            Self::RenewalRequest => "renewal_request",
            Self::ChallengeStatusChange => "challenge_status_change",
            Self::ChallengeDelete => "challenge_delete",
        }
    }
}

/// Append-only audit entry. Never updated after insert.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "security_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub action: SecurityAction,
    /// Flat JSON object of key/value details.
    #[sea_orm(column_type = "Json", nullable)]
    pub details: Option<Json>,

    pub originator_id: Option<i32>,
    pub originator_role: Option<String>,
    pub originator_identifier: Option<String>,
    pub originator_remote_ip: Option<String>,

    pub target_id: Option<i32>,
    pub target_type: Option<String>,
    pub target_identifier: Option<String>,

    pub logged_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
