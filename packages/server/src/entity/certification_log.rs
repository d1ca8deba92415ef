use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only record of an account (re)certification request or decision.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "certification_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub approver_id: Option<i32>,
    pub approver_role: Option<String>,
    pub approver_identifier: Option<String>,
    pub approver_remote_ip: Option<String>,

    pub user_id: i32,
    pub user_role: String,
    pub user_identifier: String,
    pub user_remote_ip: Option<String>,

    pub requested_at: Option<DateTimeUtc>,
    pub certified_at: Option<DateTimeUtc>,
    pub expires_at: Option<DateTimeUtc>,
    pub denied_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
}

impl Model {
    /// A request entry; decisions are appended as separate rows.
    pub fn is_open_request(&self) -> bool {
        self.requested_at.is_some() && self.certified_at.is_none() && self.denied_at.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
