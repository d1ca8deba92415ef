use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Link between a challenge and one of its owners.
///
/// Owners are revoked by stamping `revoked_at`; the row is kept as history.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "challenge_owner")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub challenge_id: i32,
    pub user_id: i32,
    pub revoked_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn is_current(&self) -> bool {
        self.revoked_at.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
