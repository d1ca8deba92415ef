use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Partner agency of a challenge. Revoked rather than deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "federal_partner")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub challenge_id: i32,
    pub agency_id: i32,
    pub revoked_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
