use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "phase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub challenge_id: i32,
    pub title: String,
    pub start_date: DateTimeUtc,
    pub end_date: DateTimeUtc,
    pub open_to_submissions: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub judging_criteria: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub how_to_enter: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Submissions may be edited only while the phase end is strictly in the future.
    pub fn is_open_at(&self, now: DateTimeUtc) -> bool {
        self.end_date > now
    }

    /// New submissions need the phase flagged open and `now` inside its window.
    pub fn accepts_submissions_at(&self, now: DateTimeUtc) -> bool {
        self.open_to_submissions && self.start_date <= now && self.is_open_at(now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
