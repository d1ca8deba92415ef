use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Metadata of an uploaded file. The bytes live in external storage under `key`.
///
/// A document is attached to at most one challenge or one submission.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Uploader.
    pub user_id: i32,
    pub challenge_id: Option<i32>,
    pub submission_id: Option<i32>,

    pub filename: String,
    pub extension: String,
    #[sea_orm(unique)]
    pub key: String,
    pub name: Option<String>,
    /// Wizard section the document was attached from, e.g. `resources`.
    pub section: Option<String>,

    pub deleted_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn is_attached(&self) -> bool {
        self.challenge_id.is_some() || self.submission_id.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
