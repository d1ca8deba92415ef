use sea_orm::entity::prelude::*;
use sea_orm::prelude::StringLen;
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    /// Content reflects the submissions at generation time.
    #[sea_orm(string_value = "completed")]
    Completed,
    /// A submission changed after generation; regenerate before use.
    #[sea_orm(string_value = "outdated")]
    Outdated,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission_export")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub challenge_id: i32,
    /// JSON array of phase IDs included in the export.
    #[sea_orm(column_type = "Json")]
    pub phase_ids: Json,
    /// `all` or a judging status; the same matching rules as listing filters apply.
    pub judging_status: String,
    pub format: String,
    pub status: ExportStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
