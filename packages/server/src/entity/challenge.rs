use common::{ChallengeStatus, ChallengeSubStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "challenge")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub uuid: Uuid,

    pub title: String,
    pub tagline: Option<String>,
    pub brief_description: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub status: ChallengeStatus,
    /// Only meaningful once the challenge has been published.
    pub sub_status: Option<ChallengeSubStatus>,

    pub agency_id: Option<i32>,
    /// Account that started the challenge.
    pub user_id: i32,
    /// Wizard section the owner last saved.
    pub last_section: Option<String>,

    pub fiscal_year: Option<String>,
    pub external_url: Option<String>,

    /// Total cash prize in cents.
    pub prize_total: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub prize_description: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub non_monetary_prizes: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub eligibility_requirements: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub rules: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub terms_and_conditions: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub judging_criteria: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub how_to_enter: Option<String>,

    pub logo_key: Option<String>,
    pub logo_alt_text: Option<String>,
    pub winner_image_key: Option<String>,

    /// Derived from the earliest phase start.
    pub start_date: Option<DateTimeUtc>,
    /// Derived from the latest phase end.
    pub end_date: Option<DateTimeUtc>,
    pub published_on: Option<DateTimeUtc>,
    #[sea_orm(column_type = "Text", nullable)]
    pub rejection_message: Option<String>,

    pub deleted_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Archived either by status or by public lifecycle.
    pub fn is_archived(&self) -> bool {
        self.status == ChallengeStatus::Archived
            || self.sub_status == Some(ChallengeSubStatus::Archived)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::agency::Entity",
        from = "Column::AgencyId",
        to = "super::agency::Column::Id"
    )]
    Agency,
}

impl Related<super::agency::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Agency.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
