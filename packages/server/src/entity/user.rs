use common::{Role, UserStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub status: UserStatus,

    /// SHA-256 of the emailed verification token.
    pub email_verification_token: Option<String>,
    pub email_verified_at: Option<DateTimeUtc>,
    /// SHA-256 of the emailed password reset token.
    pub password_reset_token: Option<String>,
    pub password_reset_expires_at: Option<DateTimeUtc>,
    pub terms_of_use_accepted_at: Option<DateTimeUtc>,
    pub last_active_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
