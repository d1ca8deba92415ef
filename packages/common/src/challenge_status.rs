#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ParseEnumError;

/// Review and publication status of a challenge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    /// Being written in the wizard.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "draft"))]
    Draft,
    /// Handed in by its owners, waiting for an administrator.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "pending"))]
    Pending,
    /// Under GSA review.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "gsa_review"))]
    GsaReview,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "approved"))]
    Approved,
    /// Published.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "created"))]
    Created,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "champion_assigned"))]
    ChampionAssigned,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "design"))]
    Design,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "vetted"))]
    Vetted,
    /// Sent back to its owners with a rejection message.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "rejected"))]
    Rejected,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "archived"))]
    Archived,
}

impl ChallengeStatus {
    pub const ALL: &'static [ChallengeStatus] = &[
        Self::Draft,
        Self::Pending,
        Self::GsaReview,
        Self::Approved,
        Self::Created,
        Self::ChampionAssigned,
        Self::Design,
        Self::Vetted,
        Self::Rejected,
        Self::Archived,
    ];

    /// Statuses whose arrival is recorded on the challenge timeline.
    pub const TIMELINE: &'static [ChallengeStatus] = &[
        Self::Created,
        Self::ChampionAssigned,
        Self::Design,
        Self::Vetted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::GsaReview => "gsa_review",
            Self::Approved => "approved",
            Self::Created => "created",
            Self::ChampionAssigned => "champion_assigned",
            Self::Design => "design",
            Self::Vetted => "vetted",
            Self::Rejected => "rejected",
            Self::Archived => "archived",
        }
    }

    /// Human-readable label used for timeline events and exports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Pending => "Pending",
            Self::GsaReview => "GSA review",
            Self::Approved => "Approved",
            Self::Created => "Created",
            Self::ChampionAssigned => "Champion assigned",
            Self::Design => "Design",
            Self::Vetted => "Vetted",
            Self::Rejected => "Rejected",
            Self::Archived => "Archived",
        }
    }

    /// Returns true if reaching this status appends a timeline event.
    pub fn records_timeline_event(&self) -> bool {
        Self::TIMELINE.contains(self)
    }

    /// Returns true while the challenge is still with its owners or reviewers
    /// and has not been published.
    pub fn is_unpublished(&self) -> bool {
        matches!(
            self,
            Self::Draft | Self::Pending | Self::GsaReview | Self::Approved | Self::Rejected
        )
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChallengeStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("challenge status", s, Self::ALL))
    }
}

/// Public lifecycle of a published challenge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeSubStatus {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "open"))]
    Open,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "closed"))]
    Closed,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "archived"))]
    Archived,
}

impl ChallengeSubStatus {
    pub const ALL: &'static [ChallengeSubStatus] = &[Self::Open, Self::Closed, Self::Archived];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for ChallengeSubStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChallengeSubStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("challenge sub-status", s, Self::ALL))
    }
}
