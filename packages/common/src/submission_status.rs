#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ParseEnumError;

/// Lifecycle status of a solver submission.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Saved but not yet handed in.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "draft"))]
    Draft,
    /// Handed in for judging.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "submitted"))]
    Submitted,
}

impl SubmissionStatus {
    pub const ALL: &'static [SubmissionStatus] = &[Self::Draft, Self::Submitted];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
        }
    }
}

impl Default for SubmissionStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("submission status", s, Self::ALL))
    }
}

/// Review outcome of a submission, ordered from weakest to strongest.
///
/// Each stage implies the ones before it: a winner was also selected,
/// and a selected submission was also qualified.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum JudgingStatus {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "not_selected"))]
    NotSelected,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "qualified"))]
    Qualified,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "selected"))]
    Selected,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "winner"))]
    Winner,
}

impl JudgingStatus {
    pub const ALL: &'static [JudgingStatus] = &[
        Self::NotSelected,
        Self::Qualified,
        Self::Selected,
        Self::Winner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotSelected => "not_selected",
            Self::Qualified => "qualified",
            Self::Selected => "selected",
            Self::Winner => "winner",
        }
    }

    /// Statuses a listing filter for `self` should match.
    ///
    /// `not_selected` matches only itself; every other stage also matches
    /// the stages above it.
    pub fn matching(&self) -> Vec<JudgingStatus> {
        match self {
            Self::NotSelected => vec![Self::NotSelected],
            stage => Self::ALL
                .iter()
                .copied()
                .filter(|s| s >= stage)
                .collect(),
        }
    }
}

impl Default for JudgingStatus {
    fn default() -> Self {
        Self::NotSelected
    }
}

impl fmt::Display for JudgingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JudgingStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("judging status", s, Self::ALL))
    }
}
