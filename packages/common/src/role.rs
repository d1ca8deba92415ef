#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ParseEnumError;

/// Role classification of a portal account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Registers for challenges and submits solutions.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "solver"))]
    Solver,
    /// Agency staff who write and manage challenges.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "challenge_owner"))]
    ChallengeOwner,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "admin"))]
    Admin,
    /// Admin who may also grant and revoke admin roles.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "super_admin"))]
    SuperAdmin,
}

impl Role {
    pub const ALL: &'static [Role] = &[
        Self::Solver,
        Self::ChallengeOwner,
        Self::Admin,
        Self::SuperAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solver => "solver",
            Self::ChallengeOwner => "challenge_owner",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    pub fn is_solver(&self) -> bool {
        matches!(self, Self::Solver)
    }

    pub fn is_challenge_owner(&self) -> bool {
        matches!(self, Self::ChallengeOwner)
    }

    /// Admins and super admins.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }

    pub fn is_super_admin(&self) -> bool {
        matches!(self, Self::SuperAdmin)
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Solver
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("role", s, Self::ALL))
    }
}

/// Account standing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Waiting for an administrator to activate the account.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "pending"))]
    Pending,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "active"))]
    Active,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "suspended"))]
    Suspended,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "revoked"))]
    Revoked,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "deactivated"))]
    Deactivated,
}

impl UserStatus {
    pub const ALL: &'static [UserStatus] = &[
        Self::Pending,
        Self::Active,
        Self::Suspended,
        Self::Revoked,
        Self::Deactivated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Revoked => "revoked",
            Self::Deactivated => "deactivated",
        }
    }

    /// Returns true if an account in this status may sign in.
    pub fn can_sign_in(&self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("user status", s, Self::ALL))
    }
}
