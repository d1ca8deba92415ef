//! Append-only security and certification logs.

use chrono::{DateTime, Duration, Utc};
use sea_orm::*;
use serde_json::{Map, Value};

use crate::entity::security_log::SecurityAction;
use crate::entity::{certification_log, security_log, user};
use crate::extractors::auth::AuthUser;

/// Certifications last one year.
pub const CERTIFICATION_TTL_DAYS: i64 = 365;

/// Who performed an audited action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: i32,
    pub role: String,
    pub identifier: String,
    pub remote_ip: Option<String>,
}

impl Actor {
    pub fn from_user(user: &user::Model, remote_ip: Option<String>) -> Self {
        Self {
            id: user.id,
            role: user.role.to_string(),
            identifier: user.email.clone(),
            remote_ip,
        }
    }
}

impl From<&AuthUser> for Actor {
    fn from(auth: &AuthUser) -> Self {
        Self {
            id: auth.user_id,
            role: auth.role.to_string(),
            identifier: auth.email.clone(),
            remote_ip: auth.remote_ip.clone(),
        }
    }
}

/// Subject of an audited action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: i32,
    pub kind: &'static str,
    pub identifier: String,
}

impl Target {
    pub fn user(user: &user::Model) -> Self {
        Self {
            id: user.id,
            kind: "user",
            identifier: user.email.clone(),
        }
    }

    pub fn challenge(id: i32, title: &str) -> Self {
        Self {
            id,
            kind: "challenge",
            identifier: title.to_string(),
        }
    }
}

/// Build a flat details object from key/value pairs.
pub fn details<I, K>(pairs: I) -> Value
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    Value::Object(
        pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect::<Map<String, Value>>(),
    )
}

pub struct SecurityLogService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> SecurityLogService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn track(
        &self,
        action: SecurityAction,
        actor: &Actor,
        target: Option<&Target>,
        details: Option<Value>,
    ) -> Result<security_log::Model, DbErr> {
        security_log::ActiveModel {
            action: Set(action),
            details: Set(details),
            originator_id: Set(Some(actor.id)),
            originator_role: Set(Some(actor.role.clone())),
            originator_identifier: Set(Some(actor.identifier.clone())),
            originator_remote_ip: Set(actor.remote_ip.clone()),
            target_id: Set(target.map(|t| t.id)),
            target_type: Set(target.map(|t| t.kind.to_string())),
            target_identifier: Set(target.map(|t| t.identifier.clone())),
            logged_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.conn)
        .await
    }

    /// Entries logged within `[start, end]`, oldest first.
    pub async fn list(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<security_log::Model>, DbErr> {
        let mut query = security_log::Entity::find();
        if let Some(start) = start {
            query = query.filter(security_log::Column::LoggedAt.gte(start));
        }
        if let Some(end) = end {
            query = query.filter(security_log::Column::LoggedAt.lte(end));
        }
        query
            .order_by_asc(security_log::Column::LoggedAt)
            .order_by_asc(security_log::Column::Id)
            .all(self.conn)
            .await
    }
}

pub struct CertificationLogService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> CertificationLogService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    fn base(user: &user::Model, user_ip: Option<String>) -> certification_log::ActiveModel {
        certification_log::ActiveModel {
            user_id: Set(user.id),
            user_role: Set(user.role.to_string()),
            user_identifier: Set(user.email.clone()),
            user_remote_ip: Set(user_ip),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
    }

    fn approved_by(
        mut entry: certification_log::ActiveModel,
        approver: &Actor,
    ) -> certification_log::ActiveModel {
        entry.approver_id = Set(Some(approver.id));
        entry.approver_role = Set(Some(approver.role.clone()));
        entry.approver_identifier = Set(Some(approver.identifier.clone()));
        entry.approver_remote_ip = Set(approver.remote_ip.clone());
        entry
    }

    pub async fn request(
        &self,
        user: &user::Model,
        user_ip: Option<String>,
    ) -> Result<certification_log::Model, DbErr> {
        let mut entry = Self::base(user, user_ip);
        entry.requested_at = Set(Some(Utc::now()));
        entry.insert(self.conn).await
    }

    pub async fn certify(
        &self,
        user: &user::Model,
        approver: &Actor,
    ) -> Result<certification_log::Model, DbErr> {
        let now = Utc::now();
        let mut entry = Self::approved_by(Self::base(user, None), approver);
        entry.certified_at = Set(Some(now));
        entry.expires_at = Set(Some(now + Duration::days(CERTIFICATION_TTL_DAYS)));
        entry.insert(self.conn).await
    }

    pub async fn deny(
        &self,
        user: &user::Model,
        approver: &Actor,
    ) -> Result<certification_log::Model, DbErr> {
        let mut entry = Self::approved_by(Self::base(user, None), approver);
        entry.denied_at = Set(Some(Utc::now()));
        entry.insert(self.conn).await
    }

    /// Most recent entry for `user_id`.
    pub async fn latest_for(
        &self,
        user_id: i32,
    ) -> Result<Option<certification_log::Model>, DbErr> {
        certification_log::Entity::find()
            .filter(certification_log::Column::UserId.eq(user_id))
            .order_by_desc(certification_log::Column::Id)
            .one(self.conn)
            .await
    }

    pub async fn list(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<certification_log::Model>, DbErr> {
        let mut query = certification_log::Entity::find();
        if let Some(start) = start {
            query = query.filter(certification_log::Column::CreatedAt.gte(start));
        }
        if let Some(end) = end {
            query = query.filter(certification_log::Column::CreatedAt.lte(end));
        }
        query
            .order_by_asc(certification_log::Column::CreatedAt)
            .order_by_asc(certification_log::Column::Id)
            .all(self.conn)
            .await
    }
}
