//! Filter and sort composition for listings.
//!
//! Filters arrive as `(attribute, value)` pairs and are folded into the query
//! one at a time; unknown attributes and unparsable values are ignored. A sort
//! specification is a list of `column:direction` terms. Terms with an unknown
//! direction add no ordering. Virtual columns join the related table before
//! ordering, and unknown columns order by primary key descending.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use common::{
    ChallengeStatus, ChallengeSubStatus, JudgingStatus, Role, SubmissionStatus, UserStatus,
};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, ExprTrait, JoinType, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select,
};

use crate::entity::{agency, challenge, phase, submission, user};
use crate::models::shared::{Pagination, escape_like};

/// Query parameters that are not filters.
pub const RESERVED_PARAMS: &[&str] = &["page", "per_page", "sort"];

/// Split raw query parameters into filter pairs, dropping reserved keys and blank values.
pub fn filter_pairs(params: &HashMap<String, String>) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .filter(|(k, v)| !RESERVED_PARAMS.contains(&k.as_str()) && !v.trim().is_empty())
        .map(|(k, v)| (k.clone(), v.trim().to_string()))
        .collect();
    pairs.sort();
    pairs
}

/// Parsed `column:direction` terms, in order, without duplicate columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortSpec(Vec<(String, Option<Order>)>);

impl SortSpec {
    /// Parse `title:asc,phase_title:desc`. A direction other than `asc`/`desc`
    /// is kept as `None` so the term is skipped when ordering.
    pub fn parse(raw: &str) -> Self {
        let mut seen = HashSet::new();
        let terms = raw
            .split(',')
            .filter_map(|term| {
                let term = term.trim();
                if term.is_empty() {
                    return None;
                }
                let (column, direction) = term.split_once(':').unwrap_or((term, "asc"));
                let order = match direction.trim().to_ascii_lowercase().as_str() {
                    "asc" => Some(Order::Asc),
                    "desc" => Some(Order::Desc),
                    _ => None,
                };
                Some((column.trim().to_string(), order))
            })
            .filter(|(column, _)| seen.insert(column.clone()))
            .collect();
        Self(terms)
    }

    pub fn from_param(raw: Option<&str>, default: &str) -> Self {
        Self::parse(raw.unwrap_or(default))
    }

    pub fn terms(&self) -> &[(String, Option<Order>)] {
        &self.0
    }
}

/// A listing that supports filter and sort composition.
pub trait Listing: EntityTrait {
    fn apply_filter(query: Select<Self>, key: &str, value: &str) -> Select<Self>;
    fn apply_sort(query: Select<Self>, column: &str, order: Order) -> Select<Self>;
}

pub fn apply_filters<E: Listing>(query: Select<E>, filters: &[(String, String)]) -> Select<E> {
    filters
        .iter()
        .fold(query, |q, (key, value)| E::apply_filter(q, key, value))
}

pub fn apply_sort<E: Listing>(query: Select<E>, sort: &SortSpec) -> Select<E> {
    sort.terms()
        .iter()
        .fold(query, |q, (column, order)| match order {
            Some(order) => E::apply_sort(q, column, order.clone()),
            None => q,
        })
}

pub fn compose<E: Listing>(
    query: Select<E>,
    filters: &[(String, String)],
    sort: &SortSpec,
) -> Select<E> {
    apply_sort(apply_filters(query, filters), sort)
}

/// One page of `query` plus pagination metadata. `page` is 1-based.
pub async fn fetch_page<E, C>(
    conn: &C,
    query: Select<E>,
    page: u64,
    per_page: u64,
) -> Result<(Vec<E::Model>, Pagination), DbErr>
where
    E: EntityTrait,
    E::Model: Sync,
    C: ConnectionTrait,
{
    let paginator = query.paginate(conn, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page.saturating_sub(1)).await?;
    Ok((items, Pagination::new(page, per_page, total)))
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn like_pattern(value: &str) -> Option<String> {
    let term = escape_like(value.trim());
    (!term.is_empty()).then(|| format!("%{}%", term.to_lowercase()))
}

impl Listing for challenge::Entity {
    fn apply_filter(query: Select<Self>, key: &str, value: &str) -> Select<Self> {
        match key {
            "search" => match like_pattern(value) {
                Some(pattern) => query.filter(
                    Condition::any()
                        .add(
                            Expr::expr(Func::lower(Expr::col((
                                challenge::Entity,
                                challenge::Column::Title,
                            ))))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                        )
                        .add(
                            Expr::expr(Func::lower(Expr::col((
                                challenge::Entity,
                                challenge::Column::Tagline,
                            ))))
                            .like(LikeExpr::new(pattern).escape('\\')),
                        ),
                ),
                None => query,
            },
            "status" => match value.parse::<ChallengeStatus>() {
                Ok(status) => query.filter(challenge::Column::Status.eq(status)),
                Err(_) => query,
            },
            "sub_status" => match value.parse::<ChallengeSubStatus>() {
                Ok(sub_status) => query.filter(challenge::Column::SubStatus.eq(sub_status)),
                Err(_) => query,
            },
            "agency_id" => match value.parse::<i32>() {
                Ok(id) => query.filter(challenge::Column::AgencyId.eq(id)),
                Err(_) => query,
            },
            "user_id" => match value.parse::<i32>() {
                Ok(id) => query.filter(challenge::Column::UserId.eq(id)),
                Err(_) => query,
            },
            "start_date_start" => match parse_datetime(value) {
                Some(at) => query.filter(challenge::Column::StartDate.gte(at)),
                None => query,
            },
            "start_date_end" => match parse_datetime(value) {
                Some(at) => query.filter(challenge::Column::StartDate.lte(at)),
                None => query,
            },
            "end_date_start" => match parse_datetime(value) {
                Some(at) => query.filter(challenge::Column::EndDate.gte(at)),
                None => query,
            },
            "end_date_end" => match parse_datetime(value) {
                Some(at) => query.filter(challenge::Column::EndDate.lte(at)),
                None => query,
            },
            _ => query,
        }
    }

    fn apply_sort(query: Select<Self>, column: &str, order: Order) -> Select<Self> {
        match column {
            "id" => query.order_by(challenge::Column::Id, order),
            "title" => query.order_by(challenge::Column::Title, order),
            "status" => query.order_by(challenge::Column::Status, order),
            "start_date" => query.order_by(challenge::Column::StartDate, order),
            "end_date" => query.order_by(challenge::Column::EndDate, order),
            "created_at" => query.order_by(challenge::Column::CreatedAt, order),
            "updated_at" => query.order_by(challenge::Column::UpdatedAt, order),
            "agency_name" => query
                .join(JoinType::LeftJoin, challenge::Relation::Agency.def())
                .order_by(agency::Column::Name, order),
            _ => query.order_by(challenge::Column::Id, Order::Desc),
        }
    }
}

impl Listing for submission::Entity {
    fn apply_filter(query: Select<Self>, key: &str, value: &str) -> Select<Self> {
        match key {
            "search" => match like_pattern(value) {
                Some(pattern) => query.filter(
                    Expr::expr(Func::lower(Expr::col((
                        submission::Entity,
                        submission::Column::Title,
                    ))))
                    .like(LikeExpr::new(pattern).escape('\\')),
                ),
                None => query,
            },
            "status" => match value.parse::<SubmissionStatus>() {
                Ok(status) => query.filter(submission::Column::Status.eq(status)),
                Err(_) => query,
            },
            "judging_status" => match value.parse::<JudgingStatus>() {
                Ok(status) => {
                    query.filter(submission::Column::JudgingStatus.is_in(status.matching()))
                }
                Err(_) => query,
            },
            "challenge_id" => match value.parse::<i32>() {
                Ok(id) => query.filter(submission::Column::ChallengeId.eq(id)),
                Err(_) => query,
            },
            "phase_id" => match value.parse::<i32>() {
                Ok(id) => query.filter(submission::Column::PhaseId.eq(id)),
                Err(_) => query,
            },
            "submitter_id" => match value.parse::<i32>() {
                Ok(id) => query.filter(submission::Column::SubmitterId.eq(id)),
                Err(_) => query,
            },
            "manager_id" => match value.parse::<i32>() {
                Ok(id) => query.filter(submission::Column::ManagerId.eq(id)),
                Err(_) => query,
            },
            _ => query,
        }
    }

    fn apply_sort(query: Select<Self>, column: &str, order: Order) -> Select<Self> {
        match column {
            "id" => query.order_by(submission::Column::Id, order),
            "title" => query.order_by(submission::Column::Title, order),
            "status" => query.order_by(submission::Column::Status, order),
            "judging_status" => query.order_by(submission::Column::JudgingStatus, order),
            "created_at" => query.order_by(submission::Column::CreatedAt, order),
            "updated_at" => query.order_by(submission::Column::UpdatedAt, order),
            "challenge_title" => query
                .join(JoinType::LeftJoin, submission::Relation::Challenge.def())
                .order_by(challenge::Column::Title, order),
            "phase_title" => query
                .join(JoinType::LeftJoin, submission::Relation::Phase.def())
                .order_by(phase::Column::Title, order),
            "manager_last_name" => query
                .join(JoinType::LeftJoin, submission::Relation::Manager.def())
                .order_by(user::Column::LastName, order),
            _ => query.order_by(submission::Column::Id, Order::Desc),
        }
    }
}

impl Listing for user::Entity {
    fn apply_filter(query: Select<Self>, key: &str, value: &str) -> Select<Self> {
        match key {
            "search" => match like_pattern(value) {
                Some(pattern) => {
                    let like = |column: user::Column| {
                        Expr::expr(Func::lower(Expr::col((user::Entity, column))))
                            .like(LikeExpr::new(pattern.clone()).escape('\\'))
                    };
                    query.filter(
                        Condition::any()
                            .add(like(user::Column::Email))
                            .add(like(user::Column::FirstName))
                            .add(like(user::Column::LastName)),
                    )
                }
                None => query,
            },
            "role" => match value.parse::<Role>() {
                Ok(role) => query.filter(user::Column::Role.eq(role)),
                Err(_) => query,
            },
            "status" => match value.parse::<UserStatus>() {
                Ok(status) => query.filter(user::Column::Status.eq(status)),
                Err(_) => query,
            },
            _ => query,
        }
    }

    fn apply_sort(query: Select<Self>, column: &str, order: Order) -> Select<Self> {
        match column {
            "id" => query.order_by(user::Column::Id, order),
            "email" => query.order_by(user::Column::Email, order),
            "first_name" => query.order_by(user::Column::FirstName, order),
            "last_name" => query.order_by(user::Column::LastName, order),
            "role" => query.order_by(user::Column::Role, order),
            "status" => query.order_by(user::Column::Status, order),
            "last_active_at" => query.order_by(user::Column::LastActiveAt, order),
            "created_at" => query.order_by(user::Column::CreatedAt, order),
            _ => query.order_by(user::Column::Id, Order::Desc),
        }
    }
}
