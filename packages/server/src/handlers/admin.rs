use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use chrono::{DateTime, Duration, Utc};
use common::{ChallengeStatus, Role, SubmissionStatus, UserStatus};
use sea_orm::*;
use serde_json::json;
use tracing::instrument;

use crate::audit::{Actor, CertificationLogService, SecurityLogService, Target, details};
use crate::entity::security_log::SecurityAction;
use crate::entity::{certification_log, challenge, submission, user};
use crate::error::{AppError, ErrorBody};
use crate::export::csv;
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::account::find_user;
use crate::handlers::challenge::published_statuses;
use crate::handlers::export::csv_attachment;
use crate::models::account::*;
use crate::models::admin::*;
use crate::models::shared::page_params;
use crate::state::AppState;
use crate::workflow::query::{self, SortSpec};

const DEFAULT_USER_SORT: &str = "id:desc";

#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "Admin",
    operation_id = "getAdminDashboard",
    summary = "Record counts for the admin dashboard",
    description = "Requires `dashboard:view` permission.",
    responses(
        (status = 200, description = "Dashboard counts", body = DashboardResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn dashboard(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, AppError> {
    auth_user.require_permission("dashboard:view")?;
    let db = &state.db;

    let live_challenges =
        || challenge::Entity::find().filter(challenge::Column::DeletedAt.is_null());

    Ok(Json(DashboardResponse {
        users_total: user::Entity::find().count(db).await?,
        users_pending: user::Entity::find()
            .filter(user::Column::Status.eq(UserStatus::Pending))
            .count(db)
            .await?,
        challenges_pending: live_challenges()
            .filter(challenge::Column::Status.eq(ChallengeStatus::Pending))
            .count(db)
            .await?,
        challenges_published: live_challenges()
            .filter(challenge::Column::Status.is_in(published_statuses()))
            .count(db)
            .await?,
        submissions_submitted: submission::Entity::find()
            .filter(submission::Column::DeletedAt.is_null())
            .filter(submission::Column::Status.eq(SubmissionStatus::Submitted))
            .count(db)
            .await?,
        certifications_requested: open_certification_requests(db).await?.len() as u64,
    }))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Admin",
    operation_id = "listUsers",
    summary = "List accounts",
    description = "Filters: `role`, `status`, `search` (email or name). Sort columns: `id`, `email`, `first_name`, `last_name`, `role`, `status`, `last_active_at`, `created_at`. Requires `user:manage` permission.",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (default 20, max 100)"),
        ("sort" = Option<String>, Query, description = "Comma-separated `column:direction` terms"),
        ("role" = Option<Role>, Query, description = "Only accounts with this role"),
        ("status" = Option<UserStatus>, Query, description = "Only accounts in this status"),
        ("search" = Option<String>, Query, description = "Case-insensitive match on email and names"),
    ),
    responses(
        (status = 200, description = "Accounts", body = UserListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, params), fields(user_id = auth_user.user_id))]
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<UserListResponse>, AppError> {
    auth_user.require_permission("user:manage")?;

    let (page, per_page) = page_params(&params);
    let sort = SortSpec::from_param(params.get("sort").map(String::as_str), DEFAULT_USER_SORT);
    let select = query::compose(user::Entity::find(), &query::filter_pairs(&params), &sort);
    let (users, pagination) = query::fetch_page(&state.db, select, page, per_page).await?;

    Ok(Json(UserListResponse {
        data: users.into_iter().map(Into::into).collect(),
        pagination,
    }))
}

/// Administrator accounts, and grants of administrator roles, are managed by super admins only.
/// Nobody changes their own standing.
fn require_account_authority(
    auth_user: &AuthUser,
    target: &user::Model,
    new_role: Option<Role>,
) -> Result<(), AppError> {
    if target.id == auth_user.user_id {
        return Err(AppError::PermissionDenied);
    }
    let touches_admin = target.role.is_admin() || new_role.is_some_and(|r| r.is_admin());
    if touches_admin && !auth_user.is_super_admin() {
        return Err(AppError::PermissionDenied);
    }
    Ok(())
}

#[utoipa::path(
    put,
    path = "/users/{id}/role",
    tag = "Admin",
    operation_id = "updateUserRole",
    summary = "Change an account's role",
    description = "Only super admins may grant or revoke `admin` and `super_admin`. Writes a `role_change` security log with the old and new role. Requires `user:manage` permission.",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, role = %payload.role))]
pub async fn update_role(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateRoleRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth_user.require_permission("user:manage")?;

    let txn = state.db.begin().await?;
    let target = find_user(&txn, id).await?;
    require_account_authority(&auth_user, &target, Some(payload.role))?;
    if target.role == payload.role {
        return Ok(Json(target.into()));
    }

    let old_role = target.role;
    let mut active: user::ActiveModel = target.into();
    active.role = Set(payload.role);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    SecurityLogService::new(&txn)
        .track(
            SecurityAction::RoleChange,
            &Actor::from(&auth_user),
            Some(&Target::user(&updated)),
            Some(details([
                ("old", json!(old_role.as_str())),
                ("new", json!(updated.role.as_str())),
            ])),
        )
        .await?;
    txn.commit().await?;

    tracing::info!(target_id = updated.id, old = %old_role, new = %updated.role, "Role changed");
    Ok(Json(updated.into()))
}

#[utoipa::path(
    put,
    path = "/users/{id}/status",
    tag = "Admin",
    operation_id = "updateUserStatus",
    summary = "Change an account's status",
    description = "Activates, suspends, revokes or deactivates an account. Writes a `status_change` security log with the old and new status. Requires `user:manage` permission.",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, status = %payload.status))]
pub async fn update_status(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateStatusRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth_user.require_permission("user:manage")?;

    let txn = state.db.begin().await?;
    let target = find_user(&txn, id).await?;
    require_account_authority(&auth_user, &target, None)?;
    if target.status == payload.status {
        return Ok(Json(target.into()));
    }

    let old_status = target.status;
    let mut active: user::ActiveModel = target.into();
    active.status = Set(payload.status);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    SecurityLogService::new(&txn)
        .track(
            SecurityAction::StatusChange,
            &Actor::from(&auth_user),
            Some(&Target::user(&updated)),
            Some(details([
                ("old", json!(old_status.as_str())),
                ("new", json!(updated.status.as_str())),
            ])),
        )
        .await?;
    txn.commit().await?;

    tracing::info!(target_id = updated.id, old = %old_status, new = %updated.status, "Status changed");
    Ok(Json(updated.into()))
}

/// Latest entry per user, kept where it is an undecided request.
async fn open_certification_requests<C: ConnectionTrait>(
    conn: &C,
) -> Result<Vec<certification_log::Model>, DbErr> {
    let entries = certification_log::Entity::find()
        .order_by_asc(certification_log::Column::Id)
        .all(conn)
        .await?;
    let mut latest: HashMap<i32, certification_log::Model> = HashMap::new();
    for entry in entries {
        latest.insert(entry.user_id, entry);
    }
    let mut open: Vec<_> = latest
        .into_values()
        .filter(certification_log::Model::is_open_request)
        .collect();
    open.sort_by_key(|e| e.id);
    Ok(open)
}

#[utoipa::path(
    get,
    path = "/certifications",
    tag = "Admin",
    operation_id = "listCertificationRequests",
    summary = "List open recertification requests",
    description = "One entry per user whose latest certification log entry is a request without a decision, oldest first. Requires `certification:decide` permission.",
    responses(
        (status = 200, description = "Open requests", body = Vec<CertificationResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_certification_requests(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CertificationResponse>>, AppError> {
    auth_user.require_permission("certification:decide")?;
    let open = open_certification_requests(&state.db).await?;
    Ok(Json(open.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/certifications/{user_id}",
    tag = "Admin",
    operation_id = "decideCertification",
    summary = "Certify or deny a recertification request",
    description = "Appends a certification log entry: `certify` sets `certified_at` and an expiry one year out, `deny` sets `denied_at`. The user must have an open request. Requires `certification:decide` permission.",
    params(("user_id" = i32, Path, description = "User ID")),
    request_body = CertificationDecisionRequest,
    responses(
        (status = 201, description = "Decision recorded", body = CertificationResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "No open request (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, decision = ?payload.decision))]
pub async fn decide_certification(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    AppJson(payload): AppJson<CertificationDecisionRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("certification:decide")?;

    let txn = state.db.begin().await?;
    let target = find_user(&txn, user_id).await?;
    let service = CertificationLogService::new(&txn);
    let open = service
        .latest_for(target.id)
        .await?
        .is_some_and(|entry| entry.is_open_request());
    if !open {
        return Err(AppError::Conflict(
            "User has no open recertification request".into(),
        ));
    }

    let approver = Actor::from(&auth_user);
    let entry = match payload.decision {
        CertificationDecision::Certify => service.certify(&target, &approver).await?,
        CertificationDecision::Deny => service.deny(&target, &approver).await?,
    };
    txn.commit().await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(CertificationResponse::from(entry)),
    ))
}

fn parse_bound(field: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    query::parse_datetime(value)
        .map(Some)
        .ok_or_else(|| AppError::field(field, "must be YYYY-MM-DD or an RFC 3339 timestamp"))
}

/// Resolve the export window. A bare end date covers that whole day.
fn log_range(
    params: &LogExportQuery,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), AppError> {
    let start = parse_bound("start_date", params.start_date.as_deref())?;
    let mut end = parse_bound("end_date", params.end_date.as_deref())?;
    if let Some(at) = end
        && params.end_date.as_deref().map(str::trim).is_some_and(|v| v.len() == 10)
    {
        end = Some(at + Duration::days(1) - Duration::milliseconds(1));
    }
    if let (Some(start), Some(end)) = (start, end)
        && start > end
    {
        return Err(AppError::field("end_date", "must not be before start_date"));
    }
    Ok((start, end))
}

fn log_filename(kind: &str, params: &LogExportQuery) -> String {
    let bound = |v: Option<&str>| {
        v.map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| v.get(..10).unwrap_or(v).to_string())
    };
    match (bound(params.start_date.as_deref()), bound(params.end_date.as_deref())) {
        (Some(start), Some(end)) => format!("{kind}-{start}-to-{end}.csv"),
        (Some(start), None) => format!("{kind}-from-{start}.csv"),
        (None, Some(end)) => format!("{kind}-through-{end}.csv"),
        (None, None) => format!("{kind}.csv"),
    }
}

#[utoipa::path(
    get,
    path = "/logs/security",
    tag = "Admin",
    operation_id = "exportSecurityLog",
    summary = "Download the security log as CSV",
    description = "Entries logged within the optional inclusive date range, oldest first. Requires `log:export` permission.",
    params(LogExportQuery),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 400, description = "Invalid date (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn export_security_log(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<LogExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("log:export")?;
    let (start, end) = log_range(&params)?;
    let entries = SecurityLogService::new(&state.db).list(start, end).await?;
    let body = csv::render(&entries)?;
    Ok(csv_attachment(&log_filename("security-log", &params), body))
}

#[utoipa::path(
    get,
    path = "/logs/certifications",
    tag = "Admin",
    operation_id = "exportCertificationLog",
    summary = "Download the certification log as CSV",
    description = "Entries created within the optional inclusive date range, oldest first. Requires `log:export` permission.",
    params(LogExportQuery),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 400, description = "Invalid date (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn export_certification_log(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<LogExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("log:export")?;
    let (start, end) = log_range(&params)?;
    let entries = CertificationLogService::new(&state.db).list(start, end).await?;
    let body = csv::render(&entries)?;
    Ok(csv_attachment(
        &log_filename("certification-log", &params),
        body,
    ))
}
