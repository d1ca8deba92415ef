use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::ChallengeStatus;
use sea_orm::*;
use tracing::instrument;

use crate::audit::Actor;
use crate::entity::{challenge, challenge_owner};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::mailer;
use crate::models::challenge::*;
use crate::models::document::DocumentResponse;
use crate::models::shared::page_params;
use crate::notifications;
use crate::state::AppState;
use crate::workflow::challenges::ChallengeService;
use crate::workflow::documents::{self, AttachTarget};
use crate::workflow::permissions::{Caller, can_edit_challenge, can_view_challenge};
use crate::workflow::query::{SortSpec, compose, fetch_page, filter_pairs};
use crate::workflow::status::Transition;
use crate::workflow::wizard::{check_complete, validate_all};

const DEFAULT_SORT: &str = "id:desc";

/// Statuses anyone may see.
pub(crate) fn published_statuses() -> Vec<ChallengeStatus> {
    ChallengeStatus::ALL
        .iter()
        .copied()
        .filter(|s| !s.is_unpublished())
        .collect()
}

/// Challenge IDs the user currently owns.
pub(crate) async fn owned_challenge_ids<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Vec<i32>, DbErr> {
    Ok(challenge_owner::Entity::find()
        .filter(challenge_owner::Column::UserId.eq(user_id))
        .filter(challenge_owner::Column::RevokedAt.is_null())
        .all(conn)
        .await?
        .into_iter()
        .map(|o| o.challenge_id)
        .collect())
}

/// Detail response with every relation loaded.
pub(crate) async fn challenge_response<C: ConnectionTrait>(
    conn: &C,
    challenge: challenge::Model,
) -> Result<ChallengeResponse, AppError> {
    let relations = ChallengeService::new(conn).relations(&challenge).await?;
    Ok(ChallengeResponse::new(challenge, relations))
}

/// Live challenge the caller may see, plus whether they currently own it.
pub(crate) async fn find_visible<C: ConnectionTrait>(
    conn: &C,
    auth_user: &AuthUser,
    id: i32,
) -> Result<(challenge::Model, bool), AppError> {
    let service = ChallengeService::new(conn);
    let challenge = service.find(id).await?;
    let is_owner = service.is_owner(id, auth_user.user_id).await?;
    if can_view_challenge(Caller::from(auth_user), &challenge, is_owner).is_err() {
        return Err(AppError::NotFound("Challenge not found".into()));
    }
    Ok((challenge, is_owner))
}

/// Lock a challenge the caller may edit.
async fn find_editable<C: ConnectionTrait>(
    conn: &C,
    auth_user: &AuthUser,
    id: i32,
) -> Result<challenge::Model, AppError> {
    let service = ChallengeService::new(conn);
    let challenge = service.find_for_update(id).await?;
    let is_owner = service.is_owner(id, auth_user.user_id).await?;
    can_edit_challenge(Caller::from(auth_user), &challenge, is_owner)?;
    Ok(challenge)
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Challenges",
    operation_id = "listChallenges",
    summary = "List challenges",
    description = "Administrators see every live challenge; everyone else sees published challenges plus the ones they created or own. Any query parameter other than `page`, `per_page` and `sort` is a filter: `search`, `status`, `sub_status`, `agency_id`, `user_id`, `start_date_start`, `start_date_end`, `end_date_start`, `end_date_end`. Unknown filters are ignored. `sort` takes `column:direction` terms separated by commas; columns are `id`, `title`, `status`, `start_date`, `end_date`, `created_at`, `updated_at` and `agency_name`.",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (default 20, max 100)"),
        ("sort" = Option<String>, Query, description = "Sort terms, e.g. `agency_name:asc,title:desc`"),
    ),
    responses(
        (status = 200, description = "Page of challenges", body = ChallengeListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, params), fields(user_id = auth_user.user_id))]
pub async fn list_challenges(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ChallengeListResponse>, AppError> {
    let (page, per_page) = page_params(&params);
    let mut select = challenge::Entity::find().filter(challenge::Column::DeletedAt.is_null());
    if !auth_user.is_admin() {
        let owned = owned_challenge_ids(&state.db, auth_user.user_id).await?;
        select = select.filter(
            Condition::any()
                .add(challenge::Column::Status.is_in(published_statuses()))
                .add(challenge::Column::UserId.eq(auth_user.user_id))
                .add(challenge::Column::Id.is_in(owned)),
        );
    }
    let select = compose(
        select,
        &filter_pairs(&params),
        &SortSpec::from_param(params.get("sort").map(String::as_str), DEFAULT_SORT),
    );
    let (rows, pagination) = fetch_page(&state.db, select, page, per_page).await?;

    Ok(Json(ChallengeListResponse {
        data: rows.into_iter().map(Into::into).collect(),
        pagination,
    }))
}

#[utoipa::path(
    get,
    path = "/public",
    tag = "Challenges",
    operation_id = "listPublicChallenges",
    summary = "List published challenges",
    description = "Unauthenticated listing of published challenges. Accepts the same filters and sort terms as the authenticated listing.",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (default 20, max 100)"),
        ("sort" = Option<String>, Query, description = "Sort terms, e.g. `end_date:asc`"),
    ),
    responses(
        (status = 200, description = "Page of challenges", body = ChallengeListResponse),
    ),
)]
#[instrument(skip(state, params))]
pub async fn list_public_challenges(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ChallengeListResponse>, AppError> {
    let (page, per_page) = page_params(&params);
    let select = challenge::Entity::find()
        .filter(challenge::Column::DeletedAt.is_null())
        .filter(challenge::Column::Status.is_in(published_statuses()));
    let select = compose(
        select,
        &filter_pairs(&params),
        &SortSpec::from_param(params.get("sort").map(String::as_str), DEFAULT_SORT),
    );
    let (rows, pagination) = fetch_page(&state.db, select, page, per_page).await?;

    Ok(Json(ChallengeListResponse {
        data: rows.into_iter().map(Into::into).collect(),
        pagination,
    }))
}

#[utoipa::path(
    get,
    path = "/public/{id}",
    tag = "Challenges",
    operation_id = "getPublicChallenge",
    summary = "Get a published challenge",
    params(("id" = i32, Path, description = "Challenge ID")),
    responses(
        (status = 200, description = "Challenge details", body = ChallengeResponse),
        (status = 404, description = "Not found or not published (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_public_challenge(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ChallengeResponse>, AppError> {
    let challenge = ChallengeService::new(&state.db).find(id).await?;
    if challenge.status.is_unpublished() {
        return Err(AppError::NotFound("Challenge not found".into()));
    }
    Ok(Json(challenge_response(&state.db, challenge).await?))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Challenges",
    operation_id = "getChallenge",
    summary = "Get a challenge",
    description = "Unpublished challenges are visible to their creator, current owners and administrators.",
    params(("id" = i32, Path, description = "Challenge ID")),
    responses(
        (status = 200, description = "Challenge details", body = ChallengeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_challenge(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ChallengeResponse>, AppError> {
    let (challenge, _) = find_visible(&state.db, &auth_user, id).await?;
    Ok(Json(challenge_response(&state.db, challenge).await?))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Challenges",
    operation_id = "createChallenge",
    summary = "Create a challenge in one request",
    description = "Creates a challenge from a complete form. `save_draft` keeps it as a draft with format checks only; `submit` validates every section and hands it in for review. Owners, partners, phases and documents are attached in the same transaction: if any of them fails nothing is saved and the input is echoed back. Requires `challenge:create` permission.",
    request_body = CreateChallengeRequest,
    responses(
        (status = 201, description = "Challenge created", body = ChallengeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, action = ?payload.action))]
pub async fn create_challenge(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateChallengeRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("challenge:create")?;

    let challenge = create_in_transaction(&state, &auth_user, &payload)
        .await
        .map_err(|e| e.with_input(&payload))?;

    Ok((
        StatusCode::CREATED,
        Json(challenge_response(&state.db, challenge).await?),
    ))
}

async fn create_in_transaction(
    state: &AppState,
    auth_user: &AuthUser,
    payload: &CreateChallengeRequest,
) -> Result<challenge::Model, AppError> {
    let strict = payload.action == CreateAction::Submit;
    let mut errors = validate_all(&payload.form, strict);
    if !strict
        && payload
            .form
            .title
            .as_deref()
            .is_none_or(|t| t.trim().is_empty())
    {
        errors.add("title", "can't be blank");
    }
    errors.into_result()?;

    let txn = state.db.begin().await?;
    let service = ChallengeService::new(&txn);
    let mut challenge = service
        .create(
            Caller::from(auth_user),
            &payload.form,
            ChallengeStatus::Draft,
            None,
        )
        .await?;
    if strict {
        check_complete(&challenge, &service.phases(challenge.id).await?).into_result()?;
        challenge = service
            .transition(challenge, Transition::Submit, &Actor::from(auth_user), None)
            .await?
            .challenge;
    }
    txn.commit().await?;
    Ok(challenge)
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Challenges",
    operation_id = "updateChallenge",
    summary = "Update a challenge",
    description = "Writes the fields present in the body. Relation lists (`owner_ids`, `federal_partner_ids`, `non_federal_partners`, `phases`) replace the current ones; `document_ids` attaches. Allowed for administrators, current owners and the creator until the challenge is archived.",
    params(("id" = i32, Path, description = "Challenge ID")),
    request_body = ChallengeForm,
    responses(
        (status = 200, description = "Challenge updated", body = ChallengeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn update_challenge(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<ChallengeForm>,
) -> Result<Json<ChallengeResponse>, AppError> {
    let update = async {
        validate_all(&payload, false).into_result()?;
        let txn = state.db.begin().await?;
        let existing = find_editable(&txn, &auth_user, id).await?;
        let challenge = ChallengeService::new(&txn)
            .save_form(existing, Caller::from(&auth_user), &payload, None)
            .await?;
        txn.commit().await?;
        Ok::<_, AppError>(challenge)
    };
    let challenge = update.await.map_err(|e| e.with_input(&payload))?;

    Ok(Json(challenge_response(&state.db, challenge).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Challenges",
    operation_id = "deleteChallenge",
    summary = "Delete a challenge",
    description = "Soft-deletes the challenge. Administrators with `challenge:delete` may delete any challenge; owners and the creator only drafts.",
    params(("id" = i32, Path, description = "Challenge ID")),
    responses(
        (status = 204, description = "Challenge deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_challenge(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let txn = state.db.begin().await?;
    let service = ChallengeService::new(&txn);
    let challenge = service.find_for_update(id).await?;
    let is_owner = service.is_owner(id, auth_user.user_id).await?;
    let allowed = auth_user.has_permission("challenge:delete")
        || ((is_owner || challenge.user_id == auth_user.user_id)
            && challenge.status == ChallengeStatus::Draft);
    if !allowed {
        return Err(AppError::PermissionDenied);
    }
    service
        .soft_delete(challenge, &Actor::from(&auth_user))
        .await?;
    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

fn requested_transition(payload: &TransitionRequest) -> Result<Transition, AppError> {
    Ok(match payload.action {
        TransitionAction::Submit => Transition::Submit,
        TransitionAction::SendToReview => Transition::SendToReview,
        TransitionAction::Approve => Transition::Approve,
        TransitionAction::Publish => Transition::Publish,
        TransitionAction::Reject => Transition::Reject,
        TransitionAction::Archive => Transition::Archive,
        TransitionAction::SetStatus => Transition::Advance(
            payload
                .status
                .ok_or_else(|| AppError::field("status", "can't be blank"))?,
        ),
    })
}

#[utoipa::path(
    post,
    path = "/{id}/transitions",
    tag = "Challenges",
    operation_id = "transitionChallenge",
    summary = "Change a challenge's status",
    description = "`submit` hands a complete draft or rejected challenge in for review and is open to its owners. Every other action requires `challenge:review` permission. `reject` needs a `rejection_message` and emails the current owners once committed. `set_status` moves a published challenge to `champion_assigned`, `design` or `vetted`.",
    params(("id" = i32, Path, description = "Challenge ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Status changed", body = ChallengeResponse),
        (status = 400, description = "Transition not allowed from the current status (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, action = ?payload.action))]
pub async fn transition_challenge(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<TransitionRequest>,
) -> Result<Json<ChallengeResponse>, AppError> {
    let transition = requested_transition(&payload)?;
    let rejection_message = payload
        .rejection_message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);
    if transition == Transition::Reject && rejection_message.is_none() {
        return Err(AppError::field("rejection_message", "can't be blank").with_input(&payload));
    }

    let txn = state.db.begin().await?;
    let service = ChallengeService::new(&txn);
    let challenge = if transition == Transition::Submit {
        let challenge = find_editable(&txn, &auth_user, id).await?;
        check_complete(&challenge, &service.phases(id).await?)
            .into_result()
            .map_err(|e| e.with_input(&payload))?;
        challenge
    } else {
        auth_user.require_permission("challenge:review")?;
        service.find_for_update(id).await?
    };

    let outcome = service
        .transition(
            challenge,
            transition,
            &Actor::from(&auth_user),
            rejection_message,
        )
        .await
        .map_err(|e| e.with_input(&payload))?;
    txn.commit().await?;

    mailer::dispatch(
        state.mailer.clone(),
        outcome
            .notify
            .iter()
            .map(|owner| notifications::challenge_rejected(owner, &outcome.challenge))
            .collect(),
    );

    Ok(Json(challenge_response(&state.db, outcome.challenge).await?))
}

#[utoipa::path(
    post,
    path = "/{id}/owners",
    tag = "Challenges",
    operation_id = "addChallengeOwner",
    summary = "Add an owner",
    description = "The user must be an active challenge owner or administrator.",
    params(("id" = i32, Path, description = "Challenge ID")),
    request_body = AddOwnerRequest,
    responses(
        (status = 200, description = "Owner added", body = ChallengeResponse),
        (status = 400, description = "User cannot own challenges (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, owner_id = payload.user_id))]
pub async fn add_owner(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<AddOwnerRequest>,
) -> Result<Json<ChallengeResponse>, AppError> {
    let txn = state.db.begin().await?;
    let challenge = find_editable(&txn, &auth_user, id).await?;
    ChallengeService::new(&txn)
        .add_owner(&challenge, payload.user_id)
        .await?;
    txn.commit().await?;

    Ok(Json(challenge_response(&state.db, challenge).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}/owners/{user_id}",
    tag = "Challenges",
    operation_id = "revokeChallengeOwner",
    summary = "Revoke an owner",
    description = "Stamps the owner row as revoked. The row is kept; the user loses owner access immediately.",
    params(
        ("id" = i32, Path, description = "Challenge ID"),
        ("user_id" = i32, Path, description = "Owner's user ID"),
    ),
    responses(
        (status = 204, description = "Owner revoked"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Challenge or owner not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn revoke_owner(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, owner_id)): Path<(i32, i32)>,
) -> Result<StatusCode, AppError> {
    let txn = state.db.begin().await?;
    find_editable(&txn, &auth_user, id).await?;
    ChallengeService::new(&txn)
        .revoke_owner(id, owner_id)
        .await?;
    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/{id}/documents",
    tag = "Challenges",
    operation_id = "attachChallengeDocuments",
    summary = "Attach uploaded documents",
    description = "All documents are attached or none: the first unavailable one fails the request and the selection is echoed back.",
    params(("id" = i32, Path, description = "Challenge ID")),
    request_body = AttachDocumentsRequest,
    responses(
        (status = 200, description = "Documents now on the challenge", body = Vec<DocumentResponse>),
        (status = 400, description = "Unavailable document (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn attach_documents(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<AttachDocumentsRequest>,
) -> Result<Json<Vec<DocumentResponse>>, AppError> {
    let target = AttachTarget::Challenge { id, section: None };
    let attach = async {
        let txn = state.db.begin().await?;
        find_editable(&txn, &auth_user, id).await?;
        documents::attach(&txn, Caller::from(&auth_user), &payload.document_ids, target).await?;
        txn.commit().await?;
        Ok::<_, AppError>(())
    };
    attach
        .await
        .map_err(|e| e.with_input(&serde_json::json!({ "document_ids": payload.document_ids })))?;

    let docs = documents::list_for(&state.db, target).await?;
    Ok(Json(docs.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/{id}/timeline",
    tag = "Challenges",
    operation_id = "addTimelineEvent",
    summary = "Add a timeline event",
    params(("id" = i32, Path, description = "Challenge ID")),
    request_body = TimelineEventRequest,
    responses(
        (status = 201, description = "Event added", body = TimelineEventResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn add_timeline_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<TimelineEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let title = payload.title.trim();
    if title.is_empty() || title.chars().count() > 256 {
        return Err(AppError::field("title", "must be 1-256 characters").with_input(&payload));
    }

    let txn = state.db.begin().await?;
    find_editable(&txn, &auth_user, id).await?;
    let event = ChallengeService::new(&txn)
        .add_timeline_event(id, title, payload.body.clone(), payload.occurs_on)
        .await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(TimelineEventResponse::from(event))))
}

#[utoipa::path(
    get,
    path = "/{id}/phases",
    tag = "Challenges",
    operation_id = "listChallengePhases",
    summary = "List a challenge's phases",
    params(("id" = i32, Path, description = "Challenge ID")),
    responses(
        (status = 200, description = "Phases, earliest first", body = Vec<PhaseResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_phases(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<PhaseResponse>>, AppError> {
    find_visible(&state.db, &auth_user, id).await?;
    let phases = ChallengeService::new(&state.db).phases(id).await?;
    Ok(Json(phases.into_iter().map(Into::into).collect()))
}
