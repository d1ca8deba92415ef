use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use common::{Role, UserStatus};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{challenge, submission, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::challenge::owned_challenge_ids;
use crate::mailer;
use crate::models::challenge::AttachDocumentsRequest;
use crate::models::document::DocumentResponse;
use crate::models::shared::page_params;
use crate::models::submission::*;
use crate::notifications;
use crate::state::AppState;
use crate::workflow::challenges::ChallengeService;
use crate::workflow::documents::{self, AttachTarget};
use crate::workflow::permissions::{
    Caller, can_delete_submission, can_edit_submission, can_judge_submission,
    can_verify_review, can_view_submission,
};
use crate::workflow::query::{SortSpec, compose, fetch_page, filter_pairs};
use crate::workflow::submissions::SubmissionService;

const DEFAULT_SORT: &str = "id:desc";

async fn submission_response<C: ConnectionTrait>(
    conn: &C,
    submission: submission::Model,
) -> Result<SubmissionResponse, AppError> {
    let docs = documents::list_for(conn, AttachTarget::Submission(submission.id))
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(SubmissionResponse::new(submission, docs))
}

/// Live submission the caller may see.
async fn find_visible<C: ConnectionTrait>(
    conn: &C,
    auth_user: &AuthUser,
    id: i32,
) -> Result<submission::Model, AppError> {
    let submission = SubmissionService::new(conn).find(id).await?;
    let is_owner = ChallengeService::new(conn)
        .is_owner(submission.challenge_id, auth_user.user_id)
        .await?;
    if can_view_submission(Caller::from(auth_user), &submission, is_owner).is_err() {
        return Err(AppError::NotFound("Submission not found".into()));
    }
    Ok(submission)
}

/// Lock a submission the caller may edit, returning its challenge too.
async fn find_editable<C: ConnectionTrait>(
    conn: &C,
    auth_user: &AuthUser,
    id: i32,
) -> Result<(submission::Model, challenge::Model), AppError> {
    let service = SubmissionService::new(conn);
    let submission = service.find_for_update(id).await?;
    let challenge = ChallengeService::new(conn)
        .find(submission.challenge_id)
        .await?;
    let phase = service.find_phase(submission.phase_id).await?;
    can_edit_submission(
        Caller::from(auth_user),
        &submission,
        &challenge,
        &phase,
        Utc::now(),
    )?;
    Ok((submission, challenge))
}

async fn find_user<C: ConnectionTrait>(conn: &C, id: i32) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find_by_id(id).one(conn).await
}

/// Solver named by an administrator filing a submission on their behalf.
async fn find_solver<C: ConnectionTrait>(conn: &C, email: &str) -> Result<user::Model, AppError> {
    user::Entity::find()
        .filter(user::Column::Email.eq(email.trim().to_lowercase()))
        .one(conn)
        .await?
        .filter(|u| u.role == Role::Solver && u.status == UserStatus::Active)
        .ok_or_else(|| AppError::field("submitter_email", "No active solver has that email"))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Submissions",
    operation_id = "listSubmissions",
    summary = "List submissions",
    description = "Solvers see their own submissions, challenge owners also see the submissions to challenges they currently own, administrators see everything. Any query parameter other than `page`, `per_page` and `sort` is a filter: `search`, `status`, `judging_status`, `challenge_id`, `phase_id`, `submitter_id`, `manager_id`. `judging_status=selected` also matches winners. `sort` columns are `id`, `title`, `status`, `judging_status`, `created_at`, `updated_at`, `challenge_title`, `phase_title` and `manager_last_name`.",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (default 20, max 100)"),
        ("sort" = Option<String>, Query, description = "Sort terms, e.g. `challenge_title:asc,manager_last_name:desc`"),
    ),
    responses(
        (status = 200, description = "Page of submissions", body = SubmissionListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, params), fields(user_id = auth_user.user_id))]
pub async fn list_submissions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<SubmissionListResponse>, AppError> {
    let (page, per_page) = page_params(&params);
    let mut select = submission::Entity::find().filter(submission::Column::DeletedAt.is_null());
    if !auth_user.is_admin() {
        let mut scope = Condition::any()
            .add(submission::Column::SubmitterId.eq(auth_user.user_id))
            .add(submission::Column::ManagerId.eq(auth_user.user_id));
        if !auth_user.is_solver() {
            let owned = owned_challenge_ids(&state.db, auth_user.user_id).await?;
            scope = scope.add(submission::Column::ChallengeId.is_in(owned));
        }
        select = select.filter(scope);
    }
    let select = compose(
        select,
        &filter_pairs(&params),
        &SortSpec::from_param(params.get("sort").map(String::as_str), DEFAULT_SORT),
    );
    let (rows, pagination) = fetch_page(&state.db, select, page, per_page).await?;

    Ok(Json(SubmissionListResponse {
        data: rows.into_iter().map(Into::into).collect(),
        pagination,
    }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Submissions",
    operation_id = "createSubmission",
    summary = "Start a submission",
    description = "Creates a draft for an open phase of a published challenge. `draft` saves with format checks only; `review` also requires a title, a brief description and accepted terms. Administrators may file for a solver by passing `submitter_email`; they become its manager and the solver must verify it before it is submitted. Documents are attached in the same transaction. Requires `submission:submit` permission.",
    request_body = CreateSubmissionRequest,
    responses(
        (status = 201, description = "Submission created", body = SubmissionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, challenge_id = payload.challenge_id))]
pub async fn create_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("submission:submit")?;
    if payload.submitter_email.is_some() != auth_user.is_admin() {
        return Err(AppError::PermissionDenied);
    }

    let create = async {
        let txn = state.db.begin().await?;
        let (submitter_id, manager_id) = match &payload.submitter_email {
            Some(email) => (find_solver(&txn, email).await?.id, Some(auth_user.user_id)),
            None => (auth_user.user_id, None),
        };
        let challenge = ChallengeService::new(&txn)
            .find(payload.challenge_id)
            .await?;
        let service = SubmissionService::new(&txn);
        let phase = service.find_phase(payload.phase_id).await?;
        let submission = service
            .create(
                Caller::from(&auth_user),
                &challenge,
                &phase,
                submitter_id,
                manager_id,
                &payload.form,
                payload.action,
            )
            .await?;
        txn.commit().await?;
        Ok::<_, AppError>(submission)
    };
    let submission = create.await.map_err(|e| e.with_input(&payload))?;

    Ok((
        StatusCode::CREATED,
        Json(submission_response(&state.db, submission).await?),
    ))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Submissions",
    operation_id = "getSubmission",
    summary = "Get a submission",
    description = "Visible to the submitter, the assigned manager, current owners of the challenge and administrators.",
    params(("id" = i32, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission details", body = SubmissionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let submission = find_visible(&state.db, &auth_user, id).await?;
    Ok(Json(submission_response(&state.db, submission).await?))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Submissions",
    operation_id = "updateSubmission",
    summary = "Update a submission",
    description = "The submitter edits while the phase is open; an administrator edits a managed submission until the solver verifies it. Nobody edits once the challenge is archived.",
    params(("id" = i32, Path, description = "Submission ID")),
    request_body = UpdateSubmissionRequest,
    responses(
        (status = 200, description = "Submission updated", body = SubmissionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn update_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateSubmissionRequest>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let update = async {
        let txn = state.db.begin().await?;
        let (existing, _) = find_editable(&txn, &auth_user, id).await?;
        let submission = SubmissionService::new(&txn)
            .update(
                existing,
                Caller::from(&auth_user),
                &payload.form,
                payload.action,
            )
            .await?;
        txn.commit().await?;
        Ok::<_, AppError>(submission)
    };
    let submission = update.await.map_err(|e| e.with_input(&payload))?;

    Ok(Json(submission_response(&state.db, submission).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Submissions",
    operation_id = "deleteSubmission",
    summary = "Delete a submission",
    description = "Soft-deletes the submission. Allowed for the submitter and, for managed submissions, administrators.",
    params(("id" = i32, Path, description = "Submission ID")),
    responses(
        (status = 204, description = "Submission deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let txn = state.db.begin().await?;
    let service = SubmissionService::new(&txn);
    let submission = service.find_for_update(id).await?;
    can_delete_submission(Caller::from(&auth_user), &submission)?;
    service.soft_delete(submission).await?;
    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/{id}/submit",
    tag = "Submissions",
    operation_id = "submitSubmission",
    summary = "Hand a submission in",
    description = "Moves a complete draft to `submitted` while its phase is open. Managed submissions must be verified by the solver first. Emails a confirmation to the submitter and a notice to the challenge's current owners.",
    params(("id" = i32, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission submitted", body = SubmissionResponse),
        (status = 400, description = "Incomplete, already submitted or phase closed (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn submit_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let txn = state.db.begin().await?;
    let service = SubmissionService::new(&txn);
    let challenges = ChallengeService::new(&txn);
    let existing = service.find_for_update(id).await?;
    let allowed = existing.submitter_id == auth_user.user_id
        || (auth_user.is_admin() && existing.is_managed());
    let challenge = challenges.find(existing.challenge_id).await?;
    if !allowed || challenge.is_archived() {
        return Err(AppError::PermissionDenied);
    }
    let phase = service.find_phase(existing.phase_id).await?;
    let submission = service.submit(existing, &phase, Utc::now()).await?;

    let submitter = find_user(&txn, submission.submitter_id).await?;
    let owners = challenges.current_owners(challenge.id).await?;
    txn.commit().await?;

    let mut emails: Vec<_> = submitter
        .iter()
        .map(|s| notifications::submission_confirmation(s, &submission, &challenge))
        .collect();
    emails.extend(
        owners
            .iter()
            .map(|o| notifications::new_submission_notice(o, &submission, &challenge)),
    );
    mailer::dispatch(state.mailer.clone(), emails);

    Ok(Json(submission_response(&state.db, submission).await?))
}

#[utoipa::path(
    post,
    path = "/{id}/verify",
    tag = "Submissions",
    operation_id = "verifySubmissionReview",
    summary = "Confirm a submission filed on your behalf",
    description = "The solver confirms a managed submission. The manager is emailed once committed.",
    params(("id" = i32, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission verified", body = SubmissionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn verify_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let txn = state.db.begin().await?;
    let service = SubmissionService::new(&txn);
    let existing = service.find_for_update(id).await?;
    can_verify_review(Caller::from(&auth_user), &existing)?;
    let submission = service.verify_review(existing).await?;

    let challenge = ChallengeService::new(&txn)
        .find(submission.challenge_id)
        .await?;
    let manager = match submission.manager_id {
        Some(manager_id) => find_user(&txn, manager_id).await?,
        None => None,
    };
    txn.commit().await?;

    if let Some(manager) = manager {
        mailer::dispatch(
            state.mailer.clone(),
            vec![notifications::submission_review_notice(
                &manager,
                &submission,
                &challenge,
            )],
        );
    }

    Ok(Json(submission_response(&state.db, submission).await?))
}

#[utoipa::path(
    put,
    path = "/{id}/judging",
    tag = "Submissions",
    operation_id = "judgeSubmission",
    summary = "Set a submission's judging status",
    description = "Allowed for administrators and current owners of the challenge. Only submitted entries can be judged.",
    params(("id" = i32, Path, description = "Submission ID")),
    request_body = JudgingStatusRequest,
    responses(
        (status = 200, description = "Judging status updated", body = SubmissionResponse),
        (status = 400, description = "Submission not submitted (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, judging_status = %payload.judging_status))]
pub async fn judge_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<JudgingStatusRequest>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let txn = state.db.begin().await?;
    let service = SubmissionService::new(&txn);
    let existing = service.find_for_update(id).await?;
    let is_owner = ChallengeService::new(&txn)
        .is_owner(existing.challenge_id, auth_user.user_id)
        .await?;
    can_judge_submission(Caller::from(&auth_user), is_owner)?;
    let submission = service
        .set_judging_status(existing, payload.judging_status)
        .await?;
    txn.commit().await?;

    Ok(Json(submission_response(&state.db, submission).await?))
}

#[utoipa::path(
    post,
    path = "/{id}/documents",
    tag = "Submissions",
    operation_id = "attachSubmissionDocuments",
    summary = "Attach uploaded documents",
    description = "Same edit rules as updating the submission. All documents are attached or none.",
    params(("id" = i32, Path, description = "Submission ID")),
    request_body = AttachDocumentsRequest,
    responses(
        (status = 200, description = "Documents now on the submission", body = Vec<DocumentResponse>),
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
    let attach = async {
        let txn = state.db.begin().await?;
        let (submission, _) = find_editable(&txn, &auth_user, id).await?;
        documents::attach(
            &txn,
            Caller::from(&auth_user),
            &payload.document_ids,
            AttachTarget::Submission(id),
        )
        .await?;
        SubmissionService::new(&txn)
            .mark_exports_outdated(submission.challenge_id)
            .await?;
        txn.commit().await?;
        Ok::<_, AppError>(())
    };
    attach
        .await
        .map_err(|e| e.with_input(&serde_json::json!({ "document_ids": payload.document_ids })))?;

    let docs = documents::list_for(&state.db, AttachTarget::Submission(id)).await?;
    Ok(Json(docs.into_iter().map(Into::into).collect()))
}
