use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::ChallengeStatus;
use sea_orm::*;
use tracing::instrument;

use crate::audit::Actor;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::challenge::{challenge_response, find_visible};
use crate::models::challenge::ChallengeForm;
use crate::models::wizard::*;
use crate::state::AppState;
use crate::workflow::challenges::ChallengeService;
use crate::workflow::permissions::{Caller, can_edit_in_wizard};
use crate::workflow::status::Transition;
use crate::workflow::wizard::{self, Section, WizardAction, check_complete, destination};

#[utoipa::path(
    post,
    path = "/wizard",
    tag = "Wizard",
    operation_id = "startChallengeWizard",
    summary = "Start a challenge in the wizard",
    description = "Validates the `general` section (title, agency, owners, partners), creates a draft owned by the caller and moves the wizard to `details`. Only `general` fields are read. Requires `challenge:create` permission.",
    request_body = ChallengeForm,
    responses(
        (status = 201, description = "Draft created", body = WizardResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn start_wizard(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ChallengeForm>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("challenge:create")?;

    let form = Section::General.restrict(payload.clone());
    let next = destination(Section::General, WizardAction::Next);
    let start = async {
        wizard::validate(Section::General, &form, true).into_result()?;
        let txn = state.db.begin().await?;
        let challenge = ChallengeService::new(&txn)
            .create(
                Caller::from(&auth_user),
                &form,
                ChallengeStatus::Draft,
                Some(next),
            )
            .await?;
        txn.commit().await?;
        Ok::<_, AppError>(challenge)
    };
    let challenge = start.await.map_err(|e| e.with_input(&payload))?;

    Ok((
        StatusCode::CREATED,
        Json(WizardResponse {
            section: next,
            challenge: challenge_response(&state.db, challenge).await?,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/{id}/wizard",
    tag = "Wizard",
    operation_id = "resumeChallengeWizard",
    summary = "Resume the wizard where the owner left it",
    params(("id" = i32, Path, description = "Challenge ID")),
    responses(
        (status = 200, description = "Current section and challenge", body = WizardResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Challenge is not editable in the wizard (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn resume_wizard(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<WizardResponse>, AppError> {
    let (challenge, is_owner) = find_visible(&state.db, &auth_user, id).await?;
    can_edit_in_wizard(Caller::from(&auth_user), &challenge, is_owner)?;

    let section = challenge
        .last_section
        .as_deref()
        .and_then(|s| s.parse::<Section>().ok())
        .unwrap_or(Section::General);
    Ok(Json(WizardResponse {
        section,
        challenge: challenge_response(&state.db, challenge).await?,
    }))
}

#[utoipa::path(
    put,
    path = "/{id}/wizard/{section}",
    tag = "Wizard",
    operation_id = "saveChallengeWizardSection",
    summary = "Save one wizard section",
    description = "Reads only the fields the section edits. `next` validates fully and advances, `back` saves leniently and goes to the previous section, `save_draft` saves leniently and stays, `submit` (only on `review`) validates every section and hands the challenge in for review. The section's relation changes (owners and partners on `general`, phases on `timeline`, documents on `resources`) commit together with its fields or not at all.",
    params(
        ("id" = i32, Path, description = "Challenge ID"),
        ("section" = Section, Path, description = "Wizard section"),
    ),
    request_body = SaveSectionRequest,
    responses(
        (status = 200, description = "Section saved", body = WizardResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Challenge is not editable in the wizard (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, action = ?payload.action))]
pub async fn save_section(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, section)): Path<(i32, String)>,
    AppJson(payload): AppJson<SaveSectionRequest>,
) -> Result<Json<WizardResponse>, AppError> {
    let section: Section = section
        .parse()
        .map_err(|e: common::ParseEnumError| AppError::field("section", e.to_string()))?;
    if payload.action == WizardAction::Submit && section != Section::Review {
        return Err(
            AppError::field("action", "submit is only available on the review section")
                .with_input(&payload),
        );
    }

    let form = section.restrict(payload.form.clone());
    let next = destination(section, payload.action);
    let save = async {
        wizard::validate(section, &form, payload.action.is_strict()).into_result()?;

        let txn = state.db.begin().await?;
        let service = ChallengeService::new(&txn);
        let existing = service.find_for_update(id).await?;
        let is_owner = service.is_owner(id, auth_user.user_id).await?;
        can_edit_in_wizard(Caller::from(&auth_user), &existing, is_owner)?;

        let saved = service
            .save_form(existing, Caller::from(&auth_user), &form, Some(section))
            .await?;
        let mut challenge = service.set_last_section(saved, next).await?;
        if payload.action == WizardAction::Submit {
            check_complete(&challenge, &service.phases(id).await?).into_result()?;
            challenge = service
                .transition(challenge, Transition::Submit, &Actor::from(&auth_user), None)
                .await?
                .challenge;
        }
        txn.commit().await?;
        Ok::<_, AppError>(challenge)
    };
    let challenge = save.await.map_err(|e| e.with_input(&payload))?;

    Ok(Json(WizardResponse {
        section: next,
        challenge: challenge_response(&state.db, challenge).await?,
    }))
}
