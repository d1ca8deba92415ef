//! Submission persistence: drafts, updates, hand-in, review verification and judging.

use chrono::{DateTime, Utc};
use common::{JudgingStatus, SubmissionStatus};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::info;

use crate::entity::submission_export::{self, ExportStatus};
use crate::entity::{challenge, phase, submission};
use crate::error::AppError;
use crate::models::submission::{SubmissionAction, SubmissionForm, validate_submission_form};
use crate::workflow::documents::{self, AttachTarget};
use crate::workflow::permissions::Caller;

/// Check that `phase` of `challenge` takes new submissions at `now`.
pub fn check_accepting(
    challenge: &challenge::Model,
    phase: &phase::Model,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if phase.challenge_id != challenge.id {
        return Err(AppError::field(
            "phase_id",
            "Phase does not belong to this challenge",
        ));
    }
    if challenge.is_deleted() || challenge.is_archived() || challenge.status.is_unpublished() {
        return Err(AppError::field(
            "challenge_id",
            "Challenge is not accepting submissions",
        ));
    }
    if !phase.accepts_submissions_at(now) {
        return Err(AppError::field("phase_id", "Phase is closed to submissions"));
    }
    Ok(())
}

pub struct SubmissionService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> SubmissionService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Live (not soft-deleted) submission.
    pub async fn find(&self, id: i32) -> Result<submission::Model, AppError> {
        submission::Entity::find_by_id(id)
            .filter(submission::Column::DeletedAt.is_null())
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Submission not found".into()))
    }

    pub async fn find_for_update(&self, id: i32) -> Result<submission::Model, AppError> {
        submission::Entity::find_by_id(id)
            .filter(submission::Column::DeletedAt.is_null())
            .lock(LockType::Update)
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Submission not found".into()))
    }

    pub async fn find_phase(&self, id: i32) -> Result<phase::Model, AppError> {
        phase::Entity::find_by_id(id)
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::field("phase_id", format!("Phase {id} does not exist")))
    }

    /// Insert a draft. `manager_id` is set when an admin files it for `submitter_id`.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        caller: Caller,
        challenge: &challenge::Model,
        phase: &phase::Model,
        submitter_id: i32,
        manager_id: Option<i32>,
        form: &SubmissionForm,
        action: SubmissionAction,
    ) -> Result<submission::Model, AppError> {
        let now = Utc::now();
        check_accepting(challenge, phase, now)?;
        validate_submission_form(form, action == SubmissionAction::Review).into_result()?;

        let model = submission::ActiveModel {
            submitter_id: Set(submitter_id),
            challenge_id: Set(challenge.id),
            phase_id: Set(phase.id),
            manager_id: Set(manager_id),
            title: Set(trimmed(&form.title)),
            brief_description: Set(form.brief_description.clone()),
            description: Set(form.description.clone()),
            external_url: Set(form.external_url.clone()),
            status: Set(SubmissionStatus::Draft),
            judging_status: Set(JudgingStatus::NotSelected),
            review_verified: Set(false),
            terms_accepted: Set(form.terms_accepted.unwrap_or(false)),
            submitted_at: Set(None),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn)
        .await?;

        if let Some(ids) = &form.document_ids {
            documents::attach(self.conn, caller, ids, AttachTarget::Submission(model.id)).await?;
        }
        self.mark_exports_outdated(challenge.id).await?;
        info!(submission_id = model.id, managed = manager_id.is_some(), "submission created");
        Ok(model)
    }

    /// Write the fields present in `form`. Permission is checked by the caller.
    pub async fn update(
        &self,
        existing: submission::Model,
        caller: Caller,
        form: &SubmissionForm,
        action: SubmissionAction,
    ) -> Result<submission::Model, AppError> {
        let strict = action == SubmissionAction::Review;
        let effective = form.merged_over(&existing);
        validate_submission_form(if strict { &effective } else { form }, strict).into_result()?;

        let challenge_id = existing.challenge_id;
        let mut active: submission::ActiveModel = existing.into();
        if form.title.is_some() {
            active.title = Set(trimmed(&form.title));
        }
        if form.brief_description.is_some() {
            active.brief_description = Set(form.brief_description.clone());
        }
        if form.description.is_some() {
            active.description = Set(form.description.clone());
        }
        if form.external_url.is_some() {
            active.external_url = Set(form.external_url.clone());
        }
        if let Some(accepted) = form.terms_accepted {
            active.terms_accepted = Set(accepted);
        }
        active.updated_at = Set(Utc::now());
        let model = active.update(self.conn).await?;

        if let Some(ids) = &form.document_ids {
            documents::attach(self.conn, caller, ids, AttachTarget::Submission(model.id)).await?;
        }
        self.mark_exports_outdated(challenge_id).await?;
        Ok(model)
    }

    /// Hand a draft in: `draft → submitted`.
    pub async fn submit(
        &self,
        existing: submission::Model,
        phase: &phase::Model,
        now: DateTime<Utc>,
    ) -> Result<submission::Model, AppError> {
        if existing.status == SubmissionStatus::Submitted {
            return Err(AppError::field("status", "Submission was already submitted"));
        }
        validate_submission_form(&SubmissionForm::from_stored(&existing), true).into_result()?;
        if !phase.is_open_at(now) {
            return Err(AppError::field("phase_id", "Phase is closed to submissions"));
        }
        if existing.is_managed() && !existing.review_verified {
            return Err(AppError::field(
                "review_verified",
                "The solver has not verified this submission yet",
            ));
        }

        let challenge_id = existing.challenge_id;
        let mut active: submission::ActiveModel = existing.into();
        active.status = Set(SubmissionStatus::Submitted);
        active.submitted_at = Set(Some(now));
        active.updated_at = Set(now);
        let model = active.update(self.conn).await?;
        self.mark_exports_outdated(challenge_id).await?;
        info!(submission_id = model.id, "submission submitted");
        Ok(model)
    }

    /// The solver confirms a managed submission.
    pub async fn verify_review(
        &self,
        existing: submission::Model,
    ) -> Result<submission::Model, AppError> {
        let mut active: submission::ActiveModel = existing.into();
        active.review_verified = Set(true);
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.conn).await?)
    }

    pub async fn set_judging_status(
        &self,
        existing: submission::Model,
        judging_status: JudgingStatus,
    ) -> Result<submission::Model, AppError> {
        if existing.status != SubmissionStatus::Submitted {
            return Err(AppError::field(
                "judging_status",
                "Only submitted entries can be judged",
            ));
        }
        let challenge_id = existing.challenge_id;
        let mut active: submission::ActiveModel = existing.into();
        active.judging_status = Set(judging_status);
        active.updated_at = Set(Utc::now());
        let model = active.update(self.conn).await?;
        self.mark_exports_outdated(challenge_id).await?;
        Ok(model)
    }

    pub async fn soft_delete(&self, existing: submission::Model) -> Result<(), AppError> {
        let challenge_id = existing.challenge_id;
        let now = Utc::now();
        let mut active: submission::ActiveModel = existing.into();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(self.conn).await?;
        self.mark_exports_outdated(challenge_id).await?;
        Ok(())
    }

    /// Flag the challenge's completed exports as stale.
    pub async fn mark_exports_outdated(&self, challenge_id: i32) -> Result<u64, DbErr> {
        let result = submission_export::Entity::update_many()
            .col_expr(
                submission_export::Column::Status,
                Expr::value(ExportStatus::Outdated),
            )
            .col_expr(submission_export::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(submission_export::Column::ChallengeId.eq(challenge_id))
            .filter(submission_export::Column::Status.eq(ExportStatus::Completed))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value.as_deref().map(|v| v.trim().to_string())
}
