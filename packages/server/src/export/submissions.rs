//! Submission exports: a CSV snapshot of a challenge's submitted entries.
//!
//! Exports are stored with their content. Any later write to the challenge's
//! submissions flips them to `outdated` until regenerated.

use std::collections::HashMap;

use chrono::Utc;
use common::{JudgingStatus, SubmissionStatus};
use sea_orm::*;
use serde_json::json;

use super::csv::{format_timestamp, render_records};
use crate::entity::submission_export::{self, ExportStatus};
use crate::entity::{phase, submission, user};
use crate::error::AppError;

pub const HEADER: &[&str] = &[
    "Submission ID",
    "Submitter email",
    "Submitter name",
    "Phase",
    "Title",
    "Brief description",
    "Description",
    "External URL",
    "Status",
    "Judging status",
    "Created at",
    "Updated at",
];

/// Which submissions an export covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportScope {
    pub phase_ids: Vec<i32>,
    /// `None` exports every judging status.
    pub judging_status: Option<JudgingStatus>,
}

impl ExportScope {
    pub fn judging_status_label(&self) -> String {
        self.judging_status
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| "all".to_string())
    }

    fn from_model(export: &submission_export::Model) -> Self {
        let phase_ids = serde_json::from_value(export.phase_ids.clone()).unwrap_or_default();
        Self {
            phase_ids,
            judging_status: export.judging_status.parse().ok(),
        }
    }
}

pub fn content_row(
    s: &submission::Model,
    submitter: Option<&user::Model>,
    phase: &str,
) -> Vec<String> {
    vec![
        s.id.to_string(),
        submitter.map(|u| u.email.clone()).unwrap_or_default(),
        submitter.map(user::Model::full_name).unwrap_or_default(),
        phase.to_string(),
        s.title.clone().unwrap_or_default(),
        s.brief_description.clone().unwrap_or_default(),
        s.description.clone().unwrap_or_default(),
        s.external_url.clone().unwrap_or_default(),
        s.status.as_str().to_string(),
        s.judging_status.as_str().to_string(),
        format_timestamp(Some(s.created_at)),
        format_timestamp(Some(s.updated_at)),
    ]
}

pub struct SubmissionExportService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> SubmissionExportService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn find(
        &self,
        challenge_id: i32,
        id: i32,
    ) -> Result<submission_export::Model, AppError> {
        submission_export::Entity::find_by_id(id)
            .filter(submission_export::Column::ChallengeId.eq(challenge_id))
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Export not found".into()))
    }

    pub async fn list(&self, challenge_id: i32) -> Result<Vec<submission_export::Model>, DbErr> {
        submission_export::Entity::find()
            .filter(submission_export::Column::ChallengeId.eq(challenge_id))
            .order_by_desc(submission_export::Column::Id)
            .all(self.conn)
            .await
    }

    /// Render the CSV for `scope` as of now.
    pub async fn render(
        &self,
        challenge_id: i32,
        scope: &ExportScope,
    ) -> Result<String, AppError> {
        let phases: HashMap<i32, String> = phase::Entity::find()
            .filter(phase::Column::ChallengeId.eq(challenge_id))
            .all(self.conn)
            .await?
            .into_iter()
            .map(|p| (p.id, p.title))
            .collect();
        for id in &scope.phase_ids {
            if !phases.contains_key(id) {
                return Err(AppError::field(
                    "phase_ids",
                    format!("Phase {id} does not belong to this challenge"),
                ));
            }
        }

        let mut query = submission::Entity::find()
            .filter(submission::Column::ChallengeId.eq(challenge_id))
            .filter(submission::Column::DeletedAt.is_null())
            .filter(submission::Column::Status.eq(SubmissionStatus::Submitted));
        if !scope.phase_ids.is_empty() {
            query = query.filter(submission::Column::PhaseId.is_in(scope.phase_ids.clone()));
        }
        if let Some(status) = scope.judging_status {
            query = query.filter(submission::Column::JudgingStatus.is_in(status.matching()));
        }
        let rows = query
            .order_by_asc(submission::Column::Id)
            .find_also_related(user::Entity)
            .all(self.conn)
            .await?;

        let records = rows.iter().map(|(s, submitter)| {
            let phase = phases.get(&s.phase_id).map(String::as_str).unwrap_or_default();
            content_row(s, submitter.as_ref(), phase)
        });
        Ok(render_records(HEADER, records)?)
    }

    pub async fn create(
        &self,
        challenge_id: i32,
        scope: &ExportScope,
    ) -> Result<submission_export::Model, AppError> {
        let content = self.render(challenge_id, scope).await?;
        let now = Utc::now();
        Ok(submission_export::ActiveModel {
            challenge_id: Set(challenge_id),
            phase_ids: Set(json!(scope.phase_ids)),
            judging_status: Set(scope.judging_status_label()),
            format: Set("csv".into()),
            status: Set(ExportStatus::Completed),
            content: Set(Some(content)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn)
        .await?)
    }

    /// Re-render an export with its original scope.
    pub async fn regenerate(
        &self,
        export: submission_export::Model,
    ) -> Result<submission_export::Model, AppError> {
        let scope = ExportScope::from_model(&export);
        let content = self.render(export.challenge_id, &scope).await?;
        let mut active: submission_export::ActiveModel = export.into();
        active.content = Set(Some(content));
        active.status = Set(ExportStatus::Completed);
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.conn).await?)
    }
}
