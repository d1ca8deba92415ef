use chrono::{DateTime, Utc};
use common::{JudgingStatus, SubmissionStatus};
use serde::{Deserialize, Serialize};

use super::document::DocumentResponse;
use super::shared::Pagination;
use crate::entity::submission;
use crate::error::FieldErrors;

/// Editable submission fields. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmissionForm {
    #[schema(example = "Low-cost arsenic test strip")]
    pub title: Option<String>,
    pub brief_description: Option<String>,
    pub description: Option<String>,
    #[schema(example = "https://example.org/demo")]
    pub external_url: Option<String>,
    pub terms_accepted: Option<bool>,
    /// Uploaded documents to attach to the submission.
    pub document_ids: Option<Vec<i32>>,
}

/// How a create or update leaves the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionAction {
    /// Save whatever was entered; only format checks apply.
    #[default]
    Draft,
    /// Validate fully so the submission is ready to submit.
    Review,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateSubmissionRequest {
    pub challenge_id: i32,
    pub phase_id: i32,
    #[serde(default)]
    pub action: SubmissionAction,
    /// Admins only: email of the solver the submission is made for.
    #[schema(example = "solver@example.com")]
    pub submitter_email: Option<String>,
    #[serde(flatten)]
    pub form: SubmissionForm,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UpdateSubmissionRequest {
    #[serde(default)]
    pub action: SubmissionAction,
    #[serde(flatten)]
    pub form: SubmissionForm,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct JudgingStatusRequest {
    pub judging_status: JudgingStatus,
}

const MAX_TITLE: usize = 256;
const MAX_BRIEF_DESCRIPTION: usize = 500;

/// Format checks always apply; required fields only when `strict`.
pub fn validate_submission_form(form: &SubmissionForm, strict: bool) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());

    if form
        .title
        .as_deref()
        .is_some_and(|t| t.trim().chars().count() > MAX_TITLE)
    {
        errors.add("title", format!("must be at most {MAX_TITLE} characters"));
    }
    if form
        .brief_description
        .as_deref()
        .is_some_and(|t| t.chars().count() > MAX_BRIEF_DESCRIPTION)
    {
        errors.add(
            "brief_description",
            format!("must be at most {MAX_BRIEF_DESCRIPTION} characters"),
        );
    }
    if let Some(url) = form.external_url.as_deref()
        && !url.is_empty()
        && !(url.starts_with("https://") || url.starts_with("http://"))
    {
        errors.add("external_url", "must be an http or https URL");
    }

    if strict {
        if blank(&form.title) {
            errors.add("title", "can't be blank");
        }
        if blank(&form.brief_description) {
            errors.add("brief_description", "can't be blank");
        }
        if form.terms_accepted != Some(true) {
            errors.add("terms_accepted", "must be accepted");
        }
    }
    errors
}

impl SubmissionForm {
    /// The form a stored submission would have been saved from.
    pub fn from_stored(s: &submission::Model) -> Self {
        Self {
            title: s.title.clone(),
            brief_description: s.brief_description.clone(),
            description: s.description.clone(),
            external_url: s.external_url.clone(),
            terms_accepted: Some(s.terms_accepted),
            document_ids: None,
        }
    }

    /// Stored values overlaid with the ones present in `self`.
    pub fn merged_over(&self, s: &submission::Model) -> Self {
        let stored = Self::from_stored(s);
        Self {
            title: self.title.clone().or(stored.title),
            brief_description: self.brief_description.clone().or(stored.brief_description),
            description: self.description.clone().or(stored.description),
            external_url: self.external_url.clone().or(stored.external_url),
            terms_accepted: self.terms_accepted.or(stored.terms_accepted),
            document_ids: self.document_ids.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    pub id: i32,
    pub submitter_id: i32,
    pub challenge_id: i32,
    pub phase_id: i32,
    pub manager_id: Option<i32>,
    pub title: Option<String>,
    pub brief_description: Option<String>,
    pub description: Option<String>,
    pub external_url: Option<String>,
    pub status: SubmissionStatus,
    pub judging_status: JudgingStatus,
    pub review_verified: bool,
    pub terms_accepted: bool,
    pub submitted_at: Option<DateTime<Utc>>,
    pub documents: Vec<DocumentResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubmissionResponse {
    pub fn new(s: submission::Model, documents: Vec<DocumentResponse>) -> Self {
        Self {
            id: s.id,
            submitter_id: s.submitter_id,
            challenge_id: s.challenge_id,
            phase_id: s.phase_id,
            manager_id: s.manager_id,
            title: s.title,
            brief_description: s.brief_description,
            description: s.description,
            external_url: s.external_url,
            status: s.status,
            judging_status: s.judging_status,
            review_verified: s.review_verified,
            terms_accepted: s.terms_accepted,
            submitted_at: s.submitted_at,
            documents,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionListItem {
    pub id: i32,
    pub submitter_id: i32,
    pub challenge_id: i32,
    pub phase_id: i32,
    pub manager_id: Option<i32>,
    pub title: Option<String>,
    pub status: SubmissionStatus,
    pub judging_status: JudgingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<submission::Model> for SubmissionListItem {
    fn from(s: submission::Model) -> Self {
        Self {
            id: s.id,
            submitter_id: s.submitter_id,
            challenge_id: s.challenge_id,
            phase_id: s.phase_id,
            manager_id: s.manager_id,
            title: s.title,
            status: s.status,
            judging_status: s.judging_status,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionListResponse {
    pub data: Vec<SubmissionListItem>,
    pub pagination: Pagination,
}
