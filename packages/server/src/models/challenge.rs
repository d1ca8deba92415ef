use chrono::{DateTime, Utc};
use common::{ChallengeStatus, ChallengeSubStatus};
use sea_orm::prelude::Uuid;
use serde::{Deserialize, Serialize};

use super::document::DocumentResponse;
use super::shared::Pagination;
use crate::entity::{challenge, non_federal_partner, phase, timeline_event};

/// Editable challenge fields.
///
/// Every field is optional; absent fields are left untouched. Wizard sections
/// accept only their own subset, see `Section::restrict`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ChallengeForm {
    // general
    #[schema(example = "Clean Water Prize")]
    pub title: Option<String>,
    #[schema(example = 1)]
    pub agency_id: Option<i32>,
    #[schema(example = "FY26")]
    pub fiscal_year: Option<String>,
    /// User IDs that own the challenge alongside the creator.
    pub owner_ids: Option<Vec<i32>>,
    /// Agency IDs of federal partners.
    pub federal_partner_ids: Option<Vec<i32>>,
    /// Names of non-federal partners.
    pub non_federal_partners: Option<Vec<String>>,

    // details
    #[schema(example = "Help communities test drinking water")]
    pub tagline: Option<String>,
    pub brief_description: Option<String>,
    pub description: Option<String>,
    #[schema(example = "https://example.gov/water")]
    pub external_url: Option<String>,
    pub logo_key: Option<String>,
    pub logo_alt_text: Option<String>,

    // timeline
    pub phases: Option<Vec<PhaseInput>>,

    // prizes
    /// Total cash prize in cents.
    #[schema(example = 5000000)]
    pub prize_total: Option<i64>,
    pub prize_description: Option<String>,
    pub non_monetary_prizes: Option<String>,

    // rules
    pub eligibility_requirements: Option<String>,
    pub rules: Option<String>,
    pub terms_and_conditions: Option<String>,

    // judging
    pub judging_criteria: Option<String>,

    // how to enter
    pub how_to_enter: Option<String>,

    // resources
    /// Uploaded documents to attach to the challenge.
    pub document_ids: Option<Vec<i32>>,
}

/// A phase as submitted in the timeline section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, utoipa::ToSchema)]
pub struct PhaseInput {
    /// Existing phase to update; omitted for a new phase.
    pub id: Option<i32>,
    #[schema(example = "Phase 1")]
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub open_to_submissions: bool,
    pub judging_criteria: Option<String>,
    pub how_to_enter: Option<String>,
}

fn default_true() -> bool {
    true
}

impl From<&phase::Model> for PhaseInput {
    fn from(p: &phase::Model) -> Self {
        Self {
            id: Some(p.id),
            title: p.title.clone(),
            start_date: p.start_date,
            end_date: p.end_date,
            open_to_submissions: p.open_to_submissions,
            judging_criteria: p.judging_criteria.clone(),
            how_to_enter: p.how_to_enter.clone(),
        }
    }
}

impl ChallengeForm {
    /// Rebuild the form a stored challenge would have been saved from.
    pub fn from_stored(c: &challenge::Model, phases: &[phase::Model]) -> Self {
        Self {
            title: Some(c.title.clone()),
            agency_id: c.agency_id,
            fiscal_year: c.fiscal_year.clone(),
            owner_ids: None,
            federal_partner_ids: None,
            non_federal_partners: None,
            tagline: c.tagline.clone(),
            brief_description: c.brief_description.clone(),
            description: c.description.clone(),
            external_url: c.external_url.clone(),
            logo_key: c.logo_key.clone(),
            logo_alt_text: c.logo_alt_text.clone(),
            phases: Some(phases.iter().map(PhaseInput::from).collect()),
            prize_total: Some(c.prize_total),
            prize_description: c.prize_description.clone(),
            non_monetary_prizes: c.non_monetary_prizes.clone(),
            eligibility_requirements: c.eligibility_requirements.clone(),
            rules: c.rules.clone(),
            terms_and_conditions: c.terms_and_conditions.clone(),
            judging_criteria: c.judging_criteria.clone(),
            how_to_enter: c.how_to_enter.clone(),
            document_ids: None,
        }
    }
}

/// How a single-shot create leaves the challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CreateAction {
    /// Keep as draft; only format checks apply.
    #[default]
    SaveDraft,
    /// Validate every section and hand in for review.
    Submit,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateChallengeRequest {
    #[serde(default)]
    pub action: CreateAction,
    #[serde(flatten)]
    pub form: ChallengeForm,
}

/// Status change requested by an administrator or owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    Submit,
    SendToReview,
    Approve,
    Publish,
    Reject,
    Archive,
    /// Move a published challenge to `status`.
    SetStatus,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct TransitionRequest {
    pub action: TransitionAction,
    /// Target of `set_status`.
    pub status: Option<ChallengeStatus>,
    /// Required with `reject`.
    pub rejection_message: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AddOwnerRequest {
    pub user_id: i32,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AttachDocumentsRequest {
    pub document_ids: Vec<i32>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct TimelineEventRequest {
    #[schema(example = "Winners announced")]
    pub title: String,
    pub body: Option<String>,
    pub occurs_on: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize, utoipa::ToSchema)]
pub struct PhaseResponse {
    pub id: i32,
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub open_to_submissions: bool,
    pub judging_criteria: Option<String>,
    pub how_to_enter: Option<String>,
}

impl From<phase::Model> for PhaseResponse {
    fn from(p: phase::Model) -> Self {
        Self {
            id: p.id,
            title: p.title,
            start_date: p.start_date,
            end_date: p.end_date,
            open_to_submissions: p.open_to_submissions,
            judging_criteria: p.judging_criteria,
            how_to_enter: p.how_to_enter,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TimelineEventResponse {
    pub id: i32,
    pub title: String,
    pub body: Option<String>,
    pub occurs_on: DateTime<Utc>,
}

impl From<timeline_event::Model> for TimelineEventResponse {
    fn from(e: timeline_event::Model) -> Self {
        Self {
            id: e.id,
            title: e.title,
            body: e.body,
            occurs_on: e.occurs_on,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct OwnerResponse {
    pub user_id: i32,
    pub email: String,
    pub name: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PartnerResponse {
    pub agency_id: i32,
    pub name: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ChallengeResponse {
    pub id: i32,
    pub uuid: Uuid,
    pub title: String,
    pub tagline: Option<String>,
    pub brief_description: Option<String>,
    pub description: Option<String>,
    pub status: ChallengeStatus,
    pub sub_status: Option<ChallengeSubStatus>,
    pub agency_id: Option<i32>,
    pub agency_name: Option<String>,
    pub user_id: i32,
    pub last_section: Option<String>,
    pub fiscal_year: Option<String>,
    pub external_url: Option<String>,
    pub prize_total: i64,
    pub prize_description: Option<String>,
    pub non_monetary_prizes: Option<String>,
    pub eligibility_requirements: Option<String>,
    pub rules: Option<String>,
    pub terms_and_conditions: Option<String>,
    pub judging_criteria: Option<String>,
    pub how_to_enter: Option<String>,
    pub logo_key: Option<String>,
    pub logo_alt_text: Option<String>,
    pub winner_image_key: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub published_on: Option<DateTime<Utc>>,
    pub rejection_message: Option<String>,
    pub owners: Vec<OwnerResponse>,
    pub federal_partners: Vec<PartnerResponse>,
    pub non_federal_partners: Vec<String>,
    pub phases: Vec<PhaseResponse>,
    pub documents: Vec<DocumentResponse>,
    pub timeline_events: Vec<TimelineEventResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Related rows gathered for a challenge detail response.
#[derive(Default)]
pub struct ChallengeRelations {
    pub agency_name: Option<String>,
    pub owners: Vec<OwnerResponse>,
    pub federal_partners: Vec<PartnerResponse>,
    pub non_federal_partners: Vec<non_federal_partner::Model>,
    pub phases: Vec<phase::Model>,
    pub documents: Vec<DocumentResponse>,
    pub timeline_events: Vec<timeline_event::Model>,
}

impl ChallengeResponse {
    pub fn new(c: challenge::Model, rel: ChallengeRelations) -> Self {
        Self {
            id: c.id,
            uuid: c.uuid,
            title: c.title,
            tagline: c.tagline,
            brief_description: c.brief_description,
            description: c.description,
            status: c.status,
            sub_status: c.sub_status,
            agency_id: c.agency_id,
            agency_name: rel.agency_name,
            user_id: c.user_id,
            last_section: c.last_section,
            fiscal_year: c.fiscal_year,
            external_url: c.external_url,
            prize_total: c.prize_total,
            prize_description: c.prize_description,
            non_monetary_prizes: c.non_monetary_prizes,
            eligibility_requirements: c.eligibility_requirements,
            rules: c.rules,
            terms_and_conditions: c.terms_and_conditions,
            judging_criteria: c.judging_criteria,
            how_to_enter: c.how_to_enter,
            logo_key: c.logo_key,
            logo_alt_text: c.logo_alt_text,
            winner_image_key: c.winner_image_key,
            start_date: c.start_date,
            end_date: c.end_date,
            published_on: c.published_on,
            rejection_message: c.rejection_message,
            owners: rel.owners,
            federal_partners: rel.federal_partners,
            non_federal_partners: rel.non_federal_partners.into_iter().map(|p| p.name).collect(),
            phases: rel.phases.into_iter().map(Into::into).collect(),
            documents: rel.documents,
            timeline_events: rel.timeline_events.into_iter().map(Into::into).collect(),
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ChallengeListItem {
    pub id: i32,
    pub uuid: Uuid,
    pub title: String,
    pub tagline: Option<String>,
    pub status: ChallengeStatus,
    pub sub_status: Option<ChallengeSubStatus>,
    pub agency_id: Option<i32>,
    pub user_id: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<challenge::Model> for ChallengeListItem {
    fn from(c: challenge::Model) -> Self {
        Self {
            id: c.id,
            uuid: c.uuid,
            title: c.title,
            tagline: c.tagline,
            status: c.status,
            sub_status: c.sub_status,
            agency_id: c.agency_id,
            user_id: c.user_id,
            start_date: c.start_date,
            end_date: c.end_date,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ChallengeListResponse {
    pub data: Vec<ChallengeListItem>,
    pub pagination: Pagination,
}
