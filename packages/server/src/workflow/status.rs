//! Challenge status state machine.
//!
//! Pure rules over a challenge record: which transitions are allowed from its
//! current status and what each transition writes. Persistence lives in
//! [`super::challenges`].

use chrono::{DateTime, Utc};
use common::{ChallengeStatus, ChallengeSubStatus};

use crate::entity::challenge;
use crate::error::AppError;

/// A requested status change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Owner hands a draft (or a rejected challenge) in for review.
    Submit,
    /// Admin moves a pending challenge into GSA review.
    SendToReview,
    Approve,
    Publish,
    Reject,
    Archive,
    /// Admin moves a published challenge to a later working status.
    Advance(ChallengeStatus),
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::SendToReview => "send_to_review",
            Self::Approve => "approve",
            Self::Publish => "publish",
            Self::Reject => "reject",
            Self::Archive => "archive",
            Self::Advance(_) => "advance",
        }
    }
}

/// Statuses reachable through [`Transition::Advance`].
pub const ADVANCE_TARGETS: &[ChallengeStatus] = &[
    ChallengeStatus::ChampionAssigned,
    ChallengeStatus::Design,
    ChallengeStatus::Vetted,
];

pub fn is_submittable(challenge: &challenge::Model) -> bool {
    !challenge.is_deleted()
        && matches!(
            challenge.status,
            ChallengeStatus::Draft | ChallengeStatus::Rejected
        )
}

pub fn is_reviewable(challenge: &challenge::Model) -> bool {
    !challenge.is_deleted() && challenge.status == ChallengeStatus::Pending
}

/// Only challenges that have not been published yet can be approved.
pub fn is_approvable(challenge: &challenge::Model) -> bool {
    !challenge.is_deleted()
        && challenge.status.is_unpublished()
        && challenge.status != ChallengeStatus::Approved
}

/// Publishing never moves a challenge back from a later working status.
pub fn is_publishable(challenge: &challenge::Model) -> bool {
    !challenge.is_deleted() && challenge.status.is_unpublished()
}

pub fn is_rejectable(challenge: &challenge::Model) -> bool {
    !challenge.is_deleted()
        && !matches!(
            challenge.status,
            ChallengeStatus::Rejected | ChallengeStatus::GsaReview
        )
}

pub fn is_archivable(challenge: &challenge::Model) -> bool {
    !challenge.is_deleted() && challenge.status != ChallengeStatus::Archived
}

pub fn can_advance_to(challenge: &challenge::Model, target: ChallengeStatus) -> bool {
    !challenge.is_deleted()
        && !challenge.is_archived()
        && ADVANCE_TARGETS.contains(&target)
        && challenge.status != target
        && !challenge.status.is_unpublished()
}

/// Everything a transition writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusChange {
    pub from: ChallengeStatus,
    pub to: ChallengeStatus,
    /// New sub-status, when the transition changes it.
    pub sub_status: Option<ChallengeSubStatus>,
    /// Publication timestamp, when the transition publishes.
    pub published_on: Option<DateTime<Utc>>,
    pub records_timeline_event: bool,
    /// Owners are emailed once the change commits.
    pub notifies_owners: bool,
}

/// Check `transition` against the challenge and describe the resulting write.
pub fn plan(
    challenge: &challenge::Model,
    transition: Transition,
    now: DateTime<Utc>,
) -> Result<StatusChange, AppError> {
    let (allowed, to) = match transition {
        Transition::Submit => (is_submittable(challenge), ChallengeStatus::Pending),
        Transition::SendToReview => (is_reviewable(challenge), ChallengeStatus::GsaReview),
        Transition::Approve => (is_approvable(challenge), ChallengeStatus::Approved),
        Transition::Publish => (is_publishable(challenge), ChallengeStatus::Created),
        Transition::Reject => (is_rejectable(challenge), ChallengeStatus::Rejected),
        Transition::Archive => (is_archivable(challenge), ChallengeStatus::Archived),
        Transition::Advance(target) => (can_advance_to(challenge, target), target),
    };

    if !allowed {
        return Err(AppError::field(
            "status",
            format!(
                "Cannot {} a challenge that is {}",
                transition.name().replace('_', " "),
                challenge.status.label().to_lowercase()
            ),
        ));
    }

    let sub_status = match to {
        ChallengeStatus::Created => Some(ChallengeSubStatus::Open),
        ChallengeStatus::Archived => Some(ChallengeSubStatus::Archived),
        _ => None,
    };

    Ok(StatusChange {
        from: challenge.status,
        to,
        sub_status,
        published_on: (to == ChallengeStatus::Created).then_some(now),
        records_timeline_event: to.records_timeline_event(),
        notifies_owners: to == ChallengeStatus::Rejected,
    })
}

/// Apply a planned change to an in-memory record.
pub fn apply(challenge: &mut challenge::Model, change: &StatusChange) {
    challenge.status = change.to;
    if let Some(sub_status) = change.sub_status {
        challenge.sub_status = Some(sub_status);
    }
    if let Some(published_on) = change.published_on {
        challenge.published_on = Some(published_on);
    }
}
