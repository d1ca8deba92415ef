//! Permission predicates for challenges and submissions.
//!
//! Every check returns `Ok(())` or [`NotPermitted`]; callers never learn why.

use chrono::{DateTime, Utc};
use common::{ChallengeStatus, Role};

use crate::entity::{challenge, challenge_owner, phase, submission};
use crate::extractors::auth::AuthUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("not permitted")]
pub struct NotPermitted;

pub type Permission = Result<(), NotPermitted>;

fn allow_if(condition: bool) -> Permission {
    if condition { Ok(()) } else { Err(NotPermitted) }
}

/// Identity a permission check is evaluated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i32,
    pub role: Role,
}

impl From<&AuthUser> for Caller {
    fn from(user: &AuthUser) -> Self {
        Self {
            user_id: user.user_id,
            role: user.role,
        }
    }
}

/// True if `user_id` holds a non-revoked owner row among `owners`.
pub fn is_current_owner(owners: &[challenge_owner::Model], user_id: i32) -> bool {
    owners
        .iter()
        .any(|o| o.user_id == user_id && o.is_current())
}

/// Solver-submitters edit while the phase is open; admins edit managed,
/// unverified submissions. Nobody edits once the challenge is archived.
pub fn can_edit_submission(
    caller: Caller,
    submission: &submission::Model,
    challenge: &challenge::Model,
    phase: &phase::Model,
    now: DateTime<Utc>,
) -> Permission {
    if submission.deleted_at.is_some() || challenge.is_archived() {
        return Err(NotPermitted);
    }
    if caller.role.is_solver() {
        allow_if(submission.submitter_id == caller.user_id && phase.is_open_at(now))
    } else {
        allow_if(caller.role.is_admin() && submission.is_managed() && !submission.review_verified)
    }
}

pub fn can_delete_submission(caller: Caller, submission: &submission::Model) -> Permission {
    if submission.deleted_at.is_some() {
        return Err(NotPermitted);
    }
    allow_if(
        submission.submitter_id == caller.user_id
            || (caller.role.is_admin() && submission.is_managed()),
    )
}

pub fn can_view_submission(
    caller: Caller,
    submission: &submission::Model,
    is_challenge_owner: bool,
) -> Permission {
    allow_if(
        caller.role.is_admin()
            || submission.submitter_id == caller.user_id
            || submission.manager_id == Some(caller.user_id)
            || is_challenge_owner,
    )
}

/// The solver confirms a submission an admin prepared for them.
pub fn can_verify_review(caller: Caller, submission: &submission::Model) -> Permission {
    allow_if(
        submission.deleted_at.is_none()
            && submission.submitter_id == caller.user_id
            && submission.is_managed()
            && !submission.review_verified,
    )
}

pub fn can_judge_submission(caller: Caller, is_challenge_owner: bool) -> Permission {
    allow_if(caller.role.is_admin() || is_challenge_owner)
}

/// Admins edit any live challenge; owners and the creator edit theirs until archived.
pub fn can_edit_challenge(
    caller: Caller,
    challenge: &challenge::Model,
    is_challenge_owner: bool,
) -> Permission {
    if challenge.is_deleted() || challenge.is_archived() {
        return Err(NotPermitted);
    }
    allow_if(caller.role.is_admin() || is_challenge_owner || challenge.user_id == caller.user_id)
}

/// Owners may use the wizard only while the challenge is with them.
pub fn can_edit_in_wizard(
    caller: Caller,
    challenge: &challenge::Model,
    is_challenge_owner: bool,
) -> Permission {
    can_edit_challenge(caller, challenge, is_challenge_owner)?;
    allow_if(
        caller.role.is_admin()
            || matches!(
                challenge.status,
                ChallengeStatus::Draft | ChallengeStatus::Pending | ChallengeStatus::Rejected
            ),
    )
}

/// Published challenges are public; everything else needs ownership or admin.
pub fn can_view_challenge(
    caller: Caller,
    challenge: &challenge::Model,
    is_challenge_owner: bool,
) -> Permission {
    if challenge.is_deleted() {
        return Err(NotPermitted);
    }
    allow_if(
        !challenge.status.is_unpublished()
            || caller.role.is_admin()
            || is_challenge_owner
            || challenge.user_id == caller.user_id,
    )
}
