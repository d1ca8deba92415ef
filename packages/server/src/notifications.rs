//! Builders for the portal's outbound messages.

use crate::entity::{challenge, submission, user};
use crate::mailer::Email;

fn submission_title(submission: &submission::Model) -> &str {
    submission.title.as_deref().unwrap_or("Untitled submission")
}

pub fn email_verification(user: &user::Model, token: &str, base_url: &str) -> Email {
    Email {
        to: user.email.clone(),
        subject: "Verify your ChallengeGov account".into(),
        body: format!(
            "Hello {},\n\nConfirm your email address with this token: {token}\n\
             Or visit {base_url}/register/verify?token={token}\n",
            user.first_name
        ),
    }
}

pub fn password_reset(user: &user::Model, token: &str, base_url: &str) -> Email {
    Email {
        to: user.email.clone(),
        subject: "Reset your ChallengeGov password".into(),
        body: format!(
            "Hello {},\n\nChoose a new password with this token: {token}\n\
             Or visit {base_url}/reset-password?token={token}\n\
             If you did not ask for a reset you can ignore this message.\n",
            user.first_name
        ),
    }
}

pub fn submission_confirmation(
    submitter: &user::Model,
    submission: &submission::Model,
    challenge: &challenge::Model,
) -> Email {
    Email {
        to: submitter.email.clone(),
        subject: format!("Submission received for {}", challenge.title),
        body: format!(
            "Hello {},\n\nYour submission \"{}\" (#{}) to \"{}\" has been received.\n",
            submitter.first_name,
            submission_title(submission),
            submission.id,
            challenge.title
        ),
    }
}

/// Sent to the manager once the solver has verified a managed submission.
pub fn submission_review_notice(
    manager: &user::Model,
    submission: &submission::Model,
    challenge: &challenge::Model,
) -> Email {
    Email {
        to: manager.email.clone(),
        subject: format!("Submission #{} was verified by the solver", submission.id),
        body: format!(
            "Hello {},\n\nThe solver verified submission \"{}\" to \"{}\". It is ready to submit.\n",
            manager.first_name,
            submission_title(submission),
            challenge.title
        ),
    }
}

pub fn new_submission_notice(
    owner: &user::Model,
    submission: &submission::Model,
    challenge: &challenge::Model,
) -> Email {
    Email {
        to: owner.email.clone(),
        subject: format!("New submission to {}", challenge.title),
        body: format!(
            "Hello {},\n\nSubmission #{} \"{}\" was just submitted to your challenge \"{}\".\n",
            owner.first_name,
            submission.id,
            submission_title(submission),
            challenge.title
        ),
    }
}

pub fn challenge_rejected(owner: &user::Model, challenge: &challenge::Model) -> Email {
    let reason = challenge
        .rejection_message
        .as_deref()
        .unwrap_or("No reason was given.");
    Email {
        to: owner.email.clone(),
        subject: format!("Changes requested for {}", challenge.title),
        body: format!(
            "Hello {},\n\nYour challenge \"{}\" was sent back for edits.\n\nReason: {reason}\n",
            owner.first_name, challenge.title
        ),
    }
}
