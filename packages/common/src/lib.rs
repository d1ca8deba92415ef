pub mod challenge_status;
pub mod role;
pub mod submission_status;

use std::fmt;

pub use challenge_status::{ChallengeStatus, ChallengeSubStatus};
pub use role::{Role, UserStatus};
pub use submission_status::{JudgingStatus, SubmissionStatus};

/// Error when parsing an unknown enum value from its string form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {kind} '{invalid}'. Valid values: {valid}")]
pub struct ParseEnumError {
    kind: &'static str,
    invalid: String,
    valid: String,
}

impl ParseEnumError {
    pub fn new<T: fmt::Display>(kind: &'static str, invalid: &str, valid: &[T]) -> Self {
        Self {
            kind,
            invalid: invalid.to_string(),
            valid: valid
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}
