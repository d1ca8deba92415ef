use serde::{Deserialize, Serialize};

use super::challenge::{ChallengeForm, ChallengeResponse};
use crate::workflow::wizard::{Section, WizardAction};

/// Save one wizard section. Only the section's own fields are read.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SaveSectionRequest {
    pub action: WizardAction,
    #[serde(flatten)]
    pub form: ChallengeForm,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct WizardResponse {
    /// Section the owner should see next.
    pub section: Section,
    pub challenge: ChallengeResponse,
}
