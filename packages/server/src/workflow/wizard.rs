//! Challenge creation wizard: section sequencing and per-section validation.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::{challenge, phase};
use crate::error::FieldErrors;
use crate::models::challenge::{ChallengeForm, PhaseInput};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    General,
    Details,
    Timeline,
    Prizes,
    Rules,
    Judging,
    HowToEnter,
    Resources,
    Review,
}

impl Section {
    pub const ALL: &'static [Section] = &[
        Self::General,
        Self::Details,
        Self::Timeline,
        Self::Prizes,
        Self::Rules,
        Self::Judging,
        Self::HowToEnter,
        Self::Resources,
        Self::Review,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Details => "details",
            Self::Timeline => "timeline",
            Self::Prizes => "prizes",
            Self::Rules => "rules",
            Self::Judging => "judging",
            Self::HowToEnter => "how_to_enter",
            Self::Resources => "resources",
            Self::Review => "review",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    /// `None` on `review`.
    pub fn next(&self) -> Option<Section> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// `None` on `general`.
    pub fn prev(&self) -> Option<Section> {
        self.index().checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    /// Keep only the fields this section edits.
    pub fn restrict(&self, form: ChallengeForm) -> ChallengeForm {
        let mut out = ChallengeForm::default();
        match self {
            Self::General => {
                out.title = form.title;
                out.agency_id = form.agency_id;
                out.fiscal_year = form.fiscal_year;
                out.owner_ids = form.owner_ids;
                out.federal_partner_ids = form.federal_partner_ids;
                out.non_federal_partners = form.non_federal_partners;
            }
            Self::Details => {
                out.tagline = form.tagline;
                out.brief_description = form.brief_description;
                out.description = form.description;
                out.external_url = form.external_url;
                out.logo_key = form.logo_key;
                out.logo_alt_text = form.logo_alt_text;
            }
            Self::Timeline => out.phases = form.phases,
            Self::Prizes => {
                out.prize_total = form.prize_total;
                out.prize_description = form.prize_description;
                out.non_monetary_prizes = form.non_monetary_prizes;
            }
            Self::Rules => {
                out.eligibility_requirements = form.eligibility_requirements;
                out.rules = form.rules;
                out.terms_and_conditions = form.terms_and_conditions;
            }
            Self::Judging => out.judging_criteria = form.judging_criteria,
            Self::HowToEnter => out.how_to_enter = form.how_to_enter,
            Self::Resources => out.document_ids = form.document_ids,
            Self::Review => {}
        }
        out
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = common::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| common::ParseEnumError::new("section", s, Self::ALL))
    }
}

/// What the owner pressed at the bottom of a section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WizardAction {
    /// Validate fully, save and advance.
    Next,
    /// Save without required-field checks and go back.
    Back,
    /// Save without required-field checks and stay.
    SaveDraft,
    /// Only on `review`: validate every section and hand in for review.
    Submit,
}

impl WizardAction {
    /// Required fields are enforced only when moving forward.
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Next | Self::Submit)
    }
}

/// Where the wizard lands after `action` on `section`.
pub fn destination(section: Section, action: WizardAction) -> Section {
    match action {
        WizardAction::Next => section.next().unwrap_or(section),
        WizardAction::Back => section.prev().unwrap_or(section),
        WizardAction::SaveDraft | WizardAction::Submit => section,
    }
}

const MAX_TAGLINE: usize = 90;
const MAX_BRIEF_DESCRIPTION: usize = 200;

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

fn too_long(value: &Option<String>, max: usize) -> bool {
    value.as_deref().is_some_and(|v| v.chars().count() > max)
}

fn require(errors: &mut FieldErrors, field: &str, value: &Option<String>, strict: bool) {
    if strict && is_blank(value) {
        errors.add(field, "can't be blank");
    }
}

fn is_fiscal_year(value: &str) -> bool {
    value.len() == 4
        && value.starts_with("FY")
        && value[2..].chars().all(|c| c.is_ascii_digit())
}

fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    rest.is_some_and(|r| !r.is_empty() && !r.contains(char::is_whitespace))
}

fn validate_phases(errors: &mut FieldErrors, phases: &Option<Vec<PhaseInput>>, strict: bool) {
    let Some(phases) = phases else {
        if strict {
            errors.add("phases", "must have at least one phase");
        }
        return;
    };
    if strict && phases.is_empty() {
        errors.add("phases", "must have at least one phase");
    }
    let mut ids = HashSet::new();
    for (i, p) in phases.iter().enumerate() {
        if p.title.trim().is_empty() || p.title.chars().count() > 256 {
            errors.add(&format!("phases[{i}].title"), "must be 1-256 characters");
        }
        if p.end_date <= p.start_date {
            errors.add(&format!("phases[{i}].end_date"), "must be after start date");
        }
        if let Some(id) = p.id
            && !ids.insert(id)
        {
            errors.add(&format!("phases[{i}].id"), "is listed twice");
        }
    }
}

fn validate_section(errors: &mut FieldErrors, section: Section, form: &ChallengeForm, strict: bool) {
    match section {
        Section::General => {
            match form.title.as_deref().map(str::trim) {
                Some(t) if t.is_empty() || t.chars().count() > 256 => {
                    errors.add("title", "must be 1-256 characters")
                }
                None if strict => errors.add("title", "can't be blank"),
                _ => {}
            }
            if strict && form.agency_id.is_none() {
                errors.add("agency_id", "can't be blank");
            }
            if let Some(fy) = &form.fiscal_year
                && !is_fiscal_year(fy)
            {
                errors.add("fiscal_year", "must look like FY26");
            }
            if let Some(names) = &form.non_federal_partners
                && names.iter().any(|n| n.trim().is_empty())
            {
                errors.add("non_federal_partners", "names can't be blank");
            }
        }
        Section::Details => {
            require(errors, "tagline", &form.tagline, strict);
            require(errors, "brief_description", &form.brief_description, strict);
            require(errors, "description", &form.description, strict);
            if too_long(&form.tagline, MAX_TAGLINE) {
                errors.add("tagline", format!("must be at most {MAX_TAGLINE} characters"));
            }
            if too_long(&form.brief_description, MAX_BRIEF_DESCRIPTION) {
                errors.add(
                    "brief_description",
                    format!("must be at most {MAX_BRIEF_DESCRIPTION} characters"),
                );
            }
            if let Some(url) = &form.external_url
                && !url.is_empty()
                && !is_http_url(url)
            {
                errors.add("external_url", "must be an http or https URL");
            }
            if form.logo_key.is_some() && strict {
                require(errors, "logo_alt_text", &form.logo_alt_text, strict);
            }
        }
        Section::Timeline => validate_phases(errors, &form.phases, strict),
        Section::Prizes => {
            if form.prize_total.is_some_and(|t| t < 0) {
                errors.add("prize_total", "must be zero or more");
            }
            if strict && form.prize_total.unwrap_or(0) == 0 && is_blank(&form.non_monetary_prizes)
            {
                errors.add("prize_total", "needs a cash prize or a non-monetary prize");
            }
        }
        Section::Rules => {
            require(errors, "eligibility_requirements", &form.eligibility_requirements, strict);
            require(errors, "terms_and_conditions", &form.terms_and_conditions, strict);
        }
        Section::Judging => require(errors, "judging_criteria", &form.judging_criteria, strict),
        Section::HowToEnter => require(errors, "how_to_enter", &form.how_to_enter, strict),
        Section::Resources | Section::Review => {}
    }
}

/// Validate the fields `section` edits.
pub fn validate(section: Section, form: &ChallengeForm, strict: bool) -> FieldErrors {
    let mut errors = FieldErrors::new();
    validate_section(&mut errors, section, form, strict);
    errors
}

/// Validate a whole form against every section.
pub fn validate_all(form: &ChallengeForm, strict: bool) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for &section in Section::ALL {
        validate_section(&mut errors, section, form, strict);
    }
    errors
}

/// Check that a stored challenge is complete enough to hand in for review.
pub fn check_complete(challenge: &challenge::Model, phases: &[phase::Model]) -> FieldErrors {
    validate_all(&ChallengeForm::from_stored(challenge, phases), true)
}
