//! Challenge persistence: creation, wizard saves, relations and status changes.
//!
//! Every method runs on the connection it was built with; callers that need
//! several steps to commit together pass a transaction.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use common::{ChallengeStatus, Role, UserStatus};
use sea_orm::prelude::{Expr, Uuid};
use sea_orm::sea_query::LockType;
use sea_orm::*;
use serde_json::json;
use tracing::info;

use crate::audit::{Actor, SecurityLogService, Target, details};
use crate::entity::security_log::SecurityAction;
use crate::entity::{
    agency, challenge, challenge_owner, federal_partner, non_federal_partner, phase, submission,
    timeline_event, user,
};
use crate::error::AppError;
use crate::models::challenge::{
    ChallengeForm, ChallengeRelations, OwnerResponse, PartnerResponse, PhaseInput,
};
use crate::workflow::documents::{self, AttachTarget};
use crate::workflow::permissions::{Caller, is_current_owner};
use crate::workflow::status::{self, Transition};
use crate::workflow::wizard::Section;

/// Result of a committed status change.
pub struct TransitionOutcome {
    pub challenge: challenge::Model,
    /// Current owners to notify once the transaction commits.
    pub notify: Vec<user::Model>,
}

pub struct ChallengeService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> ChallengeService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Live (not soft-deleted) challenge.
    pub async fn find(&self, id: i32) -> Result<challenge::Model, AppError> {
        challenge::Entity::find_by_id(id)
            .filter(challenge::Column::DeletedAt.is_null())
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Challenge not found".into()))
    }

    /// Same as [`Self::find`], locking the row for the rest of the transaction.
    pub async fn find_for_update(&self, id: i32) -> Result<challenge::Model, AppError> {
        challenge::Entity::find_by_id(id)
            .filter(challenge::Column::DeletedAt.is_null())
            .lock(LockType::Update)
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Challenge not found".into()))
    }

    /// All owner rows, revoked ones included.
    pub async fn owner_rows(
        &self,
        challenge_id: i32,
    ) -> Result<Vec<challenge_owner::Model>, DbErr> {
        challenge_owner::Entity::find()
            .filter(challenge_owner::Column::ChallengeId.eq(challenge_id))
            .order_by_asc(challenge_owner::Column::Id)
            .all(self.conn)
            .await
    }

    pub async fn is_owner(&self, challenge_id: i32, user_id: i32) -> Result<bool, DbErr> {
        Ok(is_current_owner(&self.owner_rows(challenge_id).await?, user_id))
    }

    /// Users holding a non-revoked owner row.
    pub async fn current_owners(&self, challenge_id: i32) -> Result<Vec<user::Model>, DbErr> {
        let ids: Vec<i32> = self
            .owner_rows(challenge_id)
            .await?
            .into_iter()
            .filter(|o| o.is_current())
            .map(|o| o.user_id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        user::Entity::find()
            .filter(user::Column::Id.is_in(ids))
            .order_by_asc(user::Column::Id)
            .all(self.conn)
            .await
    }

    /// Insert a challenge from `form` and attach its relations.
    pub async fn create(
        &self,
        caller: Caller,
        form: &ChallengeForm,
        status: ChallengeStatus,
        last_section: Option<Section>,
    ) -> Result<challenge::Model, AppError> {
        let now = Utc::now();
        let title = form.title.as_deref().map(str::trim).unwrap_or_default();
        let active = challenge::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            title: Set(title.to_string()),
            status: Set(status),
            user_id: Set(caller.user_id),
            last_section: Set(last_section.map(|s| s.as_str().to_string())),
            prize_total: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(self.conn).await?;
        let form = ChallengeForm {
            owner_ids: Some(form.owner_ids.clone().unwrap_or_default()),
            ..form.clone()
        };
        let model = self.save_form(model, caller, &form, None).await?;
        info!(challenge_id = model.id, status = %model.status, "challenge created");
        Ok(model)
    }

    /// Write every field present in `form`, then replace the relations it carries.
    ///
    /// `section` is the wizard section the form came from, if any; attached
    /// documents are tagged with it.
    pub async fn save_form(
        &self,
        existing: challenge::Model,
        caller: Caller,
        form: &ChallengeForm,
        section: Option<Section>,
    ) -> Result<challenge::Model, AppError> {
        if let Some(agency_id) = form.agency_id {
            self.require_agency(agency_id, "agency_id").await?;
        }

        let challenge_id = existing.id;
        let mut active: challenge::ActiveModel = existing.into();
        if let Some(title) = &form.title {
            active.title = Set(title.trim().to_string());
        }
        if form.agency_id.is_some() {
            active.agency_id = Set(form.agency_id);
        }
        macro_rules! copy {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = &form.$field {
                    active.$field = Set(Some(value.clone()));
                })*
            };
        }
        copy!(
            fiscal_year,
            tagline,
            brief_description,
            description,
            external_url,
            logo_key,
            logo_alt_text,
            prize_description,
            non_monetary_prizes,
            eligibility_requirements,
            rules,
            terms_and_conditions,
            judging_criteria,
            how_to_enter,
        );
        if let Some(total) = form.prize_total {
            active.prize_total = Set(total);
        }
        active.updated_at = Set(Utc::now());
        let mut model = active.update(self.conn).await?;

        if let Some(owner_ids) = &form.owner_ids {
            self.replace_owners(&model, owner_ids).await?;
        }
        if let Some(agency_ids) = &form.federal_partner_ids {
            self.replace_federal_partners(challenge_id, agency_ids).await?;
        }
        if let Some(names) = &form.non_federal_partners {
            self.replace_non_federal_partners(challenge_id, names).await?;
        }
        if let Some(phases) = &form.phases {
            model = self.replace_phases(model, phases).await?;
        }
        if let Some(document_ids) = &form.document_ids {
            documents::attach(
                self.conn,
                caller,
                document_ids,
                AttachTarget::Challenge {
                    id: challenge_id,
                    section: section.map(|s| s.as_str()),
                },
            )
            .await?;
        }
        Ok(model)
    }

    /// Record where the owner left the wizard.
    pub async fn set_last_section(
        &self,
        existing: challenge::Model,
        section: Section,
    ) -> Result<challenge::Model, DbErr> {
        let mut active: challenge::ActiveModel = existing.into();
        active.last_section = Set(Some(section.as_str().to_string()));
        active.updated_at = Set(Utc::now());
        active.update(self.conn).await
    }

    async fn require_agency(&self, agency_id: i32, field: &str) -> Result<agency::Model, AppError> {
        agency::Entity::find_by_id(agency_id)
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::field(field, format!("Agency {agency_id} does not exist")))
    }

    /// Make `user_ids` the current owners.
    ///
    /// Owners no longer listed are revoked; their rows stay. Listed owners get
    /// a fresh row (delete, then insert). A creator holding the challenge-owner
    /// role always stays an owner.
    pub async fn replace_owners(
        &self,
        challenge: &challenge::Model,
        user_ids: &[i32],
    ) -> Result<(), AppError> {
        let mut wanted: Vec<i32> = Vec::new();
        for &id in user_ids {
            if !wanted.contains(&id) {
                wanted.push(id);
            }
        }
        let creator = user::Entity::find_by_id(challenge.user_id)
            .one(self.conn)
            .await?
            .filter(|u| u.role == Role::ChallengeOwner)
            .map(|u| u.id);
        if let Some(creator) = creator
            && !wanted.contains(&creator)
        {
            wanted.push(creator);
        }

        let eligible: HashMap<i32, user::Model> = if wanted.is_empty() {
            HashMap::new()
        } else {
            user::Entity::find()
                .filter(user::Column::Id.is_in(wanted.clone()))
                .all(self.conn)
                .await?
                .into_iter()
                .map(|u| (u.id, u))
                .collect()
        };
        for id in wanted.iter().filter(|&&id| Some(id) != creator) {
            let ok = eligible.get(id).is_some_and(|u| {
                (u.role == Role::ChallengeOwner || u.role.is_admin())
                    && u.status == UserStatus::Active
            });
            if !ok {
                return Err(AppError::field(
                    "owner_ids",
                    format!("User {id} cannot own challenges"),
                ));
            }
        }

        let now = Utc::now();
        challenge_owner::Entity::update_many()
            .col_expr(challenge_owner::Column::RevokedAt, Expr::value(Some(now)))
            .filter(challenge_owner::Column::ChallengeId.eq(challenge.id))
            .filter(challenge_owner::Column::RevokedAt.is_null())
            .filter(challenge_owner::Column::UserId.is_not_in(wanted.clone()))
            .exec(self.conn)
            .await?;

        if wanted.is_empty() {
            return Ok(());
        }
        challenge_owner::Entity::delete_many()
            .filter(challenge_owner::Column::ChallengeId.eq(challenge.id))
            .filter(challenge_owner::Column::RevokedAt.is_null())
            .filter(challenge_owner::Column::UserId.is_in(wanted.clone()))
            .exec(self.conn)
            .await?;
        challenge_owner::Entity::insert_many(wanted.iter().map(|&user_id| {
            challenge_owner::ActiveModel {
                challenge_id: Set(challenge.id),
                user_id: Set(user_id),
                revoked_at: Set(None),
                created_at: Set(now),
                ..Default::default()
            }
        }))
        .exec(self.conn)
        .await?;
        Ok(())
    }

    /// Add one owner, keeping everyone else.
    pub async fn add_owner(
        &self,
        challenge: &challenge::Model,
        user_id: i32,
    ) -> Result<(), AppError> {
        let mut ids: Vec<i32> = self
            .owner_rows(challenge.id)
            .await?
            .into_iter()
            .filter(|o| o.is_current())
            .map(|o| o.user_id)
            .collect();
        ids.push(user_id);
        self.replace_owners(challenge, &ids).await
    }

    /// Stamp `revoked_at` on the user's current owner row.
    pub async fn revoke_owner(&self, challenge_id: i32, user_id: i32) -> Result<(), AppError> {
        let result = challenge_owner::Entity::update_many()
            .col_expr(challenge_owner::Column::RevokedAt, Expr::value(Some(Utc::now())))
            .filter(challenge_owner::Column::ChallengeId.eq(challenge_id))
            .filter(challenge_owner::Column::UserId.eq(user_id))
            .filter(challenge_owner::Column::RevokedAt.is_null())
            .exec(self.conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Owner not found".into()));
        }
        Ok(())
    }

    /// Revoke partners no longer listed and add the new ones.
    pub async fn replace_federal_partners(
        &self,
        challenge_id: i32,
        agency_ids: &[i32],
    ) -> Result<(), AppError> {
        let wanted: HashSet<i32> = agency_ids.iter().copied().collect();
        for &id in &wanted {
            self.require_agency(id, "federal_partner_ids").await?;
        }
        let now = Utc::now();
        let current = federal_partner::Entity::find()
            .filter(federal_partner::Column::ChallengeId.eq(challenge_id))
            .filter(federal_partner::Column::RevokedAt.is_null())
            .all(self.conn)
            .await?;

        let mut kept = HashSet::new();
        for partner in current {
            if wanted.contains(&partner.agency_id) {
                kept.insert(partner.agency_id);
            } else {
                let mut active: federal_partner::ActiveModel = partner.into();
                active.revoked_at = Set(Some(now));
                active.update(self.conn).await?;
            }
        }
        let mut added: Vec<i32> = wanted.difference(&kept).copied().collect();
        added.sort_unstable();
        for agency_id in added {
            federal_partner::ActiveModel {
                challenge_id: Set(challenge_id),
                agency_id: Set(agency_id),
                revoked_at: Set(None),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(self.conn)
            .await?;
        }
        Ok(())
    }

    pub async fn replace_non_federal_partners(
        &self,
        challenge_id: i32,
        names: &[String],
    ) -> Result<(), AppError> {
        non_federal_partner::Entity::delete_many()
            .filter(non_federal_partner::Column::ChallengeId.eq(challenge_id))
            .exec(self.conn)
            .await?;
        let now = Utc::now();
        for name in names {
            non_federal_partner::ActiveModel {
                challenge_id: Set(challenge_id),
                name: Set(name.trim().to_string()),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(self.conn)
            .await?;
        }
        Ok(())
    }

    pub async fn phases(&self, challenge_id: i32) -> Result<Vec<phase::Model>, DbErr> {
        phase::Entity::find()
            .filter(phase::Column::ChallengeId.eq(challenge_id))
            .order_by_asc(phase::Column::StartDate)
            .order_by_asc(phase::Column::Id)
            .all(self.conn)
            .await
    }

    /// Make `inputs` the challenge's phases and recompute its start and end dates.
    ///
    /// Listed phases with an `id` are updated, the rest inserted. Unlisted
    /// phases are deleted unless they already hold submissions.
    pub async fn replace_phases(
        &self,
        challenge: challenge::Model,
        inputs: &[PhaseInput],
    ) -> Result<challenge::Model, AppError> {
        let existing: HashMap<i32, phase::Model> = self
            .phases(challenge.id)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let now = Utc::now();

        let mut kept = HashSet::new();
        for (i, input) in inputs.iter().enumerate() {
            match input.id {
                Some(id) => {
                    let current = existing.get(&id).cloned().ok_or_else(|| {
                        AppError::field(
                            &format!("phases[{i}].id"),
                            format!("Phase {id} does not belong to this challenge"),
                        )
                    })?;
                    kept.insert(id);
                    let mut active: phase::ActiveModel = current.into();
                    active.title = Set(input.title.trim().to_string());
                    active.start_date = Set(input.start_date);
                    active.end_date = Set(input.end_date);
                    active.open_to_submissions = Set(input.open_to_submissions);
                    active.judging_criteria = Set(input.judging_criteria.clone());
                    active.how_to_enter = Set(input.how_to_enter.clone());
                    active.updated_at = Set(now);
                    active.update(self.conn).await?;
                }
                None => {
                    phase::ActiveModel {
                        challenge_id: Set(challenge.id),
                        title: Set(input.title.trim().to_string()),
                        start_date: Set(input.start_date),
                        end_date: Set(input.end_date),
                        open_to_submissions: Set(input.open_to_submissions),
                        judging_criteria: Set(input.judging_criteria.clone()),
                        how_to_enter: Set(input.how_to_enter.clone()),
                        created_at: Set(now),
                        updated_at: Set(now),
                        ..Default::default()
                    }
                    .insert(self.conn)
                    .await?;
                }
            }
        }

        for (id, phase) in &existing {
            if kept.contains(id) {
                continue;
            }
            let in_use = submission::Entity::find()
                .filter(submission::Column::PhaseId.eq(*id))
                .filter(submission::Column::DeletedAt.is_null())
                .count(self.conn)
                .await?;
            if in_use > 0 {
                return Err(AppError::field(
                    "phases",
                    format!("Phase \"{}\" has submissions and cannot be removed", phase.title),
                ));
            }
            phase::Entity::delete_by_id(*id).exec(self.conn).await?;
        }

        let start = inputs.iter().map(|p| p.start_date).min();
        let end = inputs.iter().map(|p| p.end_date).max();
        let mut active: challenge::ActiveModel = challenge.into();
        active.start_date = Set(start);
        active.end_date = Set(end);
        active.updated_at = Set(now);
        Ok(active.update(self.conn).await?)
    }

    pub async fn add_timeline_event(
        &self,
        challenge_id: i32,
        title: &str,
        body: Option<String>,
        occurs_on: chrono::DateTime<Utc>,
    ) -> Result<timeline_event::Model, DbErr> {
        timeline_event::ActiveModel {
            challenge_id: Set(challenge_id),
            title: Set(title.to_string()),
            body: Set(body),
            occurs_on: Set(occurs_on),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.conn)
        .await
    }

    /// Apply `transition`: status write, timeline event and audit entry.
    ///
    /// Emails are not sent here; the outcome lists the owners to notify after commit.
    pub async fn transition(
        &self,
        challenge: challenge::Model,
        transition: Transition,
        actor: &Actor,
        rejection_message: Option<String>,
    ) -> Result<TransitionOutcome, AppError> {
        let now = Utc::now();
        let change = status::plan(&challenge, transition, now)?;
        let challenge_id = challenge.id;
        let title = challenge.title.clone();

        let mut active: challenge::ActiveModel = challenge.into();
        active.status = Set(change.to);
        if let Some(sub_status) = change.sub_status {
            active.sub_status = Set(Some(sub_status));
        }
        if let Some(published_on) = change.published_on {
            active.published_on = Set(Some(published_on));
        }
        if transition == Transition::Reject {
            active.rejection_message = Set(rejection_message);
        }
        active.updated_at = Set(now);
        let updated = active.update(self.conn).await?;

        if change.records_timeline_event {
            self.add_timeline_event(challenge_id, change.to.label(), None, now)
                .await?;
        }

        SecurityLogService::new(self.conn)
            .track(
                SecurityAction::ChallengeStatusChange,
                actor,
                Some(&Target::challenge(challenge_id, &title)),
                Some(details([
                    ("action", json!(transition.name())),
                    ("old_status", json!(change.from.as_str())),
                    ("new_status", json!(change.to.as_str())),
                ])),
            )
            .await?;

        let notify = if change.notifies_owners {
            self.current_owners(challenge_id).await?
        } else {
            Vec::new()
        };
        info!(
            challenge_id,
            from = %change.from,
            to = %change.to,
            "challenge status changed"
        );
        Ok(TransitionOutcome {
            challenge: updated,
            notify,
        })
    }

    /// Soft-delete the challenge and log who deleted it and from which status.
    pub async fn soft_delete(
        &self,
        challenge: challenge::Model,
        actor: &Actor,
    ) -> Result<challenge::Model, DbErr> {
        let target = Target::challenge(challenge.id, &challenge.title);
        let status = challenge.status;
        let mut active: challenge::ActiveModel = challenge.into();
        let now = Utc::now();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);
        let deleted = active.update(self.conn).await?;

        SecurityLogService::new(self.conn)
            .track(
                SecurityAction::ChallengeDelete,
                actor,
                Some(&target),
                Some(details([("status", json!(status.as_str()))])),
            )
            .await?;
        info!(challenge_id = deleted.id, "challenge deleted");
        Ok(deleted)
    }

    /// Gather everything a detail response shows.
    pub async fn relations(
        &self,
        challenge: &challenge::Model,
    ) -> Result<ChallengeRelations, DbErr> {
        let agency_name = match challenge.agency_id {
            Some(id) => agency::Entity::find_by_id(id)
                .one(self.conn)
                .await?
                .map(|a| a.name),
            None => None,
        };

        let owners = self
            .current_owners(challenge.id)
            .await?
            .into_iter()
            .map(|u| OwnerResponse {
                user_id: u.id,
                name: u.full_name(),
                email: u.email,
            })
            .collect();

        let partner_rows = federal_partner::Entity::find()
            .filter(federal_partner::Column::ChallengeId.eq(challenge.id))
            .filter(federal_partner::Column::RevokedAt.is_null())
            .order_by_asc(federal_partner::Column::Id)
            .all(self.conn)
            .await?;
        let agency_names: HashMap<i32, String> = if partner_rows.is_empty() {
            HashMap::new()
        } else {
            agency::Entity::find()
                .filter(agency::Column::Id.is_in(partner_rows.iter().map(|p| p.agency_id)))
                .all(self.conn)
                .await?
                .into_iter()
                .map(|a| (a.id, a.name))
                .collect()
        };
        let federal_partners = partner_rows
            .into_iter()
            .map(|p| PartnerResponse {
                name: agency_names.get(&p.agency_id).cloned().unwrap_or_default(),
                agency_id: p.agency_id,
            })
            .collect();

        let non_federal_partners = non_federal_partner::Entity::find()
            .filter(non_federal_partner::Column::ChallengeId.eq(challenge.id))
            .order_by_asc(non_federal_partner::Column::Id)
            .all(self.conn)
            .await?;

        let documents = documents::list_for(
            self.conn,
            AttachTarget::Challenge {
                id: challenge.id,
                section: None,
            },
        )
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

        let timeline_events = timeline_event::Entity::find()
            .filter(timeline_event::Column::ChallengeId.eq(challenge.id))
            .order_by_asc(timeline_event::Column::OccursOn)
            .order_by_asc(timeline_event::Column::Id)
            .all(self.conn)
            .await?;

        Ok(ChallengeRelations {
            agency_name,
            owners,
            federal_partners,
            non_federal_partners,
            phases: self.phases(challenge.id).await?,
            documents,
            timeline_events,
        })
    }
}
