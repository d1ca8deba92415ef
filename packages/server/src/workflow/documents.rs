use chrono::Utc;
use sea_orm::*;

use crate::entity::document;
use crate::error::AppError;
use crate::workflow::permissions::Caller;

/// Record a document is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachTarget<'s> {
    Challenge { id: i32, section: Option<&'s str> },
    Submission(i32),
}

impl AttachTarget<'_> {
    fn holds(&self, doc: &document::Model) -> bool {
        match *self {
            Self::Challenge { id, .. } => {
                doc.challenge_id == Some(id) && doc.submission_id.is_none()
            }
            Self::Submission(id) => doc.submission_id == Some(id) && doc.challenge_id.is_none(),
        }
    }
}

fn unavailable(id: i32) -> AppError {
    AppError::field("document_ids", format!("Document {id} is not available"))
}

/// Attach uploaded documents to a challenge or submission.
///
/// Each document must exist, be live, belong to the caller (admins may attach
/// anyone's) and not already be attached elsewhere. Documents already on the
/// target are left as they are. The first unavailable document fails the
/// whole call.
pub async fn attach<C: ConnectionTrait>(
    conn: &C,
    caller: Caller,
    ids: &[i32],
    target: AttachTarget<'_>,
) -> Result<Vec<document::Model>, AppError> {
    let mut attached = Vec::with_capacity(ids.len());
    for &id in ids {
        let doc = document::Entity::find_by_id(id)
            .one(conn)
            .await?
            .filter(|d| d.deleted_at.is_none())
            .ok_or_else(|| unavailable(id))?;

        if !caller.role.is_admin() && doc.user_id != caller.user_id {
            return Err(unavailable(id));
        }
        if target.holds(&doc) {
            attached.push(doc);
            continue;
        }
        if doc.is_attached() {
            return Err(unavailable(id));
        }

        let mut active: document::ActiveModel = doc.into();
        match target {
            AttachTarget::Challenge {
                id: challenge_id,
                section,
            } => {
                active.challenge_id = Set(Some(challenge_id));
                active.section = Set(section.map(str::to_string));
            }
            AttachTarget::Submission(submission_id) => {
                active.submission_id = Set(Some(submission_id))
            }
        }
        attached.push(active.update(conn).await?);
    }
    Ok(attached)
}

/// Live documents attached to `target`, oldest first.
pub async fn list_for<C: ConnectionTrait>(
    conn: &C,
    target: AttachTarget<'_>,
) -> Result<Vec<document::Model>, DbErr> {
    let query = document::Entity::find().filter(document::Column::DeletedAt.is_null());
    let query = match target {
        AttachTarget::Challenge { id, .. } => query.filter(document::Column::ChallengeId.eq(id)),
        AttachTarget::Submission(id) => query.filter(document::Column::SubmissionId.eq(id)),
    };
    query.order_by_asc(document::Column::Id).all(conn).await
}

pub async fn soft_delete<C: ConnectionTrait>(
    conn: &C,
    doc: document::Model,
) -> Result<document::Model, DbErr> {
    let mut active: document::ActiveModel = doc.into();
    active.deleted_at = Set(Some(Utc::now()));
    active.update(conn).await
}
