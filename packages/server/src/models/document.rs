use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::document;
use crate::error::FieldErrors;

/// Registers an uploaded file. The bytes are stored elsewhere; the response
/// carries the storage key they belong under.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateDocumentRequest {
    #[schema(example = "official-rules.pdf")]
    pub filename: String,
    /// Display name.
    #[schema(example = "Official rules")]
    pub name: Option<String>,
    #[schema(example = "resources")]
    pub section: Option<String>,
}

const ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "txt", "csv", "xls", "xlsx", "ppt", "pptx", "png", "jpg", "jpeg", "gif",
    "zip",
];

/// Lower-cased extension of `filename`, without the dot.
pub fn extension_of(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn validate_create_document(payload: &CreateDocumentRequest) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let filename = payload.filename.trim();
    if filename.is_empty() || filename.chars().count() > 255 {
        errors.add("filename", "Filename must be 1-255 characters");
    } else if filename.contains('/') || filename.contains('\\') {
        errors.add("filename", "Filename must not contain path separators");
    } else {
        match extension_of(filename) {
            Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
            _ => errors.add(
                "filename",
                format!("Allowed file types: {}", ALLOWED_EXTENSIONS.join(", ")),
            ),
        }
    }
    if let Some(name) = &payload.name
        && name.chars().count() > 255
    {
        errors.add("name", "Name must be at most 255 characters");
    }
    errors
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DocumentResponse {
    pub id: i32,
    pub user_id: i32,
    pub challenge_id: Option<i32>,
    pub submission_id: Option<i32>,
    pub filename: String,
    pub extension: String,
    /// Storage key of the file bytes.
    pub key: String,
    pub name: Option<String>,
    pub section: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<document::Model> for DocumentResponse {
    fn from(d: document::Model) -> Self {
        Self {
            id: d.id,
            user_id: d.user_id,
            challenge_id: d.challenge_id,
            submission_id: d.submission_id,
            filename: d.filename,
            extension: d.extension,
            key: d.key,
            name: d.name,
            section: d.section,
            created_at: d.created_at,
        }
    }
}
