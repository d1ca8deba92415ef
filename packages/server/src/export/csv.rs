//! CSV rendering of the security and certification logs.
//!
//! A document is a header record followed by one content record per row;
//! each record kind supplies both through [`CsvRecord`].

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::entity::{certification_log, security_log};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer flush failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv output is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl From<ExportError> for crate::error::AppError {
    fn from(err: ExportError) -> Self {
        crate::error::AppError::Internal(err.to_string())
    }
}

/// A row kind that can be rendered to CSV.
pub trait CsvRecord {
    const HEADER: &'static [&'static str];

    fn content(&self) -> Vec<String>;
}

/// Render `rows` under the record kind's header.
pub fn render<R: CsvRecord>(rows: &[R]) -> Result<String, ExportError> {
    render_records(R::HEADER, rows.iter().map(CsvRecord::content))
}

pub fn render_records<I>(header: &[&str], records: I) -> Result<String, ExportError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    for record in records {
        writer.write_record(&record)?;
    }
    writer.flush()?;
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Zero-padded `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

pub fn format_timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flatten a details object to `key: value` pairs joined by `", "`.
///
/// A `duration` value is seconds and renders as `HH:MM:SS`.
pub fn format_details(details: Option<&Value>) -> String {
    let Some(Value::Object(map)) = details else {
        return details.map(scalar).unwrap_or_default();
    };
    map.iter()
        .map(|(key, value)| {
            let rendered = match (key.as_str(), value.as_i64()) {
                ("duration", Some(seconds)) => format_duration(seconds),
                _ => scalar(value),
            };
            format!("{key}: {rendered}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

impl CsvRecord for security_log::Model {
    const HEADER: &'static [&'static str] = &[
        "ID",
        "Action",
        "Details",
        "Originator ID",
        "Originator Role",
        "Originator Identifier",
        "Originator IP Address",
        "Target ID",
        "Target Type",
        "Target Identifier",
        "Logged At",
    ];

    fn content(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.action.as_str().to_string(),
            format_details(self.details.as_ref()),
            opt(&self.originator_id),
            opt(&self.originator_role),
            opt(&self.originator_identifier),
            opt(&self.originator_remote_ip),
            opt(&self.target_id),
            opt(&self.target_type),
            opt(&self.target_identifier),
            format_timestamp(Some(self.logged_at)),
        ]
    }
}

impl CsvRecord for certification_log::Model {
    const HEADER: &'static [&'static str] = &[
        "ID",
        "Approver ID",
        "Approver Role",
        "Approver Identifier",
        "Approver IP Address",
        "User ID",
        "User Role",
        "User Identifier",
        "User IP Address",
        "Requested At",
        "Certified At",
        "Expires At",
        "Denied At",
        "Inserted At",
    ];

    fn content(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            opt(&self.approver_id),
            opt(&self.approver_role),
            opt(&self.approver_identifier),
            opt(&self.approver_remote_ip),
            self.user_id.to_string(),
            self.user_role.clone(),
            self.user_identifier.clone(),
            opt(&self.user_remote_ip),
            format_timestamp(self.requested_at),
            format_timestamp(self.certified_at),
            format_timestamp(self.expires_at),
            format_timestamp(self.denied_at),
            format_timestamp(Some(self.created_at)),
        ]
    }
}
