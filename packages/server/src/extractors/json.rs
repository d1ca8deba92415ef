use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// A `Json<T>` wrapper that reports malformed bodies as field errors, so
/// clients get the same `VALIDATION_ERROR` shape as form failures.
///
/// A value of the wrong type is keyed on its field path (`action`,
/// `phases[0].start_date`); anything else is keyed on `body`.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                let detail = rejection.body_text();
                match rejection {
                    JsonRejection::JsonDataError(_) => {
                        let (field, message) = split_detail(&detail);
                        AppError::field(field, message)
                    }
                    _ => AppError::field("body", detail.as_str()),
                }
            })?;
        Ok(AppJson(value))
    }
}

/// Split axum's `"<prefix>: <path>: <message>"` into field and message.
fn split_detail(detail: &str) -> (&str, &str) {
    let reason = detail.split_once(": ").map_or(detail, |(_, rest)| rest);
    match reason.split_once(": ") {
        Some((path, message)) if !path.is_empty() && !path.contains(' ') => (path, message),
        _ => ("body", reason),
    }
}
