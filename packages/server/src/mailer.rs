//! Outbound email seam.
//!
//! Messages are built by [`crate::notifications`] and handed to a [`Mailer`]
//! after the originating transaction commits. Delivery is fire-and-forget:
//! failures are logged and never reach the request that triggered them.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("delivery to {to} failed: {reason}")]
    Delivery { to: String, reason: String },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, email: &Email) -> Result<(), MailError>;
}

/// Mailer that writes each message to the log instead of a mail relay.
pub struct LogMailer {
    from_address: String,
}

impl LogMailer {
    pub fn new(from_address: impl Into<String>) -> Self {
        Self {
            from_address: from_address.into(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn deliver(&self, email: &Email) -> Result<(), MailError> {
        info!(
            from = %self.from_address,
            to = %email.to,
            subject = %email.subject,
            "Email delivered"
        );
        Ok(())
    }
}

/// Deliver `emails` in the background.
pub fn dispatch(mailer: Arc<dyn Mailer>, emails: Vec<Email>) -> Option<JoinHandle<()>> {
    if emails.is_empty() {
        return None;
    }
    Some(tokio::spawn(async move {
        for email in emails {
            if let Err(e) = mailer.deliver(&email).await {
                warn!(error = %e, subject = %email.subject, "Failed to deliver email");
            }
        }
    }))
}
