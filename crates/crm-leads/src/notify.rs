//! Outbound notifications.
//!
//! Notifications are best-effort: they are dispatched on a background
//! task after the triggering write has committed, and a delivery failure
//! is logged without affecting the operation that caused it.

use std::sync::Arc;

use crm_core::error::CrmError;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// A plain-text message to one or more recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Vec<String>,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid address '{address}': {reason}")]
    Address { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("delivery failed: {0}")]
    Transport(String),
}

impl From<NotifyError> for CrmError {
    fn from(err: NotifyError) -> Self {
        CrmError::Notification(err.to_string())
    }
}

/// Delivers notifications.
pub trait Notifier: Send + Sync {
    fn send(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Send `notification` on a background task. Failures are logged at
/// `warn` and otherwise ignored.
pub fn dispatch<N: Notifier + 'static>(notifier: &Arc<N>, notification: Notification) {
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        match notifier.send(&notification).await {
            Ok(()) => debug!(subject = %notification.subject, "Notification delivered"),
            Err(e) => warn!(
                subject = %notification.subject,
                error = %e,
                "Notification delivery failed"
            ),
        }
    });
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            subject = %notification.subject,
            from = %notification.from,
            to = ?notification.to,
            body = %notification.body,
            "Notification"
        );
        Ok(())
    }
}

/// SMTP relay settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Upgrade the connection with STARTTLS. Disable only for local
    /// test relays.
    pub starttls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 587,
            username: None,
            password: None,
            starttls: true,
        }
    }
}

/// Delivers notifications through an SMTP relay.
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| NotifyError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

fn mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse().map_err(|e: lettre::address::AddressError| NotifyError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Build the MIME message for a notification.
fn build_message(notification: &Notification) -> Result<Message, NotifyError> {
    let mut builder = Message::builder()
        .from(mailbox(&notification.from)?)
        .subject(notification.subject.clone())
        .header(ContentType::TEXT_PLAIN);

    for recipient in &notification.to {
        builder = builder.to(mailbox(recipient)?);
    }

    builder
        .body(notification.body.clone())
        .map_err(|e| NotifyError::Build(e.to_string()))
}

impl Notifier for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if notification.to.is_empty() {
            debug!(subject = %notification.subject, "No recipients, skipping");
            return Ok(());
        }

        let message = build_message(notification)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        info!(
            subject = %notification.subject,
            recipients = notification.to.len(),
            "Notification sent"
        );
        Ok(())
    }
}
