//! Outbound email delivery
//!
//! Request handlers never talk to the email provider. They push rendered
//! [`Email`]s onto a [`NotificationQueue`]; a background worker started by
//! [`spawn_dispatcher`] delivers them one by one. Delivery failures are
//! logged and dropped: no retries, and nothing flows back to the request
//! that produced the email.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::notify::Email;

const BREVO_ENDPOINT: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("email request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("email provider rejected the message: {0}")]
    Rejected(String),
}

/// Delivers a rendered email
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Sends through Brevo's transactional email API
#[derive(Debug, Clone)]
pub struct BrevoMailer {
    http: reqwest::Client,
    api_key: String,
}

impl BrevoMailer {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key }
    }
}

#[async_trait]
impl Mailer for BrevoMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let mut payload = json!({
            "sender": { "name": email.from_name, "email": email.from_address },
            "to": [{ "email": email.to }],
            "subject": email.subject,
            "htmlContent": email.html,
        });
        if !email.attachments.is_empty() {
            payload["attachment"] = email
                .attachments
                .iter()
                .map(|file| json!({ "name": file.file_name, "content": STANDARD.encode(&file.bytes) }))
                .collect();
        }

        let response = self
            .http
            .post(BREVO_ENDPOINT)
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected(format!("{}: {}", status, text)));
        }
        Ok(())
    }
}

/// Logs emails instead of sending them (no provider configured)
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            attachments = email.attachments.len(),
            "Email provider not configured; logging email instead of sending"
        );
        Ok(())
    }
}

/// Handle for enqueueing emails; cheap to clone
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    tx: mpsc::UnboundedSender<Email>,
}

impl NotificationQueue {
    /// Creates a queue and the receiving end a worker should drain
    pub fn unbounded() -> (Self, mpsc::UnboundedReceiver<Email>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Hands an email to the worker; never blocks and never fails the caller
    pub fn enqueue(&self, email: Email) {
        let subject = email.subject.clone();
        if self.tx.send(email).is_err() {
            tracing::error!(%subject, "Notification worker stopped; email dropped");
        }
    }
}

/// Starts the delivery worker
///
/// The worker exits once every [`NotificationQueue`] clone has been
/// dropped and the backlog is drained, so awaiting the handle after the
/// server stops flushes pending emails.
pub fn spawn_dispatcher(mailer: Arc<dyn Mailer>) -> (NotificationQueue, JoinHandle<()>) {
    let (queue, rx) = NotificationQueue::unbounded();
    let handle = tokio::spawn(run_dispatcher(mailer, rx));
    (queue, handle)
}

async fn run_dispatcher(mailer: Arc<dyn Mailer>, mut rx: mpsc::UnboundedReceiver<Email>) {
    while let Some(email) = rx.recv().await {
        match mailer.send(&email).await {
            Ok(()) => tracing::info!(to = %email.to, subject = %email.subject, "Email sent"),
            Err(err) => tracing::error!(
                to = %email.to,
                subject = %email.subject,
                error = %err,
                "Email delivery failed"
            ),
        }
    }
    tracing::debug!("Notification worker finished");
}
