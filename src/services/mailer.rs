//! Outbound e-mail transport
//!
//! [`HttpMailer`] posts JSON to a transactional e-mail API with a bearer key;
//! [`LogMailer`] only logs, for development or when e-mail is disabled.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::EmailConfig;
use crate::utils::errors::{OfficialIdError, Result};

/// A fully rendered message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message; a single attempt, never retried here
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: String,
    from_address: String,
}

impl HttpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("OfficialId-Events/1.0")
            .build()
            .map_err(OfficialIdError::Http)?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        debug!(to = %message.to, subject = %message.subject, "Sending e-mail");

        let body = SendEmailRequest {
            from: &self.from_address,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(OfficialIdError::Email(format!("provider returned {status}: {detail}")));
        }

        Ok(())
    }
}

/// Logs messages instead of sending them
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(to = %message.to, subject = %message.subject, "E-mail delivery disabled, message logged only");
        Ok(())
    }
}
