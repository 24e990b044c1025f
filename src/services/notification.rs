//! Notification service implementation
//!
//! Registration and approval e-mails are queued on an unbounded channel and
//! delivered by a single background worker. Each message gets exactly one
//! delivery attempt; failures are logged and counted, never surfaced to the
//! request that queued them.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use chrono::NaiveDate;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::services::mailer::{EmailMessage, Mailer};
use crate::utils::errors::{OfficialIdError, Result};
use crate::utils::logging::log_notification_failure;

pub const REGISTRATION_RECEIVED: &str = "registration_received";
pub const REGISTRATION_APPROVED: &str = "registration_approved";

/// Message template with per-language subject and body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub key: String,
    pub subject: HashMap<String, String>, // language -> subject
    pub body: HashMap<String, String>,    // language -> HTML body
}

/// A state transition worth telling the registrant about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    RegistrationReceived {
        to: String,
        name: String,
        event_title: String,
        event_date: NaiveDate,
        language: String,
    },
    RegistrationApproved {
        to: String,
        name: String,
        event_title: String,
        event_date: NaiveDate,
        ticket_number: String,
        ticket_url: String,
        language: String,
    },
}

impl Notification {
    pub fn template_key(&self) -> &'static str {
        match self {
            Notification::RegistrationReceived { .. } => REGISTRATION_RECEIVED,
            Notification::RegistrationApproved { .. } => REGISTRATION_APPROVED,
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Notification::RegistrationReceived { to, .. } | Notification::RegistrationApproved { to, .. } => to,
        }
    }

    fn language(&self) -> &str {
        match self {
            Notification::RegistrationReceived { language, .. }
            | Notification::RegistrationApproved { language, .. } => language,
        }
    }

    fn parameters(&self) -> HashMap<String, String> {
        let mut parameters = HashMap::new();
        match self {
            Notification::RegistrationReceived { name, event_title, event_date, .. } => {
                parameters.insert("name".to_string(), name.clone());
                parameters.insert("event_title".to_string(), event_title.clone());
                parameters.insert("event_date".to_string(), event_date.format("%d-%m-%Y").to_string());
            }
            Notification::RegistrationApproved {
                name,
                event_title,
                event_date,
                ticket_number,
                ticket_url,
                ..
            } => {
                parameters.insert("name".to_string(), name.clone());
                parameters.insert("event_title".to_string(), event_title.clone());
                parameters.insert("event_date".to_string(), event_date.format("%d-%m-%Y").to_string());
                parameters.insert("ticket_number".to_string(), ticket_number.clone());
                parameters.insert("ticket_url".to_string(), ticket_url.clone());
            }
        }
        parameters
    }
}

/// Delivery counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStats {
    pub total_sent: u64,
    pub total_failed: u64,
    pub sent_by_template: HashMap<String, u64>,
}

/// Renders templates into e-mails
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    templates: HashMap<String, MessageTemplate>,
    default_language: String,
}

impl TemplateRenderer {
    pub fn new(default_language: &str) -> Self {
        Self {
            templates: Self::load_default_templates(),
            default_language: default_language.to_string(),
        }
    }

    pub fn render(&self, notification: &Notification) -> Result<EmailMessage> {
        let key = notification.template_key();
        let template = self
            .templates
            .get(key)
            .ok_or_else(|| OfficialIdError::Email(format!("Template not found: {key}")))?;

        let language = notification.language();
        let pick = |content: &HashMap<String, String>| {
            content
                .get(language)
                .or_else(|| content.get(&self.default_language))
                .cloned()
                .ok_or_else(|| OfficialIdError::Email(format!("Template {key} has no content for {language}")))
        };

        let parameters = notification.parameters();
        Ok(EmailMessage {
            to: notification.recipient().to_string(),
            subject: format_template(&pick(&template.subject)?, &parameters, false),
            html: format_template(&pick(&template.body)?, &parameters, true),
        })
    }

    fn load_default_templates() -> HashMap<String, MessageTemplate> {
        let mut templates = HashMap::new();

        let subject = HashMap::from([
            ("id".to_string(), "Pendaftaran {event_title} diterima".to_string()),
            ("en".to_string(), "Registration for {event_title} received".to_string()),
        ]);
        let body = HashMap::from([
            (
                "id".to_string(),
                "<p>Halo {name},</p><p>Terima kasih telah mendaftar untuk <b>{event_title}</b> ({event_date}). \
                 Pendaftaran Anda sedang ditinjau oleh penyelenggara. Tiket akan dikirim setelah pendaftaran disetujui.</p>"
                    .to_string(),
            ),
            (
                "en".to_string(),
                "<p>Hi {name},</p><p>Thank you for registering for <b>{event_title}</b> ({event_date}). \
                 The organizer is reviewing your registration. Your ticket will be sent once it is approved.</p>"
                    .to_string(),
            ),
        ]);
        templates.insert(REGISTRATION_RECEIVED.to_string(), MessageTemplate {
            key: REGISTRATION_RECEIVED.to_string(),
            subject,
            body,
        });

        let subject = HashMap::from([
            ("id".to_string(), "Tiket Anda untuk {event_title}: {ticket_number}".to_string()),
            ("en".to_string(), "Your ticket for {event_title}: {ticket_number}".to_string()),
        ]);
        let body = HashMap::from([
            (
                "id".to_string(),
                "<p>Halo {name},</p><p>Pendaftaran Anda untuk <b>{event_title}</b> ({event_date}) telah disetujui.</p>\
                 <p>Nomor tiket: <b>{ticket_number}</b></p><p><a href=\"{ticket_url}\">Lihat tiket</a></p>"
                    .to_string(),
            ),
            (
                "en".to_string(),
                "<p>Hi {name},</p><p>Your registration for <b>{event_title}</b> ({event_date}) has been approved.</p>\
                 <p>Ticket number: <b>{ticket_number}</b></p><p><a href=\"{ticket_url}\">View ticket</a></p>"
                    .to_string(),
            ),
        ]);
        templates.insert(REGISTRATION_APPROVED.to_string(), MessageTemplate {
            key: REGISTRATION_APPROVED.to_string(),
            subject,
            body,
        });

        templates
    }
}

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("valid regex"));

/// Replace `{key}` placeholders in one pass, so substituted values are never
/// expanded again. Values are HTML-escaped for bodies; unknown keys stay.
fn format_template(template: &str, parameters: &HashMap<String, String>, escape: bool) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match parameters.get(&caps[1]) {
            Some(value) if escape => escape_html(value),
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Handle used by the workflow to queue notifications
#[derive(Debug, Clone)]
pub struct NotificationService {
    sender: mpsc::UnboundedSender<Notification>,
    stats: Arc<Mutex<NotificationStats>>,
}

impl NotificationService {
    /// Spawn the delivery worker. It stops once every handle is dropped and
    /// the queue is drained.
    pub fn start(mailer: Arc<dyn Mailer>, renderer: TemplateRenderer) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let stats = Arc::new(Mutex::new(NotificationStats::default()));

        let worker = NotificationWorker {
            receiver,
            mailer,
            renderer,
            stats: stats.clone(),
        };
        let handle = tokio::spawn(worker.run());

        (Self { sender, stats }, handle)
    }

    /// Queue a notification; never fails the caller
    pub fn dispatch(&self, notification: Notification) {
        let template = notification.template_key();
        if self.sender.send(notification).is_err() {
            warn!(template = template, "Notification worker stopped, message dropped");
        }
    }

    /// Whether the delivery worker is still accepting messages
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }

    pub fn get_stats(&self) -> NotificationStats {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

struct NotificationWorker {
    receiver: mpsc::UnboundedReceiver<Notification>,
    mailer: Arc<dyn Mailer>,
    renderer: TemplateRenderer,
    stats: Arc<Mutex<NotificationStats>>,
}

impl NotificationWorker {
    async fn run(mut self) {
        info!("Notification worker started");
        while let Some(notification) = self.receiver.recv().await {
            self.deliver(notification).await;
        }
        info!("Notification worker stopped");
    }

    async fn deliver(&self, notification: Notification) {
        let template = notification.template_key();
        let result = match self.renderer.render(&notification) {
            Ok(message) => self.mailer.send(&message).await,
            Err(e) => Err(e),
        };

        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        match result {
            Ok(()) => {
                stats.total_sent += 1;
                *stats.sent_by_template.entry(template.to_string()).or_insert(0) += 1;
                debug!(template = template, to = %notification.recipient(), "Notification sent");
            }
            Err(e) => {
                stats.total_failed += 1;
                log_notification_failure(template, notification.recipient(), &e.to_string());
            }
        }
    }
}
