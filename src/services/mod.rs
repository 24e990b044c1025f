//! Services module
//!
//! This module contains business logic services

pub mod auth;
pub mod mailer;
pub mod notification;
pub mod registration;
pub mod ticket;

// Re-export commonly used services
pub use auth::{AuthContext, AuthService, Claims};
pub use mailer::{EmailMessage, HttpMailer, LogMailer, Mailer};
pub use notification::{MessageTemplate, Notification, NotificationService, NotificationStats, TemplateRenderer};
pub use registration::{BatchItemError, BatchItemResult, BatchSummary, RegistrationService};
pub use ticket::generate_ticket_number;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::config::settings::Settings;
use crate::database::DatabaseService;
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Debug, Clone)]
pub struct ServiceFactory {
    pub registration_service: RegistrationService,
    pub auth_service: AuthService,
    pub notification_service: NotificationService,
}

impl ServiceFactory {
    /// Create all services and start the notification worker
    pub fn new(settings: &Settings, db: DatabaseService, mailer: Arc<dyn Mailer>) -> Result<(Self, JoinHandle<()>)> {
        let renderer = TemplateRenderer::new(&settings.i18n.default_language);
        let (notification_service, worker) = NotificationService::start(mailer, renderer);

        let registration_service = RegistrationService::new(
            db,
            notification_service.clone(),
            &settings.site.base_url,
            &settings.i18n.default_language,
            settings.workflow.clone(),
        )?;
        let auth_service = AuthService::new(&settings.auth);

        Ok((
            Self {
                registration_service,
                auth_service,
                notification_service,
            },
            worker,
        ))
    }

    /// Pick the e-mail transport for the configuration
    pub fn mailer_for(settings: &Settings) -> Result<Arc<dyn Mailer>> {
        if settings.email.enabled {
            info!(api_url = %settings.email.api_url, "E-mail delivery enabled");
            Ok(Arc::new(HttpMailer::new(&settings.email)?))
        } else {
            info!("E-mail delivery disabled, messages will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }

    /// Health check for all services
    pub async fn health_check(&self, db: &DatabaseService) -> ServiceHealthStatus {
        ServiceHealthStatus {
            database_healthy: db.health_check().await.is_ok(),
            notification_worker_running: self.notification_service.is_running(),
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHealthStatus {
    pub database_healthy: bool,
    pub notification_worker_running: bool,
}

impl ServiceHealthStatus {
    /// Check if all critical services are healthy
    pub fn is_healthy(&self) -> bool {
        self.database_healthy && self.notification_worker_running
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.database_healthy {
            issues.push("Database connection failed".to_string());
        }
        if !self.notification_worker_running {
            issues.push("Notification worker stopped".to_string());
        }

        issues
    }
}
