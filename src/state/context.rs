//! Application-wide context handed to every request

use std::sync::Arc;

use crate::config::Settings;
use crate::database::DatabaseService;
use crate::i18n::I18n;
use crate::middleware::rate_limit::RateLimiter;
use crate::services::{AuthService, NotificationService, RegistrationService, ServiceFactory};

#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub database: DatabaseService,
    pub services: Arc<ServiceFactory>,
    pub rate_limiter: RateLimiter,
    pub i18n: Arc<I18n>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        database: DatabaseService,
        services: ServiceFactory,
        rate_limiter: RateLimiter,
        i18n: I18n,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            database,
            services: Arc::new(services),
            rate_limiter,
            i18n: Arc::new(i18n),
        }
    }

    pub fn registrations(&self) -> &RegistrationService {
        &self.services.registration_service
    }

    pub fn auth(&self) -> &AuthService {
        &self.services.auth_service
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.services.notification_service
    }
}
