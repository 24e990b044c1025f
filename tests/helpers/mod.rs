//! Test helpers module
//!
//! Shared fixtures for the integration tests: an in-memory database seeded
//! with one organization, a recording mailer and a fully wired [`AppState`].

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use official_id::config::Settings;
use official_id::database::{DatabaseService, InMemoryDatabase};
use official_id::i18n::I18n;
use official_id::middleware::RateLimiter;
use official_id::models::{Event, Organization, OrganizationRole};
use official_id::services::{EmailMessage, Mailer, ServiceFactory};
use official_id::state::AppState;
use official_id::{OfficialIdError, Result};

pub const JWT_SECRET: &str = "integration-test-secret";

/// Mailer that keeps every message instead of sending it
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: Mutex<bool>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_sends(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        if *self.fail.lock().unwrap() {
            return Err(OfficialIdError::Email("provider unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.auth.jwt_secret = JWT_SECRET.to_string();
    settings.site.base_url = "https://official.id".to_string();
    settings
}

/// Unified test context that manages all test components
pub struct TestContext {
    pub db: Arc<InMemoryDatabase>,
    pub mailer: Arc<RecordingMailer>,
    pub state: AppState,
    pub organization: Organization,
    pub owner_id: Uuid,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self::build(settings, RateLimiter::in_memory())
    }

    /// Context whose limiter lets everything through
    pub fn unlimited() -> Self {
        Self::build(test_settings(), RateLimiter::disabled())
    }

    fn build(settings: Settings, rate_limiter: RateLimiter) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let db = Arc::new(InMemoryDatabase::new());
        let organization = db.add_organization("Circle Tech Jakarta");
        let owner_id = Uuid::new_v4();
        db.add_member(organization.id, owner_id, OrganizationRole::Owner);

        let mailer = Arc::new(RecordingMailer::default());
        let database = DatabaseService::in_memory(db.clone());
        let (services, _worker) =
            ServiceFactory::new(&settings, database.clone(), mailer.clone()).expect("services should build");
        let i18n = I18n::with_embedded(&settings.i18n).expect("catalogs should load");

        let state = AppState::new(settings, database, services, rate_limiter, i18n);

        Self {
            db,
            mailer,
            state,
            organization,
            owner_id,
        }
    }

    /// Event of the seeded organization on 14 March 2025
    pub fn add_event(&self, title: &str, max_participants: Option<i32>) -> Event {
        self.db.add_event(self.organization.id, title, date(2025, 3, 14), max_participants)
    }

    /// A user with `role` in the seeded organization
    pub fn add_member(&self, role: OrganizationRole) -> Uuid {
        let user_id = Uuid::new_v4();
        self.db.add_member(self.organization.id, user_id, role);
        user_id
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        self.state
            .auth()
            .issue(user_id, Some("operator@circle.id"), chrono::Duration::minutes(10))
            .expect("token should sign")
    }

    /// Wait until the notification worker has handled `count` messages
    pub async fn wait_for_notifications(&self, count: u64) {
        for _ in 0..200 {
            let stats = self.state.notifications().get_stats();
            if stats.total_sent + stats.total_failed >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("notification worker did not handle {count} messages");
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}
