//! Event registration workflow
//!
//! `pending -> confirmed` through batch approval (which issues the ticket),
//! `pending -> cancelled` through batch cancellation, and attendance RSVPs for
//! confirmed registrations. Every operation re-reads current state from the
//! repositories; nothing is cached between calls.
//!
//! The capacity check in [`RegistrationService::register`] is not atomic with
//! the insert, so concurrent registrations can overshoot `max_participants`
//! slightly. Duplicate e-mails and ticket numbers are backed by storage
//! uniqueness instead.

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::WorkflowConfig;
use crate::database::DatabaseService;
use crate::models::event::Event;
use crate::models::registration::{EventRegistration, NewRegistration, Participant, RegistrationStatus};
use crate::models::rsvp::EventRsvp;
use crate::models::ticket::{EventTicket, TicketDetails};
use crate::models::user::ProfileBackfill;
use crate::services::notification::{Notification, NotificationService};
use crate::services::ticket::{date_code, generate_ticket_number, title_code};
use crate::utils::errors::{OfficialIdError, Result};
use crate::utils::logging::{
    log_batch_outcome, log_data_integrity, log_registration_action, log_transition_rejected,
};
use crate::utils::validation::{FieldViolation, ValidRegistration, ValidRsvp, ValidationErrors};

/// Why one item of a batch was not processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchItemError {
    InvalidId,
    RegistrationNotFound,
    NotPending,
    EventNotFound,
    OrganizationNotFound,
    NotPermitted,
    TicketFailed,
    StorageFailed,
}

impl BatchItemError {
    /// Machine-readable code
    pub fn code(&self) -> &'static str {
        self.message_key().trim_start_matches("batch.")
    }

    /// i18n key of the user-facing message
    pub fn message_key(&self) -> &'static str {
        match self {
            BatchItemError::InvalidId => "batch.invalid_id",
            BatchItemError::RegistrationNotFound => "batch.registration_not_found",
            BatchItemError::NotPending => "batch.not_pending",
            BatchItemError::EventNotFound => "batch.event_not_found",
            BatchItemError::OrganizationNotFound => "batch.organization_not_found",
            BatchItemError::NotPermitted => "batch.not_permitted",
            BatchItemError::TicketFailed => "batch.ticket_failed",
            BatchItemError::StorageFailed => "batch.storage_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItemResult {
    pub registration_id: String,
    pub ticket_number: Option<String>,
    pub error: Option<BatchItemError>,
}

impl BatchItemResult {
    fn ok(registration_id: &str, ticket_number: Option<String>) -> Self {
        Self { registration_id: registration_id.to_string(), ticket_number, error: None }
    }

    fn failed(registration_id: &str, error: BatchItemError) -> Self {
        Self { registration_id: registration_id.to_string(), ticket_number: None, error: Some(error) }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of an approve or cancel batch, in request order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
}

impl BatchSummary {
    fn from_results(results: Vec<BatchItemResult>) -> Self {
        let processed = results.iter().filter(|r| r.is_success()).count();
        Self { processed, failed: results.len() - processed, results }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchOperation {
    Approve,
    Cancel,
}

impl BatchOperation {
    fn name(&self) -> &'static str {
        match self {
            BatchOperation::Approve => "approve",
            BatchOperation::Cancel => "cancel",
        }
    }

    fn target(&self) -> RegistrationStatus {
        match self {
            BatchOperation::Approve => RegistrationStatus::Confirmed,
            BatchOperation::Cancel => RegistrationStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegistrationService {
    db: DatabaseService,
    notifications: NotificationService,
    site_base_url: Url,
    default_language: String,
    workflow: WorkflowConfig,
}

impl RegistrationService {
    pub fn new(
        db: DatabaseService,
        notifications: NotificationService,
        site_base_url: &str,
        default_language: &str,
        workflow: WorkflowConfig,
    ) -> Result<Self> {
        let mut site_base_url = Url::parse(site_base_url)?;
        if !site_base_url.path().ends_with('/') {
            let path = format!("{}/", site_base_url.path());
            site_base_url.set_path(&path);
        }

        Ok(Self {
            db,
            notifications,
            site_base_url,
            default_language: default_language.to_string(),
            workflow,
        })
    }

    /// Public link to a ticket
    pub fn ticket_url(&self, ticket_number: &str) -> Result<Url> {
        Ok(self.site_base_url.join(&format!("events/ticket/{ticket_number}"))?)
    }

    /// Create a `pending` registration for a public submission
    pub async fn register(&self, input: ValidRegistration, language: &str) -> Result<EventRegistration> {
        let event = self
            .db
            .events
            .find_by_id(input.event_id)
            .await?
            .ok_or(OfficialIdError::EventNotFound { event_id: input.event_id })?;

        if self
            .db
            .registrations
            .find_by_event_and_email(event.id, &input.email)
            .await?
            .is_some()
        {
            return Err(OfficialIdError::DuplicateRegistration { event_id: event.id, email: input.email });
        }

        if let Some(max_participants) = event.max_participants {
            let active = self.db.registrations.count_active_for_event(event.id).await?;
            if !event.has_capacity_for(active) {
                return Err(OfficialIdError::EventFull { event_id: event.id, max_participants });
            }
        }

        let registration = self
            .db
            .registrations
            .create(NewRegistration {
                event_id: event.id,
                name: input.name,
                email: input.email,
                phone: input.phone.clone(),
                institution: input.institution.clone(),
            })
            .await?;

        log_registration_action(registration.id, "registered", None, Some(&event.title));

        if let Some(url) = input.payment_proof_url.as_deref() {
            if let Err(e) = self.db.payment_proofs.create(registration.id, url).await {
                warn!(registration_id = %registration.id, error = %e, "Failed to save payment proof");
            }
        }

        self.notifications.dispatch(Notification::RegistrationReceived {
            to: registration.email.clone(),
            name: registration.name.clone(),
            event_title: event.title.clone(),
            event_date: event.date,
            language: language.to_string(),
        });

        let backfill = ProfileBackfill { phone: input.phone, company: input.institution };
        if !backfill.is_empty() {
            match self.db.profiles.backfill_contact(&registration.email, &backfill).await {
                Ok(true) => debug!(registration_id = %registration.id, "Profile contact details backfilled"),
                Ok(false) => {}
                Err(e) => warn!(registration_id = %registration.id, error = %e, "Profile backfill failed"),
            }
        }

        Ok(registration)
    }

    /// Confirm pending registrations and issue their tickets
    pub async fn approve(&self, registration_ids: &[String], actor: Uuid) -> Result<BatchSummary> {
        self.run_batch(registration_ids, actor, BatchOperation::Approve).await
    }

    /// Cancel pending registrations
    pub async fn cancel(&self, registration_ids: &[String], actor: Uuid) -> Result<BatchSummary> {
        self.run_batch(registration_ids, actor, BatchOperation::Cancel).await
    }

    async fn run_batch(&self, registration_ids: &[String], actor: Uuid, operation: BatchOperation) -> Result<BatchSummary> {
        if registration_ids.is_empty() {
            return Err(ValidationErrors::single("registration_ids", FieldViolation::new("validation.empty_list")).into());
        }

        let parsed: Vec<Uuid> = registration_ids.iter().filter_map(|id| Uuid::parse_str(id).ok()).collect();
        if parsed.is_empty() || self.db.registrations.find_pending_ids(&parsed).await?.is_empty() {
            return Err(OfficialIdError::NoPendingRegistrations);
        }

        let concurrency = self.workflow.approval_concurrency.max(1);
        let results: Vec<BatchItemResult> = stream::iter(registration_ids.to_vec())
            .map(|id| async move { self.process_item(&id, actor, operation).await })
            .buffered(concurrency)
            .collect()
            .await;

        let summary = BatchSummary::from_results(results);
        log_batch_outcome(operation.name(), actor, summary.processed, summary.failed);
        Ok(summary)
    }

    async fn process_item(&self, raw_id: &str, actor: Uuid, operation: BatchOperation) -> BatchItemResult {
        let Ok(registration_id) = Uuid::parse_str(raw_id) else {
            return BatchItemResult::failed(raw_id, BatchItemError::InvalidId);
        };

        match self.transition(registration_id, actor, operation).await {
            Ok(ticket_number) => BatchItemResult::ok(raw_id, ticket_number),
            Err(error) => BatchItemResult::failed(raw_id, error),
        }
    }

    async fn transition(
        &self,
        registration_id: Uuid,
        actor: Uuid,
        operation: BatchOperation,
    ) -> std::result::Result<Option<String>, BatchItemError> {
        let registration = self
            .db
            .registrations
            .find_by_id(registration_id)
            .await
            .map_err(|e| storage_failed(registration_id, e))?
            .ok_or(BatchItemError::RegistrationNotFound)?;

        if registration.status != RegistrationStatus::Pending {
            return Err(BatchItemError::NotPending);
        }

        let event = self
            .db
            .events
            .find_by_id(registration.event_id)
            .await
            .map_err(|e| storage_failed(registration_id, e))?
            .ok_or(BatchItemError::EventNotFound)?;

        self.db
            .organizations
            .find_by_id(event.organization_id)
            .await
            .map_err(|e| storage_failed(registration_id, e))?
            .ok_or(BatchItemError::OrganizationNotFound)?;

        let updated = self
            .db
            .registrations
            .transition_status(registration_id, RegistrationStatus::Pending, operation.target(), actor)
            .await
            .map_err(|e| storage_failed(registration_id, e))?;

        let Some(updated) = updated else {
            log_transition_rejected(registration_id, actor, operation.name());
            return Err(BatchItemError::NotPermitted);
        };

        if operation == BatchOperation::Cancel {
            log_registration_action(registration_id, "cancelled", Some(actor), None);
            return Ok(None);
        }

        let ticket = match self.issue_ticket(&event, registration_id).await {
            Ok(ticket) => ticket,
            Err(e) => {
                log_data_integrity(registration_id, "ticket_insert", &e.to_string());
                self.revert_confirmation(registration_id, actor).await;
                return Err(BatchItemError::TicketFailed);
            }
        };

        log_registration_action(registration_id, "approved", Some(actor), Some(&ticket.ticket_number));

        match self.ticket_url(&ticket.ticket_number) {
            Ok(ticket_url) => self.notifications.dispatch(Notification::RegistrationApproved {
                to: updated.email,
                name: updated.name,
                event_title: event.title.clone(),
                event_date: event.date,
                ticket_number: ticket.ticket_number.clone(),
                ticket_url: ticket_url.to_string(),
                language: self.default_language.clone(),
            }),
            Err(e) => warn!(registration_id = %registration_id, error = %e, "Could not build ticket link, e-mail skipped"),
        }

        Ok(Some(ticket.ticket_number))
    }

    /// Next sequence for the event. On a number clash (another event with the
    /// same code and date, or a concurrent approval) the sequence jumps past
    /// the highest number stored for that pattern.
    async fn issue_ticket(&self, event: &Event, registration_id: Uuid) -> Result<EventTicket> {
        if let Some(existing) = self.db.tickets.find_by_registration(registration_id).await? {
            debug!(registration_id = %registration_id, ticket_number = %existing.ticket_number, "Ticket already issued");
            return Ok(existing);
        }

        let issued = self.db.tickets.count_for_event(event.id).await?;
        let mut seq = u32::try_from(issued + 1).unwrap_or(u32::MAX);
        let attempts = self.workflow.ticket_insert_attempts.max(1);
        let code = title_code(&event.title);
        let suffix = date_code(event.date);

        for attempt in 1..=attempts {
            let ticket_number = generate_ticket_number(&event.title, seq, event.date);
            match self.db.tickets.create(registration_id, &ticket_number).await {
                Ok(ticket) => return Ok(ticket),
                Err(OfficialIdError::TicketNumberTaken { .. }) if attempt < attempts => {
                    let highest = self.db.tickets.max_sequence(&code, &suffix).await?.unwrap_or(0);
                    debug!(ticket_number = %ticket_number, attempt, highest, "Ticket number taken, retrying");
                    seq = seq.max(highest).saturating_add(1);
                }
                Err(e) => return Err(e),
            }
        }

        Err(OfficialIdError::TicketNumberTaken { ticket_number: generate_ticket_number(&event.title, seq, event.date) })
    }

    /// Put a confirmed-but-unticketed registration back to `pending`
    async fn revert_confirmation(&self, registration_id: Uuid, actor: Uuid) {
        match self
            .db
            .registrations
            .transition_status(registration_id, RegistrationStatus::Confirmed, RegistrationStatus::Pending, actor)
            .await
        {
            Ok(Some(_)) => info!(registration_id = %registration_id, "Confirmation reverted to pending"),
            Ok(None) => log_data_integrity(registration_id, "revert", "registration no longer confirmed"),
            Err(e) => log_data_integrity(registration_id, "revert", &e.to_string()),
        }
    }

    /// Record attendance for a confirmed ticket holder
    pub async fn rsvp(&self, input: ValidRsvp) -> Result<EventRsvp> {
        let ticket = self
            .db
            .tickets
            .find_by_number(&input.ticket_number)
            .await?
            .ok_or_else(|| OfficialIdError::TicketNotFound { ticket_number: input.ticket_number.clone() })?;

        let registration = self
            .db
            .registrations
            .find_by_id(ticket.registration_id)
            .await?
            .ok_or(OfficialIdError::RegistrationNotFound { registration_id: ticket.registration_id })?;

        if registration.status != RegistrationStatus::Confirmed {
            return Err(OfficialIdError::RegistrationNotConfirmed { registration_id: registration.id });
        }

        let rsvp = self.db.rsvps.upsert(registration.id, input.status).await?;
        log_registration_action(registration.id, "rsvp", None, Some(input.status.as_str()));
        Ok(rsvp)
    }

    /// Registrations of an event with ticket and attendance, for its organizers
    pub async fn list_participants(
        &self,
        event_id: Uuid,
        actor: Uuid,
        registered_on: Option<NaiveDate>,
    ) -> Result<Vec<Participant>> {
        let event = self
            .db
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(OfficialIdError::EventNotFound { event_id })?;

        let role = self.db.organizations.member_role(event.organization_id, actor).await?;
        if !role.is_some_and(|role| role.can_manage_registrations()) {
            return Err(OfficialIdError::PermissionDenied(format!(
                "user {actor} cannot manage registrations of event {event_id}"
            )));
        }

        let mut participants = self.db.registrations.list_participants(event_id).await?;
        if let Some(day) = registered_on {
            participants.retain(|p| p.registration.registered_at.date_naive() == day);
        }
        Ok(participants)
    }

    /// Public view of a ticket
    pub async fn ticket_details(&self, ticket_number: &str) -> Result<TicketDetails> {
        let ticket_number = ticket_number.trim().to_uppercase();
        let not_found = || OfficialIdError::TicketNotFound { ticket_number: ticket_number.clone() };

        let ticket = self.db.tickets.find_by_number(&ticket_number).await?.ok_or_else(not_found)?;
        let registration = self
            .db
            .registrations
            .find_by_id(ticket.registration_id)
            .await?
            .ok_or_else(not_found)?;
        let event = self.db.events.find_by_id(registration.event_id).await?.ok_or_else(not_found)?;
        let rsvp = self.db.rsvps.find_by_registration(registration.id).await?;

        Ok(TicketDetails {
            ticket_number: ticket.ticket_number,
            event_title: event.title,
            event_date: event.date,
            event_time: event.time,
            event_type: event.event_type,
            location: event.location,
            participant_name: registration.name,
            registration_status: registration.status,
            rsvp_status: rsvp.map(|r| r.status),
        })
    }
}

fn storage_failed(registration_id: Uuid, error: OfficialIdError) -> BatchItemError {
    warn!(registration_id = %registration_id, error = %error, "Storage failure while processing batch item");
    BatchItemError::StorageFailed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let summary = BatchSummary::from_results(vec![
            BatchItemResult::ok("a", Some("TEC00011425".to_string())),
            BatchItemResult::failed("b", BatchItemError::NotPending),
            BatchItemResult::failed("c", BatchItemError::InvalidId),
        ]);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.results[1].error.map(|e| e.message_key()), Some("batch.not_pending"));
    }
}
