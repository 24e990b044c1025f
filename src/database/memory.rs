//! In-memory persistence gateway
//!
//! Implements every repository trait over plain vectors so the workflow can
//! run without PostgreSQL. It mirrors the storage rules the migrations
//! enforce: unique (event_id, email), unique ticket numbers, one ticket, proof
//! and RSVP per registration, and the owner/admin scope on status updates.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::database::repositories::{
    EventRepository, OrganizationRepository, PaymentProofRepository, ProfileRepository, RegistrationRepository,
    RsvpRepository, TicketRepository,
};
use crate::models::event::{Event, EventType, Organization, OrganizationRole};
use crate::models::registration::{EventPaymentProof, EventRegistration, NewRegistration, Participant, RegistrationStatus};
use crate::models::rsvp::{EventRsvp, RsvpStatus};
use crate::models::ticket::EventTicket;
use crate::models::user::{merge_missing, Profile, ProfileBackfill};
use crate::services::ticket::parse_sequence;
use crate::utils::errors::{OfficialIdError, Result};

#[derive(Debug, Default)]
struct Tables {
    organizations: Vec<Organization>,
    members: Vec<(Uuid, Uuid, OrganizationRole)>,
    events: Vec<Event>,
    registrations: Vec<EventRegistration>,
    payment_proofs: Vec<EventPaymentProof>,
    tickets: Vec<EventTicket>,
    rsvps: Vec<EventRsvp>,
    profiles: Vec<Profile>,
    fail_ticket_inserts: bool,
    fail_payment_proofs: bool,
}

#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    tables: Mutex<Tables>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_organization(&self, name: &str) -> Organization {
        let organization = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.tables().organizations.push(organization.clone());
        organization
    }

    pub fn add_member(&self, organization_id: Uuid, user_id: Uuid, role: OrganizationRole) {
        let mut tables = self.tables();
        tables.members.retain(|(org, user, _)| !(*org == organization_id && *user == user_id));
        tables.members.push((organization_id, user_id, role));
    }

    pub fn add_event(
        &self,
        organization_id: Uuid,
        title: &str,
        date: NaiveDate,
        max_participants: Option<i32>,
    ) -> Event {
        let event = Event {
            id: Uuid::new_v4(),
            organization_id,
            title: title.to_string(),
            date,
            time: None,
            event_type: EventType::Offline,
            location: Some("Jakarta".to_string()),
            zoom_link: None,
            max_participants,
            created_at: Utc::now(),
        };
        self.tables().events.push(event.clone());
        event
    }

    pub fn add_profile(&self, email: &str, phone: Option<&str>, company: Option<&str>) -> Profile {
        let profile = Profile {
            id: Uuid::new_v4(),
            email: email.to_string(),
            full_name: None,
            phone: phone.map(str::to_string),
            company: company.map(str::to_string),
            updated_at: Utc::now(),
        };
        self.tables().profiles.push(profile.clone());
        profile
    }

    /// Issue a ticket directly, bypassing the workflow
    pub fn add_ticket(&self, registration_id: Uuid, ticket_number: &str) -> EventTicket {
        let ticket = EventTicket {
            id: Uuid::new_v4(),
            registration_id,
            ticket_number: ticket_number.to_string(),
            created_at: Utc::now(),
        };
        self.tables().tickets.push(ticket.clone());
        ticket
    }

    pub fn set_registration_status(&self, registration_id: Uuid, status: RegistrationStatus) {
        if let Some(registration) = self.tables().registrations.iter_mut().find(|r| r.id == registration_id) {
            registration.status = status;
        }
    }

    pub fn fail_ticket_inserts(&self, fail: bool) {
        self.tables().fail_ticket_inserts = fail;
    }

    pub fn fail_payment_proofs(&self, fail: bool) {
        self.tables().fail_payment_proofs = fail;
    }

    pub fn registration(&self, id: Uuid) -> Option<EventRegistration> {
        self.tables().registrations.iter().find(|r| r.id == id).cloned()
    }

    pub fn tickets(&self) -> Vec<EventTicket> {
        self.tables().tickets.clone()
    }

    pub fn payment_proofs(&self) -> Vec<EventPaymentProof> {
        self.tables().payment_proofs.clone()
    }

    pub fn rsvps(&self) -> Vec<EventRsvp> {
        self.tables().rsvps.clone()
    }

    pub fn profile(&self, email: &str) -> Option<Profile> {
        self.tables().profiles.iter().find(|p| p.email.eq_ignore_ascii_case(email)).cloned()
    }
}

fn unavailable(what: &str) -> OfficialIdError {
    OfficialIdError::Database(sqlx::Error::Protocol(format!("{what} unavailable")))
}

#[async_trait]
impl EventRepository for InMemoryDatabase {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.tables().events.iter().find(|e| e.id == id).cloned())
    }
}

#[async_trait]
impl OrganizationRepository for InMemoryDatabase {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Organization>> {
        Ok(self.tables().organizations.iter().find(|o| o.id == id).cloned())
    }

    async fn member_role(&self, organization_id: Uuid, user_id: Uuid) -> Result<Option<OrganizationRole>> {
        Ok(self
            .tables()
            .members
            .iter()
            .find(|(org, user, _)| *org == organization_id && *user == user_id)
            .map(|(_, _, role)| *role))
    }
}

#[async_trait]
impl RegistrationRepository for InMemoryDatabase {
    async fn create(&self, registration: NewRegistration) -> Result<EventRegistration> {
        let mut tables = self.tables();
        let duplicate = tables
            .registrations
            .iter()
            .any(|r| r.event_id == registration.event_id && r.email == registration.email);
        if duplicate {
            return Err(OfficialIdError::DuplicateRegistration {
                event_id: registration.event_id,
                email: registration.email,
            });
        }

        let created = EventRegistration {
            id: Uuid::new_v4(),
            event_id: registration.event_id,
            name: registration.name,
            email: registration.email,
            phone: registration.phone,
            institution: registration.institution,
            status: RegistrationStatus::Pending,
            registered_at: Utc::now(),
        };
        tables.registrations.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventRegistration>> {
        Ok(self.registration(id))
    }

    async fn find_by_event_and_email(&self, event_id: Uuid, email: &str) -> Result<Option<EventRegistration>> {
        Ok(self
            .tables()
            .registrations
            .iter()
            .find(|r| r.event_id == event_id && r.email == email)
            .cloned())
    }

    async fn find_pending_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        Ok(self
            .tables()
            .registrations
            .iter()
            .filter(|r| r.status == RegistrationStatus::Pending && ids.contains(&r.id))
            .map(|r| r.id)
            .collect())
    }

    async fn count_active_for_event(&self, event_id: Uuid) -> Result<i64> {
        let count = self
            .tables()
            .registrations
            .iter()
            .filter(|r| r.event_id == event_id && r.status != RegistrationStatus::Cancelled)
            .count();
        Ok(count as i64)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: RegistrationStatus,
        to: RegistrationStatus,
        actor: Uuid,
    ) -> Result<Option<EventRegistration>> {
        let mut tables = self.tables();
        let Tables { events, members, registrations, .. } = &mut *tables;

        let Some(registration) = registrations.iter_mut().find(|r| r.id == id && r.status == from) else {
            return Ok(None);
        };
        let Some(event) = events.iter().find(|e| e.id == registration.event_id) else {
            return Ok(None);
        };
        let allowed = members.iter().any(|(org, user, role)| {
            *org == event.organization_id && *user == actor && role.can_manage_registrations()
        });
        if !allowed {
            return Ok(None);
        }

        registration.status = to;
        Ok(Some(registration.clone()))
    }

    async fn list_participants(&self, event_id: Uuid) -> Result<Vec<Participant>> {
        let tables = self.tables();
        let mut registrations: Vec<&EventRegistration> =
            tables.registrations.iter().filter(|r| r.event_id == event_id).collect();
        registrations.sort_by_key(|r| r.registered_at);

        Ok(registrations
            .into_iter()
            .map(|registration| Participant {
                registration: registration.clone(),
                ticket_number: tables
                    .tickets
                    .iter()
                    .find(|t| t.registration_id == registration.id)
                    .map(|t| t.ticket_number.clone()),
                rsvp_status: tables
                    .rsvps
                    .iter()
                    .find(|v| v.registration_id == registration.id)
                    .map(|v| v.status),
            })
            .collect())
    }
}

#[async_trait]
impl TicketRepository for InMemoryDatabase {
    async fn count_for_event(&self, event_id: Uuid) -> Result<i64> {
        let tables = self.tables();
        let count = tables
            .tickets
            .iter()
            .filter(|t| {
                tables
                    .registrations
                    .iter()
                    .any(|r| r.id == t.registration_id && r.event_id == event_id)
            })
            .count();
        Ok(count as i64)
    }

    async fn create(&self, registration_id: Uuid, ticket_number: &str) -> Result<EventTicket> {
        let mut tables = self.tables();
        if tables.fail_ticket_inserts {
            return Err(unavailable("event_tickets"));
        }
        if tables.tickets.iter().any(|t| t.ticket_number == ticket_number) {
            return Err(OfficialIdError::TicketNumberTaken { ticket_number: ticket_number.to_string() });
        }
        if tables.tickets.iter().any(|t| t.registration_id == registration_id) {
            return Err(unavailable("event_tickets.registration_id"));
        }

        let ticket = EventTicket {
            id: Uuid::new_v4(),
            registration_id,
            ticket_number: ticket_number.to_string(),
            created_at: Utc::now(),
        };
        tables.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn find_by_number(&self, ticket_number: &str) -> Result<Option<EventTicket>> {
        Ok(self.tables().tickets.iter().find(|t| t.ticket_number == ticket_number).cloned())
    }

    async fn find_by_registration(&self, registration_id: Uuid) -> Result<Option<EventTicket>> {
        Ok(self
            .tables()
            .tickets
            .iter()
            .find(|t| t.registration_id == registration_id)
            .cloned())
    }

    async fn max_sequence(&self, code: &str, date_code: &str) -> Result<Option<u32>> {
        Ok(self
            .tables()
            .tickets
            .iter()
            .filter_map(|t| parse_sequence(&t.ticket_number, code, date_code))
            .max())
    }
}

#[async_trait]
impl PaymentProofRepository for InMemoryDatabase {
    async fn create(&self, registration_id: Uuid, image_url: &str) -> Result<EventPaymentProof> {
        let mut tables = self.tables();
        if tables.fail_payment_proofs {
            return Err(unavailable("event_payment_proofs"));
        }

        let proof = EventPaymentProof {
            id: Uuid::new_v4(),
            registration_id,
            image_url: image_url.to_string(),
            created_at: Utc::now(),
        };
        tables.payment_proofs.push(proof.clone());
        Ok(proof)
    }
}

#[async_trait]
impl RsvpRepository for InMemoryDatabase {
    async fn upsert(&self, registration_id: Uuid, status: RsvpStatus) -> Result<EventRsvp> {
        let mut tables = self.tables();
        let now = Utc::now();

        if let Some(existing) = tables.rsvps.iter_mut().find(|v| v.registration_id == registration_id) {
            existing.status = status;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let rsvp = EventRsvp {
            id: Uuid::new_v4(),
            registration_id,
            status,
            created_at: now,
            updated_at: now,
        };
        tables.rsvps.push(rsvp.clone());
        Ok(rsvp)
    }

    async fn find_by_registration(&self, registration_id: Uuid) -> Result<Option<EventRsvp>> {
        Ok(self
            .tables()
            .rsvps
            .iter()
            .find(|v| v.registration_id == registration_id)
            .cloned())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryDatabase {
    async fn backfill_contact(&self, email: &str, backfill: &ProfileBackfill) -> Result<bool> {
        let mut tables = self.tables();
        let Some(profile) = tables.profiles.iter_mut().find(|p| p.email.eq_ignore_ascii_case(email)) else {
            return Ok(false);
        };

        let phone = merge_missing(profile.phone.as_deref(), backfill.phone.as_deref());
        let company = merge_missing(profile.company.as_deref(), backfill.company.as_deref());
        if phone == profile.phone && company == profile.company {
            return Ok(false);
        }

        profile.phone = phone;
        profile.company = company;
        profile.updated_at = Utc::now();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn new_registration(event_id: Uuid, email: &str) -> NewRegistration {
        NewRegistration {
            event_id,
            name: "Budi".to_string(),
            email: email.to_string(),
            phone: None,
            institution: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let db = InMemoryDatabase::new();
        let org = db.add_organization("Circle");
        let event = db.add_event(org.id, "Tech Summit", date(), None);

        RegistrationRepository::create(&db, new_registration(event.id, "a@x.id")).await.unwrap();
        let err = RegistrationRepository::create(&db, new_registration(event.id, "a@x.id")).await.unwrap_err();
        assert!(matches!(err, OfficialIdError::DuplicateRegistration { .. }));
    }

    #[tokio::test]
    async fn test_transition_requires_manager_role() {
        let db = InMemoryDatabase::new();
        let org = db.add_organization("Circle");
        let event = db.add_event(org.id, "Tech Summit", date(), None);
        let admin = Uuid::new_v4();
        let member = Uuid::new_v4();
        db.add_member(org.id, admin, OrganizationRole::Admin);
        db.add_member(org.id, member, OrganizationRole::Member);

        let registration = RegistrationRepository::create(&db, new_registration(event.id, "a@x.id")).await.unwrap();

        let denied = db
            .transition_status(registration.id, RegistrationStatus::Pending, RegistrationStatus::Confirmed, member)
            .await
            .unwrap();
        assert!(denied.is_none());

        let confirmed = db
            .transition_status(registration.id, RegistrationStatus::Pending, RegistrationStatus::Confirmed, admin)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(confirmed.status, RegistrationStatus::Confirmed);

        let again = db
            .transition_status(registration.id, RegistrationStatus::Pending, RegistrationStatus::Confirmed, admin)
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_ticket_number_unique() {
        let db = InMemoryDatabase::new();
        db.add_ticket(Uuid::new_v4(), "TEC00011425");

        let err = TicketRepository::create(&db, Uuid::new_v4(), "TEC00011425").await.unwrap_err();
        assert!(matches!(err, OfficialIdError::TicketNumberTaken { .. }));
    }

    #[tokio::test]
    async fn test_backfill_only_fills_empty_fields() {
        let db = InMemoryDatabase::new();
        db.add_profile("a@x.id", Some("08123456789"), None);

        let backfill = ProfileBackfill {
            phone: Some("08999999999".to_string()),
            company: Some("Acme".to_string()),
        };
        assert!(db.backfill_contact("A@x.id", &backfill).await.unwrap());

        let profile = db.profile("a@x.id").unwrap();
        assert_eq!(profile.phone.as_deref(), Some("08123456789"));
        assert_eq!(profile.company.as_deref(), Some("Acme"));

        assert!(!db.backfill_contact("a@x.id", &backfill).await.unwrap());
        assert!(!db.backfill_contact("nobody@x.id", &backfill).await.unwrap());
    }
}
