//! Event registration repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::registration::{EventRegistration, NewRegistration, Participant, RegistrationStatus};
use crate::models::rsvp::RsvpStatus;
use crate::utils::errors::{OfficialIdError, Result};

const REGISTRATION_COLUMNS: &str = "id, event_id, name, email, phone, institution, status, registered_at";

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    /// Insert a pending registration; a (event_id, email) clash is a
    /// `DuplicateRegistration`
    async fn create(&self, registration: NewRegistration) -> Result<EventRegistration>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventRegistration>>;

    async fn find_by_event_and_email(&self, event_id: Uuid, email: &str) -> Result<Option<EventRegistration>>;

    /// Subset of `ids` currently in `pending`
    async fn find_pending_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>>;

    /// Registrations that still hold a seat (not cancelled)
    async fn count_active_for_event(&self, event_id: Uuid) -> Result<i64>;

    /// Conditional `from -> to` update scoped to what `actor` may manage.
    /// `None` means no row matched: wrong state, unknown id, or not allowed.
    async fn transition_status(
        &self,
        id: Uuid,
        from: RegistrationStatus,
        to: RegistrationStatus,
        actor: Uuid,
    ) -> Result<Option<EventRegistration>>;

    async fn list_participants(&self, event_id: Uuid) -> Result<Vec<Participant>>;
}

#[derive(Debug, FromRow)]
struct RegistrationRow {
    id: Uuid,
    event_id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    institution: Option<String>,
    status: String,
    registered_at: DateTime<Utc>,
}

impl TryFrom<RegistrationRow> for EventRegistration {
    type Error = OfficialIdError;

    fn try_from(row: RegistrationRow) -> Result<Self> {
        Ok(EventRegistration {
            id: row.id,
            event_id: row.event_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            institution: row.institution,
            status: decode_status(&row.status)?,
            registered_at: row.registered_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ParticipantRow {
    id: Uuid,
    event_id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    institution: Option<String>,
    status: String,
    registered_at: DateTime<Utc>,
    ticket_number: Option<String>,
    rsvp_status: Option<String>,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = OfficialIdError;

    fn try_from(row: ParticipantRow) -> Result<Self> {
        let rsvp_status = row
            .rsvp_status
            .map(|s| s.parse::<RsvpStatus>())
            .transpose()
            .map_err(|e| OfficialIdError::Database(sqlx::Error::Decode(e.into())))?;

        Ok(Participant {
            registration: EventRegistration {
                id: row.id,
                event_id: row.event_id,
                name: row.name,
                email: row.email,
                phone: row.phone,
                institution: row.institution,
                status: decode_status(&row.status)?,
                registered_at: row.registered_at,
            },
            ticket_number: row.ticket_number,
            rsvp_status,
        })
    }
}

fn decode_status(raw: &str) -> Result<RegistrationStatus> {
    raw.parse::<RegistrationStatus>()
        .map_err(|e| OfficialIdError::Database(sqlx::Error::Decode(e.into())))
}

#[derive(Clone, Debug)]
pub struct PgRegistrationRepository {
    pool: PgPool,
}

impl PgRegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistrationRepository for PgRegistrationRepository {
    async fn create(&self, registration: NewRegistration) -> Result<EventRegistration> {
        let sql = format!(
            r#"
            INSERT INTO event_registrations (event_id, name, email, phone, institution, status, registered_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {REGISTRATION_COLUMNS}
            "#
        );

        let event_id = registration.event_id;
        let email = registration.email.clone();
        let result = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(registration.event_id)
            .bind(registration.name)
            .bind(registration.email)
            .bind(registration.phone)
            .bind(registration.institution)
            .bind(RegistrationStatus::Pending.as_str())
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => row.try_into(),
            Err(sqlx::Error::Database(db_error)) if db_error.is_unique_violation() => {
                Err(OfficialIdError::DuplicateRegistration { event_id, email })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventRegistration>> {
        let sql = format!("SELECT {REGISTRATION_COLUMNS} FROM event_registrations WHERE id = $1");
        let row = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(EventRegistration::try_from).transpose()
    }

    async fn find_by_event_and_email(&self, event_id: Uuid, email: &str) -> Result<Option<EventRegistration>> {
        let sql = format!("SELECT {REGISTRATION_COLUMNS} FROM event_registrations WHERE event_id = $1 AND email = $2");
        let row = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(event_id)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(EventRegistration::try_from).transpose()
    }

    async fn find_pending_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM event_registrations WHERE id = ANY($1) AND status = $2"
        )
        .bind(ids)
        .bind(RegistrationStatus::Pending.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn count_active_for_event(&self, event_id: Uuid) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM event_registrations WHERE event_id = $1 AND status <> $2"
        )
        .bind(event_id)
        .bind(RegistrationStatus::Cancelled.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: RegistrationStatus,
        to: RegistrationStatus,
        actor: Uuid,
    ) -> Result<Option<EventRegistration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(
            r#"
            UPDATE event_registrations r
            SET status = $3, updated_at = NOW()
            FROM events e
            WHERE r.id = $1
              AND r.status = $2
              AND e.id = r.event_id
              AND EXISTS (
                  SELECT 1 FROM organization_members m
                  WHERE m.organization_id = e.organization_id
                    AND m.user_id = $4
                    AND m.role IN ('owner', 'admin')
              )
            RETURNING r.id, r.event_id, r.name, r.email, r.phone, r.institution, r.status, r.registered_at
            "#
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(actor)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EventRegistration::try_from).transpose()
    }

    async fn list_participants(&self, event_id: Uuid) -> Result<Vec<Participant>> {
        let rows = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT r.id, r.event_id, r.name, r.email, r.phone, r.institution, r.status, r.registered_at,
                   t.ticket_number, v.status AS rsvp_status
            FROM event_registrations r
            LEFT JOIN event_tickets t ON t.registration_id = r.id
            LEFT JOIN event_rsvps v ON v.registration_id = r.id
            WHERE r.event_id = $1
            ORDER BY r.registered_at ASC
            "#
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Participant::try_from).collect()
    }
}
