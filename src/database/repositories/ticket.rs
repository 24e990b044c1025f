//! Ticket, payment proof and RSVP repositories
//!
//! These are the records hanging 1:1 off a registration.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::registration::EventPaymentProof;
use crate::models::rsvp::{EventRsvp, RsvpStatus};
use crate::models::ticket::EventTicket;
use crate::services::ticket::parse_sequence;
use crate::utils::errors::{OfficialIdError, Result};

#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Tickets already issued for an event (joined through registrations)
    async fn count_for_event(&self, event_id: Uuid) -> Result<i64>;

    /// Insert a ticket; a clash on the number is `TicketNumberTaken`
    async fn create(&self, registration_id: Uuid, ticket_number: &str) -> Result<EventTicket>;

    async fn find_by_number(&self, ticket_number: &str) -> Result<Option<EventTicket>>;

    async fn find_by_registration(&self, registration_id: Uuid) -> Result<Option<EventTicket>>;

    /// Highest sequence stored under `<code>NNNN<date_code>`, across all events
    async fn max_sequence(&self, code: &str, date_code: &str) -> Result<Option<u32>>;
}

#[async_trait]
pub trait PaymentProofRepository: Send + Sync {
    async fn create(&self, registration_id: Uuid, image_url: &str) -> Result<EventPaymentProof>;
}

#[async_trait]
pub trait RsvpRepository: Send + Sync {
    /// Insert or update the single attendance row of a registration
    async fn upsert(&self, registration_id: Uuid, status: RsvpStatus) -> Result<EventRsvp>;

    async fn find_by_registration(&self, registration_id: Uuid) -> Result<Option<EventRsvp>>;
}

#[derive(Clone, Debug)]
pub struct PgTicketRepository {
    pool: PgPool,
}

impl PgTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TicketRepository for PgTicketRepository {
    async fn count_for_event(&self, event_id: Uuid) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM event_tickets t
            INNER JOIN event_registrations r ON r.id = t.registration_id
            WHERE r.event_id = $1
            "#
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    async fn create(&self, registration_id: Uuid, ticket_number: &str) -> Result<EventTicket> {
        let result = sqlx::query_as::<_, (Uuid, Uuid, String, DateTime<Utc>)>(
            r#"
            INSERT INTO event_tickets (registration_id, ticket_number, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, registration_id, ticket_number, created_at
            "#
        )
        .bind(registration_id)
        .bind(ticket_number)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok((id, registration_id, ticket_number, created_at)) => Ok(EventTicket {
                id,
                registration_id,
                ticket_number,
                created_at,
            }),
            Err(sqlx::Error::Database(db_error))
                if db_error.is_unique_violation()
                    && db_error.constraint().is_some_and(|c| c.contains("ticket_number")) =>
            {
                Err(OfficialIdError::TicketNumberTaken { ticket_number: ticket_number.to_string() })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_number(&self, ticket_number: &str) -> Result<Option<EventTicket>> {
        let row: Option<(Uuid, Uuid, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, registration_id, ticket_number, created_at FROM event_tickets WHERE ticket_number = $1"
        )
        .bind(ticket_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, registration_id, ticket_number, created_at)| EventTicket {
            id,
            registration_id,
            ticket_number,
            created_at,
        }))
    }

    async fn find_by_registration(&self, registration_id: Uuid) -> Result<Option<EventTicket>> {
        let row: Option<(Uuid, Uuid, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, registration_id, ticket_number, created_at FROM event_tickets WHERE registration_id = $1"
        )
        .bind(registration_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, registration_id, ticket_number, created_at)| EventTicket {
            id,
            registration_id,
            ticket_number,
            created_at,
        }))
    }

    async fn max_sequence(&self, code: &str, date_code: &str) -> Result<Option<u32>> {
        let numbers: Vec<(String,)> = sqlx::query_as(
            "SELECT ticket_number FROM event_tickets WHERE ticket_number LIKE $1 AND ticket_number LIKE $2"
        )
        .bind(format!("{code}%"))
        .bind(format!("%{date_code}"))
        .fetch_all(&self.pool)
        .await?;

        Ok(numbers
            .iter()
            .filter_map(|(number,)| parse_sequence(number, code, date_code))
            .max())
    }
}

#[derive(Clone, Debug)]
pub struct PgPaymentProofRepository {
    pool: PgPool,
}

impl PgPaymentProofRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentProofRepository for PgPaymentProofRepository {
    async fn create(&self, registration_id: Uuid, image_url: &str) -> Result<EventPaymentProof> {
        let (id, registration_id, image_url, created_at): (Uuid, Uuid, String, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO event_payment_proofs (registration_id, image_url, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, registration_id, image_url, created_at
            "#
        )
        .bind(registration_id)
        .bind(image_url)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(EventPaymentProof { id, registration_id, image_url, created_at })
    }
}

#[derive(Debug, FromRow)]
struct RsvpRow {
    id: Uuid,
    registration_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RsvpRow> for EventRsvp {
    type Error = OfficialIdError;

    fn try_from(row: RsvpRow) -> Result<Self> {
        let status = row
            .status
            .parse::<RsvpStatus>()
            .map_err(|e| OfficialIdError::Database(sqlx::Error::Decode(e.into())))?;

        Ok(EventRsvp {
            id: row.id,
            registration_id: row.registration_id,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone, Debug)]
pub struct PgRsvpRepository {
    pool: PgPool,
}

impl PgRsvpRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RsvpRepository for PgRsvpRepository {
    async fn upsert(&self, registration_id: Uuid, status: RsvpStatus) -> Result<EventRsvp> {
        let row = sqlx::query_as::<_, RsvpRow>(
            r#"
            INSERT INTO event_rsvps (registration_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (registration_id)
            DO UPDATE SET status = EXCLUDED.status, updated_at = EXCLUDED.updated_at
            RETURNING id, registration_id, status, created_at, updated_at
            "#
        )
        .bind(registration_id)
        .bind(status.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn find_by_registration(&self, registration_id: Uuid) -> Result<Option<EventRsvp>> {
        let row = sqlx::query_as::<_, RsvpRow>(
            "SELECT id, registration_id, status, created_at, updated_at FROM event_rsvps WHERE registration_id = $1"
        )
        .bind(registration_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EventRsvp::try_from).transpose()
    }
}
