//! Event repository implementation

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::event::{Event, EventType};
use crate::utils::errors::{OfficialIdError, Result};

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Find event by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>>;
}

#[derive(Debug, FromRow)]
struct EventRow {
    id: Uuid,
    organization_id: Uuid,
    title: String,
    event_date: NaiveDate,
    event_time: Option<NaiveTime>,
    event_type: String,
    location: Option<String>,
    zoom_link: Option<String>,
    max_participants: Option<i32>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = OfficialIdError;

    fn try_from(row: EventRow) -> Result<Self> {
        let event_type = row
            .event_type
            .parse::<EventType>()
            .map_err(|e| OfficialIdError::Database(sqlx::Error::Decode(e.into())))?;

        Ok(Event {
            id: row.id,
            organization_id: row.organization_id,
            title: row.title,
            date: row.event_date,
            time: row.event_time,
            event_type,
            location: row.location,
            zoom_link: row.zoom_link,
            max_participants: row.max_participants,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone, Debug)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(
            "SELECT id, organization_id, title, event_date, event_time, event_type, location, zoom_link, max_participants, created_at FROM events WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Event::try_from).transpose()
    }
}
