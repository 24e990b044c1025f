//! Ticket model

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::EventType;
use super::registration::RegistrationStatus;
use super::rsvp::RsvpStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventTicket {
    pub id: Uuid,
    pub registration_id: Uuid,
    pub ticket_number: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of a ticket for `GET /events/tickets/{ticket_number}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketDetails {
    pub ticket_number: String,
    pub event_title: String,
    pub event_date: NaiveDate,
    pub event_time: Option<NaiveTime>,
    pub event_type: EventType,
    pub location: Option<String>,
    pub participant_name: String,
    pub registration_status: RegistrationStatus,
    pub rsvp_status: Option<RsvpStatus>,
}
