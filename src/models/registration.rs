//! Event registration model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::rsvp::RsvpStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Confirmed => "confirmed",
            RegistrationStatus::Cancelled => "cancelled",
        }
    }

    /// Transitions the workflow allows
    pub fn can_transition_to(&self, next: RegistrationStatus) -> bool {
        matches!(
            (self, next),
            (RegistrationStatus::Pending, RegistrationStatus::Confirmed)
                | (RegistrationStatus::Pending, RegistrationStatus::Cancelled)
                // compensation after a failed ticket insert
                | (RegistrationStatus::Confirmed, RegistrationStatus::Pending)
        )
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RegistrationStatus::Pending),
            "confirmed" => Ok(RegistrationStatus::Confirmed),
            "cancelled" => Ok(RegistrationStatus::Cancelled),
            other => Err(format!("unknown registration status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRegistration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub institution: Option<String>,
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistration {
    pub event_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub institution: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventPaymentProof {
    pub id: Uuid,
    pub registration_id: Uuid,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// Registration row joined with its ticket and attendance record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    #[serde(flatten)]
    pub registration: EventRegistration,
    pub ticket_number: Option<String>,
    pub rsvp_status: Option<RsvpStatus>,
}

/// Query of `GET /events/{event_id}/participants`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantsQuery {
    /// `YYYY-MM-DD`; keeps registrations submitted on that (UTC) day
    pub registered_on: Option<String>,
}

/// Body of `POST /events/register`; every field optional so that missing
/// fields surface as validation errors instead of deserialization failures
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterEventRequest {
    pub event_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub institution: Option<String>,
    pub payment_proof_url: Option<String>,
}

/// Body of `POST /events/approve` and `POST /events/cancel`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApproveRegistrationsRequest {
    pub registration_ids: Option<Vec<String>>,
}
