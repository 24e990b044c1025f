//! Attendance (RSVP) model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Post-event attendance answers; the literals are part of the public API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RsvpStatus {
    #[serde(rename = "Hadir Tepat Waktu")]
    HadirTepatWaktu,
    #[serde(rename = "Hadir Terlambat")]
    HadirTerlambat,
    #[serde(rename = "Tidak Hadir")]
    TidakHadir,
}

impl RsvpStatus {
    pub const ALL: [RsvpStatus; 3] = [RsvpStatus::HadirTepatWaktu, RsvpStatus::HadirTerlambat, RsvpStatus::TidakHadir];

    pub fn as_str(&self) -> &'static str {
        match self {
            RsvpStatus::HadirTepatWaktu => "Hadir Tepat Waktu",
            RsvpStatus::HadirTerlambat => "Hadir Terlambat",
            RsvpStatus::TidakHadir => "Tidak Hadir",
        }
    }

    /// Accepted literals joined for error messages
    pub fn choices() -> String {
        Self::ALL.iter().map(|s| format!("\"{}\"", s.as_str())).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RsvpStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown RSVP status: {s}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRsvp {
    pub id: Uuid,
    pub registration_id: Uuid,
    pub status: RsvpStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /events/rsvp`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RsvpRequest {
    pub ticket_number: Option<String>,
    pub status: Option<String>,
}
