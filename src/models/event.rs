//! Event and organization models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Offline,
    Online,
    Hybrid,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Offline => "offline",
            EventType::Online => "online",
            EventType::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offline" => Ok(EventType::Offline),
            "online" => Ok(EventType::Online),
            "hybrid" => Ok(EventType::Hybrid),
            other => Err(format!("unknown event type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub location: Option<String>,
    pub zoom_link: Option<String>,
    /// `None` means unlimited seats
    pub max_participants: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Whether the event accepts another registration given the active count
    pub fn has_capacity_for(&self, active_registrations: i64) -> bool {
        match self.max_participants {
            Some(max) => active_registrations < i64::from(max),
            None => true,
        }
    }
}

/// A "Circle" in product terms
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationRole {
    Owner,
    Admin,
    Member,
}

impl OrganizationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationRole::Owner => "owner",
            OrganizationRole::Admin => "admin",
            OrganizationRole::Member => "member",
        }
    }

    /// Owners and admins manage their organization's event registrations
    pub fn can_manage_registrations(&self) -> bool {
        matches!(self, OrganizationRole::Owner | OrganizationRole::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(max_participants: Option<i32>) -> Event {
        Event {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            title: "Tech Summit".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            time: None,
            event_type: EventType::Offline,
            location: None,
            zoom_link: None,
            max_participants,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_capacity() {
        assert!(event(Some(2)).has_capacity_for(1));
        assert!(!event(Some(2)).has_capacity_for(2));
        assert!(!event(Some(0)).has_capacity_for(0));
        assert!(event(None).has_capacity_for(10_000));
    }

    #[test]
    fn test_event_type_serde() {
        let json = serde_json::to_value(event(None)).unwrap();
        assert_eq!(json["type"], "offline");
        assert_eq!("hybrid".parse::<EventType>().unwrap(), EventType::Hybrid);
        assert!("virtual".parse::<EventType>().is_err());
    }
}
