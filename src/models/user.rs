//! Account profile model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Contact details a registration may contribute to an existing profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileBackfill {
    pub phone: Option<String>,
    pub company: Option<String>,
}

impl ProfileBackfill {
    pub fn is_empty(&self) -> bool {
        self.phone.is_none() && self.company.is_none()
    }
}

/// Fill only the fields that are currently empty
pub fn merge_missing(current: Option<&str>, candidate: Option<&str>) -> Option<String> {
    match current.map(str::trim).filter(|v| !v.is_empty()) {
        Some(existing) => Some(existing.to_string()),
        None => candidate.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_never_clobbers() {
        assert_eq!(merge_missing(Some("0811"), Some("0899")).as_deref(), Some("0811"));
        assert_eq!(merge_missing(Some("  "), Some("0899")).as_deref(), Some("0899"));
        assert_eq!(merge_missing(None, Some("0899")).as_deref(), Some("0899"));
        assert_eq!(merge_missing(None, None), None);
    }
}
