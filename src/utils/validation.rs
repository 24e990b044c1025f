//! Input validation and sanitization for public submissions
//!
//! Every request schema implements [`Validate`], producing either a
//! normalized value or a [`ValidationErrors`] map keyed by field name.
//! Nothing is applied when any field fails.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    ApproveRegistrationsRequest, ParticipantsQuery, RegisterEventRequest, RsvpRequest, RsvpStatus,
};

/// Upper bound for one approval/cancel batch
pub const MAX_BATCH_SIZE: usize = 100;

static ANGLE_BRACKETS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[<>]").expect("valid regex"));
static JS_PROTOCOL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)javascript:").expect("valid regex"));
static EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)on\w+=").expect("valid regex"));
static EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));
static PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\+62|62|0)8[1-9][0-9]{6,11}$").expect("valid regex"));

/// A single rule violation; `key` is an i18n message key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub key: String,
    pub params: BTreeMap<String, String>,
}

impl FieldViolation {
    pub fn new(key: &str) -> Self {
        Self { key: key.to_string(), params: BTreeMap::new() }
    }

    pub fn with_param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }
}

/// Field-keyed validation failures
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<FieldViolation>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single-field failure
    pub fn single(field: &str, violation: FieldViolation) -> Self {
        let mut errors = Self::new();
        errors.add(field, violation);
        errors
    }

    pub fn add(&mut self, field: &str, violation: FieldViolation) {
        self.fields.entry(field.to_string()).or_default().push(violation);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<FieldViolation>> {
        &self.fields
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// Schema validation for an incoming request
pub trait Validate {
    type Output;

    fn validate(&self) -> Result<Self::Output, ValidationErrors>;
}

/// Strip angle brackets, `javascript:` and inline handler attributes
pub fn sanitize_text(input: &str) -> String {
    let without_brackets = ANGLE_BRACKETS.replace_all(input, "");
    let without_protocol = JS_PROTOCOL.replace_all(&without_brackets, "");
    EVENT_HANDLER.replace_all(&without_protocol, "").trim().to_string()
}

/// Required free-text field with length bounds (in characters)
pub fn required_text(errors: &mut ValidationErrors, field: &str, value: Option<&str>, min: usize, max: usize) -> Option<String> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        errors.add(field, FieldViolation::new("validation.required"));
        return None;
    };

    let cleaned = sanitize_text(raw);
    let length = cleaned.chars().count();
    if length < min {
        errors.add(field, FieldViolation::new("validation.too_short").with_param("min", min));
        return None;
    }
    if length > max {
        errors.add(field, FieldViolation::new("validation.too_long").with_param("max", max));
        return None;
    }
    Some(cleaned)
}

/// Optional free-text field; blank collapses to `None`
pub fn optional_text(errors: &mut ValidationErrors, field: &str, value: Option<&str>, max: usize) -> Option<String> {
    let raw = value.map(str::trim).filter(|v| !v.is_empty())?;
    let cleaned = sanitize_text(raw);
    if cleaned.chars().count() > max {
        errors.add(field, FieldViolation::new("validation.too_long").with_param("max", max));
        return None;
    }
    Some(cleaned).filter(|v| !v.is_empty())
}

/// E-mail address, trimmed and lower-cased
pub fn email_field(errors: &mut ValidationErrors, field: &str, value: Option<&str>, max: usize) -> Option<String> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        errors.add(field, FieldViolation::new("validation.required"));
        return None;
    };

    let normalized = raw.to_lowercase();
    if normalized.chars().count() > max {
        errors.add(field, FieldViolation::new("validation.too_long").with_param("max", max));
        return None;
    }
    if !EMAIL.is_match(&normalized) {
        errors.add(field, FieldViolation::new("validation.invalid_email"));
        return None;
    }
    Some(normalized)
}

/// Optional Indonesian phone number with whitespace removed
pub fn optional_phone(errors: &mut ValidationErrors, field: &str, value: Option<&str>) -> Option<String> {
    let compact: String = value?.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }
    if !PHONE.is_match(&compact) {
        errors.add(field, FieldViolation::new("validation.invalid_phone"));
        return None;
    }
    Some(compact)
}

/// Required UUID identifier
pub fn uuid_field(errors: &mut ValidationErrors, field: &str, value: Option<&str>) -> Option<Uuid> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        errors.add(field, FieldViolation::new("validation.required"));
        return None;
    };

    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add(field, FieldViolation::new("validation.invalid_uuid"));
            None
        }
    }
}

/// Optional absolute http(s) URL
pub fn optional_url(errors: &mut ValidationErrors, field: &str, value: Option<&str>, max: usize) -> Option<String> {
    let raw = value.map(str::trim).filter(|v| !v.is_empty())?;
    if raw.chars().count() > max {
        errors.add(field, FieldViolation::new("validation.too_long").with_param("max", max));
        return None;
    }
    match url::Url::parse(raw) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Some(parsed.to_string()),
        _ => {
            errors.add(field, FieldViolation::new("validation.invalid_url"));
            None
        }
    }
}

/// Optional calendar date written literally as `YYYY-MM-DD`
pub fn optional_date(errors: &mut ValidationErrors, field: &str, value: Option<&str>) -> Option<NaiveDate> {
    let raw = value.map(str::trim).filter(|v| !v.is_empty())?;
    let parsed = ISO_DATE
        .is_match(raw)
        .then(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
        .flatten();
    if parsed.is_none() {
        errors.add(field, FieldViolation::new("validation.invalid_date"));
    }
    parsed
}

impl Validate for ParticipantsQuery {
    type Output = Option<NaiveDate>;

    fn validate(&self) -> Result<Option<NaiveDate>, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let registered_on = optional_date(&mut errors, "registered_on", self.registered_on.as_deref());
        if errors.is_empty() {
            Ok(registered_on)
        } else {
            Err(errors)
        }
    }
}

/// Normalized registration submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistration {
    pub event_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub institution: Option<String>,
    pub payment_proof_url: Option<String>,
}

impl Validate for RegisterEventRequest {
    type Output = ValidRegistration;

    fn validate(&self) -> Result<ValidRegistration, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let event_id = uuid_field(&mut errors, "event_id", self.event_id.as_deref());
        let name = required_text(&mut errors, "name", self.name.as_deref(), 2, 100);
        let email = email_field(&mut errors, "email", self.email.as_deref(), 255);
        let phone = optional_phone(&mut errors, "phone", self.phone.as_deref());
        let institution = optional_text(&mut errors, "institution", self.institution.as_deref(), 200);
        let payment_proof_url = optional_url(&mut errors, "payment_proof_url", self.payment_proof_url.as_deref(), 500);

        match (event_id, name, email) {
            (Some(event_id), Some(name), Some(email)) if errors.is_empty() => Ok(ValidRegistration {
                event_id,
                name,
                email,
                phone,
                institution,
                payment_proof_url,
            }),
            _ => Err(errors),
        }
    }
}

/// Normalized RSVP submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRsvp {
    pub ticket_number: String,
    pub status: RsvpStatus,
}

impl Validate for RsvpRequest {
    type Output = ValidRsvp;

    fn validate(&self) -> Result<ValidRsvp, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let ticket_number = match self.ticket_number.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            Some(raw) if raw.chars().all(|c| c.is_ascii_alphanumeric()) && raw.len() <= 32 => Some(raw.to_uppercase()),
            Some(_) => {
                errors.add("ticket_number", FieldViolation::new("validation.invalid_ticket_number"));
                None
            }
            None => {
                errors.add("ticket_number", FieldViolation::new("validation.required"));
                None
            }
        };

        let status = match self.status.as_deref() {
            Some(raw) if !raw.trim().is_empty() => match raw.parse::<RsvpStatus>() {
                Ok(status) => Some(status),
                Err(_) => {
                    errors.add(
                        "status",
                        FieldViolation::new("validation.invalid_choice").with_param("choices", RsvpStatus::choices()),
                    );
                    None
                }
            },
            _ => {
                errors.add("status", FieldViolation::new("validation.required"));
                None
            }
        };

        match (ticket_number, status) {
            (Some(ticket_number), Some(status)) => Ok(ValidRsvp { ticket_number, status }),
            _ => Err(errors),
        }
    }
}

impl Validate for ApproveRegistrationsRequest {
    type Output = Vec<String>;

    /// Only the batch shape is checked here; each id is judged on its own
    /// during processing so one bad id never sinks the batch.
    fn validate(&self) -> Result<Vec<String>, ValidationErrors> {
        let ids = self.registration_ids.clone().unwrap_or_default();
        if ids.is_empty() {
            return Err(ValidationErrors::single("registration_ids", FieldViolation::new("validation.empty_list")));
        }
        if ids.len() > MAX_BATCH_SIZE {
            return Err(ValidationErrors::single(
                "registration_ids",
                FieldViolation::new("validation.too_many").with_param("max", MAX_BATCH_SIZE),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        Ok(ids
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| seen.insert(id.clone()))
            .collect())
    }
}
