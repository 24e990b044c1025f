//! Error handling for Official ID
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;
use uuid::Uuid;
use crate::utils::validation::ValidationErrors;

/// Main error type for the Official ID event service
#[derive(Error, Debug)]
pub enum OfficialIdError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("E-mail delivery failed: {0}")]
    Email(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: Uuid },

    #[error("Ticket not found: {ticket_number}")]
    TicketNotFound { ticket_number: String },

    #[error("Registration not found: {registration_id}")]
    RegistrationNotFound { registration_id: Uuid },

    #[error("None of the requested registrations is pending")]
    NoPendingRegistrations,

    #[error("E-mail {email} is already registered for event {event_id}")]
    DuplicateRegistration { event_id: Uuid, email: String },

    #[error("Event {event_id} is full ({max_participants} participants)")]
    EventFull { event_id: Uuid, max_participants: i32 },

    #[error("Registration {registration_id} is not confirmed")]
    RegistrationNotConfirmed { registration_id: Uuid },

    #[error("Ticket number already issued: {ticket_number}")]
    TicketNumberTaken { ticket_number: String },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias for Official ID operations
pub type Result<T> = std::result::Result<T, OfficialIdError>;

impl From<ValidationErrors> for OfficialIdError {
    fn from(errors: ValidationErrors) -> Self {
        OfficialIdError::Validation(errors)
    }
}

impl OfficialIdError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            OfficialIdError::Database(_) => false,
            OfficialIdError::Migration(_) => false,
            OfficialIdError::Redis(_) => true,
            OfficialIdError::Http(_) => true,
            OfficialIdError::Email(_) => true,
            OfficialIdError::Config(_) => false,
            OfficialIdError::Validation(_) => false,
            OfficialIdError::EventNotFound { .. } => false,
            OfficialIdError::TicketNotFound { .. } => false,
            OfficialIdError::RegistrationNotFound { .. } => false,
            OfficialIdError::NoPendingRegistrations => false,
            OfficialIdError::DuplicateRegistration { .. } => false,
            OfficialIdError::EventFull { .. } => false,
            OfficialIdError::RegistrationNotConfirmed { .. } => false,
            OfficialIdError::TicketNumberTaken { .. } => true,
            OfficialIdError::Authentication(_) => false,
            OfficialIdError::PermissionDenied(_) => false,
            OfficialIdError::RateLimitExceeded { .. } => true,
            OfficialIdError::Serialization(_) => false,
            OfficialIdError::Io(_) => true,
            OfficialIdError::UrlParse(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            OfficialIdError::Database(_) => ErrorSeverity::Critical,
            OfficialIdError::Migration(_) => ErrorSeverity::Critical,
            OfficialIdError::Config(_) => ErrorSeverity::Critical,
            OfficialIdError::PermissionDenied(_) => ErrorSeverity::Warning,
            OfficialIdError::Authentication(_) => ErrorSeverity::Warning,
            OfficialIdError::RateLimitExceeded { .. } => ErrorSeverity::Warning,
            OfficialIdError::Validation(_) => ErrorSeverity::Info,
            OfficialIdError::EventNotFound { .. }
            | OfficialIdError::TicketNotFound { .. }
            | OfficialIdError::RegistrationNotFound { .. }
            | OfficialIdError::NoPendingRegistrations
            | OfficialIdError::DuplicateRegistration { .. }
            | OfficialIdError::EventFull { .. }
            | OfficialIdError::RegistrationNotConfirmed { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// Whether this is a storage uniqueness violation
    pub fn is_unique_violation(&self) -> bool {
        match self {
            OfficialIdError::Database(sqlx::Error::Database(db_error)) => db_error.is_unique_violation(),
            _ => false,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
