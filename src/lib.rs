//! Official ID event registration service
//!
//! Public registration for organization events, batch approval with ticket
//! issuance, cancellation and attendance RSVPs, served over HTTP with
//! rate-limited public endpoints and localized responses.

pub mod config;
pub mod database;
pub mod handlers;
pub mod i18n;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{OfficialIdError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use handlers::router;
pub use i18n::I18n;
pub use services::ServiceFactory;
pub use state::AppState;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
