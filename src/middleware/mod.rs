//! Middleware module
//!
//! This module contains middleware and extractors for request processing

pub mod auth;
pub mod locale;
pub mod logging;
pub mod rate_limit;

// Re-export commonly used middleware
pub use auth::{AuthenticatedUser, BearerToken};
pub use locale::RequestLocale;
pub use logging::log_requests;
pub use rate_limit::{build_rate_limiter, client_identifier, RateLimitPolicy, RateLimiter};
