//! Utility modules
//!
//! This module contains common utilities used throughout the application,
//! including error handling, logging setup and input validation.

pub mod errors;
pub mod logging;
pub mod validation;

pub use errors::{OfficialIdError, Result};
