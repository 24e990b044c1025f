//! Configuration management module
//!
//! This module handles loading and validation of application configuration
//! from defaults, config files and environment variables.

pub mod settings;
pub mod validation;

pub use settings::{
    AuthConfig, DatabaseConfig, EmailConfig, I18nConfig, LoggingConfig, RateLimitBackend, RateLimitConfig, RedisConfig,
    ServerConfig, Settings, SiteConfig, WorkflowConfig,
};
