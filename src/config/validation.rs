//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{OfficialIdError, Result};
use super::settings::RateLimitBackend;
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_server_config(&settings.server)?;
    validate_database_config(&settings.database)?;
    validate_rate_limit_config(settings)?;
    validate_email_config(&settings.email)?;
    validate_auth_config(&settings.auth)?;
    validate_site_config(&settings.site)?;
    validate_i18n_config(&settings.i18n)?;
    validate_logging_config(&settings.logging)?;
    validate_workflow_config(&settings.workflow)?;

    Ok(())
}

fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.host.is_empty() {
        return Err(OfficialIdError::Config("Server host is required".to_string()));
    }

    if config.port == 0 {
        return Err(OfficialIdError::Config("Server port must be greater than 0".to_string()));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(OfficialIdError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(OfficialIdError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(OfficialIdError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// The Redis URL only matters when Redis backs the rate limiter
fn validate_rate_limit_config(settings: &Settings) -> Result<()> {
    if settings.rate_limit.backend == RateLimitBackend::Redis && settings.redis.url.is_empty() {
        return Err(OfficialIdError::Config(
            "Redis URL is required for the redis rate limit backend".to_string()
        ));
    }

    if settings.rate_limit.sweep_interval_secs == 0 {
        return Err(OfficialIdError::Config(
            "Rate limit sweep interval must be greater than 0".to_string()
        ));
    }

    Ok(())
}

fn validate_email_config(config: &super::EmailConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    if config.api_key.is_empty() {
        return Err(OfficialIdError::Config("E-mail API key is required when e-mail is enabled".to_string()));
    }

    url::Url::parse(&config.api_url)
        .map_err(|e| OfficialIdError::Config(format!("Invalid e-mail API URL: {e}")))?;

    if config.from_address.is_empty() {
        return Err(OfficialIdError::Config("E-mail sender address is required".to_string()));
    }

    if config.timeout_secs == 0 {
        return Err(OfficialIdError::Config("E-mail timeout must be greater than 0".to_string()));
    }

    Ok(())
}

fn validate_auth_config(config: &super::AuthConfig) -> Result<()> {
    if config.jwt_secret.is_empty() {
        return Err(OfficialIdError::Config("JWT secret is required".to_string()));
    }

    Ok(())
}

fn validate_site_config(config: &super::SiteConfig) -> Result<()> {
    let base = url::Url::parse(&config.base_url)
        .map_err(|e| OfficialIdError::Config(format!("Invalid site base URL: {e}")))?;

    if base.cannot_be_a_base() {
        return Err(OfficialIdError::Config("Site base URL cannot be used as a base".to_string()));
    }

    Ok(())
}

/// Validate internationalization configuration
fn validate_i18n_config(config: &super::I18nConfig) -> Result<()> {
    if config.default_language.is_empty() {
        return Err(OfficialIdError::Config(
            "Default language is required".to_string()
        ));
    }

    if config.supported_languages.is_empty() {
        return Err(OfficialIdError::Config(
            "At least one supported language is required".to_string()
        ));
    }

    if !config.supported_languages.contains(&config.default_language) {
        return Err(OfficialIdError::Config(
            "Default language must be in supported languages list".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(OfficialIdError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(OfficialIdError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}

fn validate_workflow_config(config: &super::WorkflowConfig) -> Result<()> {
    if config.approval_concurrency == 0 {
        return Err(OfficialIdError::Config("Approval concurrency must be at least 1".to_string()));
    }

    if config.ticket_insert_attempts == 0 {
        return Err(OfficialIdError::Config("Ticket insert attempts must be at least 1".to_string()));
    }

    Ok(())
}
