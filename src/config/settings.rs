//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from built-in defaults, an optional `config.*` file
//! and `OFFICIAL_ID_*` environment variables (`__` separates nested keys,
//! e.g. `OFFICIAL_ID_DATABASE__URL`).

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub rate_limit: RateLimitConfig,
    pub email: EmailConfig,
    pub auth: AuthConfig,
    pub site: SiteConfig,
    pub i18n: I18nConfig,
    pub logging: LoggingConfig,
    pub workflow: WorkflowConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: Option<u64>,
    pub max_lifetime_secs: Option<u64>,
    pub run_migrations: bool,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub url: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitBackend {
    Memory,
    Redis,
}

/// Rate limiter configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub backend: RateLimitBackend,
    pub sweep_interval_secs: u64,
}

/// Transactional e-mail configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    /// When disabled, messages are only logged
    pub enabled: bool,
    pub api_url: String,
    pub api_key: String,
    pub from_address: String,
    pub timeout_secs: u64,
}

/// Bearer token verification
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: Option<String>,
}

/// Public site configuration, used to build ticket links
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    pub base_url: String,
}

/// Internationalization configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct I18nConfig {
    pub default_language: String,
    pub supported_languages: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for the daily rolling log file; stdout only when unset
    pub file_directory: Option<String>,
    pub file_prefix: String,
    pub json: bool,
}

/// Registration workflow tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// How many registrations of one approval batch run at once
    pub approval_concurrency: usize,
    /// Ticket inserts tried per approval before giving up on number clashes
    pub ticket_insert_attempts: u32,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::load("config")
    }

    /// Load settings using `file` (without extension) as the optional file source
    pub fn load(file: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::with_name(file).required(false))
            .add_source(
                config::Environment::with_prefix("OFFICIAL_ID")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .with_list_parse_key("i18n.supported_languages")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::OfficialIdError> {
        super::validation::validate_settings(self)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                cors_origins: vec![],
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/official_id".to_string(),
                max_connections: 10,
                min_connections: 1,
                acquire_timeout_secs: 30,
                idle_timeout_secs: Some(600),
                max_lifetime_secs: Some(1800),
                run_migrations: true,
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
                prefix: "official_id:".to_string(),
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                backend: RateLimitBackend::Memory,
                sweep_interval_secs: 300,
            },
            email: EmailConfig {
                enabled: false,
                api_url: "https://api.resend.com/emails".to_string(),
                api_key: String::new(),
                from_address: "Official ID <noreply@official.id>".to_string(),
                timeout_secs: 10,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                issuer: None,
            },
            site: SiteConfig {
                base_url: "https://official.id".to_string(),
            },
            i18n: I18nConfig {
                default_language: "id".to_string(),
                supported_languages: vec!["id".to_string(), "en".to_string()],
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_directory: None,
                file_prefix: "official-id.log".to_string(),
                json: false,
            },
            workflow: WorkflowConfig {
                approval_concurrency: 1,
                ticket_insert_attempts: 5,
            },
        }
    }
}
