//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the Official ID event service.

use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::LoggingConfig;
use crate::utils::errors::{OfficialIdError, Result};

/// Initialize logging based on configuration.
///
/// `RUST_LOG` overrides the configured level. The returned guard flushes the
/// file writer and must be held for the lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_writer, guard) = match &config.file_directory {
        Some(directory) => {
            let file_appender = tracing_appender::rolling::daily(directory, &config.file_prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (Some(non_blocking), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(config.json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stdout)))
        .with((!config.json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stdout)))
        .with(file_writer.map(|writer| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
        }))
        .try_init()
        .map_err(|e| OfficialIdError::Config(format!("Failed to initialize logging: {e}")))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log registration workflow actions with structured data
pub fn log_registration_action(registration_id: Uuid, action: &str, actor: Option<Uuid>, details: Option<&str>) {
    info!(
        registration_id = %registration_id,
        action = action,
        actor = ?actor,
        details = details,
        "Registration action performed"
    );
}

/// Log the outcome of an approve/cancel batch
pub fn log_batch_outcome(operation: &str, actor: Uuid, processed: usize, failed: usize) {
    if failed > 0 {
        warn!(
            operation = operation,
            actor = %actor,
            processed = processed,
            failed = failed,
            "Batch finished with failures"
        );
    } else {
        info!(operation = operation, actor = %actor, processed = processed, "Batch finished");
    }
}

/// A transition the authorization-scoped update refused
pub fn log_transition_rejected(registration_id: Uuid, actor: Uuid, operation: &str) {
    warn!(
        registration_id = %registration_id,
        actor = %actor,
        operation = operation,
        "Status update matched no row (not pending or not permitted)"
    );
}

/// Registration left in a state the workflow should never produce
pub fn log_data_integrity(registration_id: Uuid, stage: &str, error: &str) {
    error!(
        data_integrity = true,
        registration_id = %registration_id,
        stage = stage,
        error = error,
        "Data integrity warning"
    );
}

/// Log notification delivery failures
pub fn log_notification_failure(template: &str, recipient: &str, error: &str) {
    error!(
        template = template,
        recipient = recipient,
        error = error,
        "Notification delivery failed"
    );
}

/// Log rate limit rejections
pub fn log_rate_limited(key: &str, retry_after_secs: u64) {
    debug!(key = key, retry_after_secs = retry_after_secs, "Rate limit exceeded");
}

/// Log API errors with context
pub fn log_api_error(api: &str, error: &str, context: Option<&str>) {
    error!(
        api = api,
        error = error,
        context = context,
        "API error occurred"
    );
}
