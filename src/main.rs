//! Official ID event registration service
//!
//! Main application entry point

use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use official_id::{
    config::Settings,
    database::{create_pool, run_migrations, DatabaseService, PoolConfig},
    i18n::I18n,
    middleware::build_rate_limiter,
    services::ServiceFactory,
    state::AppState,
    utils::logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("failed to load configuration")?;
    settings.validate()?;

    // Initialize logging; the guard flushes the log file on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", official_id::info());

    // Initialize database connection
    info!("Connecting to database...");
    let db_pool = create_pool(&PoolConfig::from(&settings.database)).await?;

    if settings.database.run_migrations {
        info!("Running database migrations...");
        run_migrations(&db_pool).await?;
    }

    let database = DatabaseService::new(db_pool);

    info!("Loading translations...");
    let i18n = I18n::with_embedded(&settings.i18n)?;

    info!("Initializing services...");
    let mailer = ServiceFactory::mailer_for(&settings)?;
    let (services, notification_worker) = ServiceFactory::new(&settings, database.clone(), mailer)?;

    let rate_limiter = build_rate_limiter(&settings).await;
    let sweeper = rate_limiter.spawn_sweeper(Duration::from_secs(settings.rate_limit.sweep_interval_secs));

    let address = settings.bind_address();
    let state = AppState::new(settings, database, services, rate_limiter, i18n);
    let app = official_id::router(state);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(address = %address, "Listening for requests");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    sweeper.abort();

    // The router held the last notification handles; let the worker drain
    if tokio::time::timeout(Duration::from_secs(10), notification_worker).await.is_err() {
        warn!("Notification worker did not drain in time");
    }

    info!("Official ID event service has been shut down.");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
