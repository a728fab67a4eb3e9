//! tab-settle server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints, after
//! restoring journaled state when persistence is enabled.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use tab_settle::api;
use tab_settle::app_state::AppState;
use tab_settle::config::{GatewayConfig, LogFormat};
use tab_settle::domain::{EventBus, SeatStore, SessionRepository};
use tab_settle::persistence::{PostgresPersistence, SessionJournal};
use tab_settle::service::{SeatService, SessionService, sweeper};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(3_600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env()?;
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting tab-settle");

    // Build domain layer
    let repository = Arc::new(SessionRepository::new());
    let seats = Arc::new(SeatStore::new());
    let event_bus = EventBus::new(config.event_bus_capacity);

    let journal = if config.persistence_enabled {
        Some(open_journal(&config, &repository, &seats).await?)
    } else {
        tracing::warn!("persistence disabled, state lives in memory only");
        None
    };

    // Build service layer
    let session_service = Arc::new(SessionService::new(
        repository,
        Arc::clone(&seats),
        event_bus,
        journal.clone(),
    ));
    let seat_service = Arc::new(SeatService::new(seats, journal.clone()));

    // Background tasks
    sweeper::spawn_pending_sweeper(
        Arc::clone(&session_service),
        config.pending_payment_sweep_interval(),
        config.pending_payment_timeout(),
    );
    if let Some(journal) = journal {
        sweeper::spawn_journal_cleanup(journal, config.cleanup_after_days, CLEANUP_INTERVAL);
    }

    // Build router
    let app_state = AppState::new(session_service, seat_service);
    let app = api::build_app(app_state, config.request_timeout());

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

/// Connects to PostgreSQL, runs migrations and loads journaled sessions
/// and seats back into memory.
async fn open_journal(
    config: &GatewayConfig,
    repository: &SessionRepository,
    seats: &SeatStore,
) -> anyhow::Result<Arc<dyn SessionJournal>> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("connecting to the journal database")?;

    let persistence = PostgresPersistence::new(pool, config.event_log_enabled);
    persistence.migrate().await?;

    let sessions = repository.restore(persistence.load_sessions().await?).await;
    let restored_seats = seats.restore(persistence.load_seats().await?).await;
    tracing::info!(sessions, seats = restored_seats, "journal restored");

    Ok(Arc::new(persistence))
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
