//! # Task Board API Server
//!
//! Serves the task board API backed by PostgreSQL, mirroring tasks to the
//! user's calendar when the request carries a calendar token.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/taskboard \
//! JWT_SECRET=<identity provider secret> \
//! cargo run -p taskboard-api
//! ```

use std::sync::Arc;

use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::{Config, LogFormat};
use taskboard_shared::calendar::google::GoogleCalendarClient;
use taskboard_shared::db::migrations::{ensure_database_exists, migration_status, run_migrations};
use taskboard_shared::db::pool::{close_pool, create_pool};
use taskboard_shared::store::postgres::PgTaskStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        delete_policy = ?config.delete_policy,
        "Task board API starting"
    );

    if !config.api.production {
        ensure_database_exists(&config.database.url).await?;
    }
    let pool = create_pool(config.database.clone()).await?;
    run_migrations(&pool).await?;

    let status = migration_status(&pool).await?;
    if status.is_up_to_date() {
        tracing::info!(applied = status.applied, latest = ?status.latest_version, "Schema up to date");
    } else {
        tracing::warn!(applied = status.applied, known = status.known, "Schema is behind this build");
    }

    let shutdown = CancellationToken::new();
    let store = PgTaskStore::new(pool.clone());
    let listener_handle = store.spawn_listener(shutdown.clone()).await?;

    let calendar =
        GoogleCalendarClient::with_events_url(config.calendar.events_url.clone(), config.calendar.timeout)?;
    tracing::info!(events_url = calendar.events_url(), "Calendar client ready");

    let bind_address = config.bind_address();
    let state =
        AppState::new(Arc::new(store), Arc::new(calendar), config).with_shutdown(shutdown.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %bind_address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    if let Err(e) = listener_handle.await {
        tracing::warn!(error = %e, "Task change listener did not stop cleanly");
    }
    close_pool(pool).await;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskboard_api=debug,taskboard_shared=debug,tower_http=debug".into());

    let json = (format == LogFormat::Json).then(|| fmt::layer().json());
    let text = (format == LogFormat::Text).then(fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        }
        _ = shutdown.cancelled() => {}
    }
    // Ends open event streams so the server can drain
    shutdown.cancel();
}
