//! Retention scheduler.
//!
//! Runs the recycle-bin cleanup and the two deletion-warning jobs against
//! the same database as the API server.

mod config;
mod jobs;

use std::sync::Arc;

use anyhow::Context;
use patrimonio_core::retention::WarningKind;
use patrimonio_events::{DbNotifier, Notifier};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "patrimonio_worker=debug,patrimonio_lifecycle=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env()?;

    let pool = patrimonio_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    patrimonio_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    let notifier: Arc<dyn Notifier> = Arc::new(DbNotifier::new(pool.clone()));
    let cancel = CancellationToken::new();

    let handles = vec![
        tokio::spawn(jobs::run_cleanup_loop(
            pool.clone(),
            Arc::clone(&notifier),
            config.cleanup_interval,
            cancel.clone(),
        )),
        tokio::spawn(jobs::run_warning_loop(
            pool.clone(),
            Arc::clone(&notifier),
            WarningKind::Warning,
            config.warning_interval,
            cancel.clone(),
        )),
        tokio::spawn(jobs::run_warning_loop(
            pool.clone(),
            Arc::clone(&notifier),
            WarningKind::FinalWarning,
            config.final_warning_interval,
            cancel.clone(),
        )),
    ];

    shutdown_signal().await;
    cancel.cancel();

    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Retention job panicked");
        }
    }
    pool.close().await;

    tracing::info!("Worker stopped");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
