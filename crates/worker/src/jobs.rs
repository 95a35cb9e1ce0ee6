//! Retention jobs.
//!
//! Each job is a long-running loop on a fixed `tokio::time::interval` that
//! exits when its [`CancellationToken`] fires. A failed run is logged and
//! retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use patrimonio_core::retention::WarningKind;
use patrimonio_db::DbPool;
use patrimonio_events::Notifier;
use patrimonio_lifecycle::retention;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Purge expired entries every `period`.
pub async fn run_cleanup_loop(
    pool: DbPool,
    notifier: Arc<dyn Notifier>,
    period: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = period.as_secs(), "Recycle-bin cleanup job started");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Recycle-bin cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                match retention::run_cleanup(&pool, notifier.as_ref(), Utc::now()).await {
                    Ok(report) if report.purged > 0 || !report.failures.is_empty() => {
                        tracing::info!(
                            purged = report.purged,
                            skipped = report.skipped,
                            failed = report.failures.len(),
                            "Recycle-bin cleanup finished"
                        );
                    }
                    Ok(_) => tracing::debug!("Recycle-bin cleanup: nothing expired"),
                    Err(e) => tracing::error!(error = %e, "Recycle-bin cleanup failed"),
                }
            }
        }
    }
}

/// Send `kind` warnings every `period`.
pub async fn run_warning_loop(
    pool: DbPool,
    notifier: Arc<dyn Notifier>,
    kind: WarningKind,
    period: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(?kind, interval_secs = period.as_secs(), "Deletion warning job started");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(?kind, "Deletion warning job stopping");
                break;
            }
            _ = interval.tick() => {
                match retention::run_warnings(&pool, notifier.as_ref(), kind, Utc::now()).await {
                    Ok(report) => {
                        tracing::info!(
                            ?kind,
                            entries = report.entries,
                            users_notified = report.users_notified,
                            users_skipped = report.users_skipped,
                            failed = report.failures.len(),
                            "Deletion warnings sent"
                        );
                    }
                    Err(e) => tracing::error!(?kind, error = %e, "Deletion warning run failed"),
                }
            }
        }
    }
}
