use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::watch;

use crate::db;

/// Spawn the periodic reaper for expired reset tokens. Runs until the
/// shutdown channel flips; a failed sweep is logged and retried on the next
/// tick, it never takes the task down.
pub fn spawn(
    pool: PgPool,
    interval: std::time::Duration,
    shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(pool, interval, shutdown))
}

async fn run(pool: PgPool, interval: std::time::Duration, mut shutdown: watch::Receiver<bool>) {
    tracing::info!("Reset token sweeper started (interval {:?})", interval);

    loop {
        if *shutdown.borrow() {
            break;
        }

        match db::password_reset_tokens::sweep(&pool, Utc::now()).await {
            Ok(0) => tracing::debug!("Sweep found no expired reset tokens"),
            Ok(count) => tracing::info!("Deleted {count} expired reset tokens"),
            Err(e) => tracing::error!("Reset token sweep failed: {e}"),
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {}
        }
    }

    tracing::info!("Reset token sweeper stopped");
}
