use anyhow::{Context, Result};
use tokio::time::{Duration, sleep};
use tracing::{error, info};

use crate::web::{AppState, auth};

const CLEANUP_INTERVAL_MINUTES: u64 = 15;

/// Starts the background loop that removes expired sessions.
pub fn spawn(state: AppState) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(CLEANUP_INTERVAL_MINUTES * 60);
        loop {
            if let Err(err) = run_cleanup_cycle(&state).await {
                error!(?err, "session cleanup cycle failed");
            }
            sleep(interval).await;
        }
    });
}

async fn run_cleanup_cycle(state: &AppState) -> Result<()> {
    let removed = auth::purge_expired_sessions(state.pool_ref())
        .await
        .context("failed to purge expired sessions")?;

    if removed > 0 {
        info!(removed, "expired sessions purged");
    }

    Ok(())
}
