//! Background tasks for the Voxa server.
//!
//! Includes:
//! - Sweeping idle voice sessions.

use crate::session::SessionStore;
use tokio::time::{sleep, Duration};

/// Interval between sweeps: the configured value, or half the timeout
/// clamped to `1..=60` seconds when none is configured.
pub fn sweep_interval(timeout_seconds: u64, configured_seconds: u64) -> Duration {
    if configured_seconds > 0 {
        return Duration::from_secs(configured_seconds);
    }
    Duration::from_secs((timeout_seconds / 2).clamp(1, 60))
}

/// Starts the idle session sweep.
///
/// This task runs indefinitely, removing sessions that have seen no completed
/// turn for longer than `timeout_seconds`. A timeout of `0` disables it.
pub async fn start_session_sweep(
    sessions: SessionStore,
    timeout_seconds: u64,
    interval_seconds: u64,
) {
    if timeout_seconds == 0 {
        tracing::warn!("session sweep disabled (timeout=0)");
        return;
    }

    let interval = sweep_interval(timeout_seconds, interval_seconds);
    let max_idle = Duration::from_secs(timeout_seconds);

    tracing::info!(
        timeout_seconds,
        interval_seconds = interval.as_secs(),
        "starting session sweep task"
    );

    loop {
        sleep(interval).await;

        let expired = sessions.sweep_idle(max_idle).await;
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "swept idle sessions");
            for session_id in expired {
                tracing::debug!(session_id = %session_id, "session expired");
            }
        }
    }
}
