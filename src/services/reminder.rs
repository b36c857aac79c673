//! Periodic reminder sweeps.
//!
//! One task runs both sweeps every `REMINDER_INTERVAL_SECS`. A slow sweep
//! never stacks up behind itself: missed ticks are skipped.
//!
//! Sweeps of one kind are serialized through [`AppState::sweep_locks`]. The
//! cron routes wait for an in-flight sweep; background runs skip instead.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::ist;
use crate::services::notification::{self, NotificationError, ReminderKind, SendSummary};
use crate::state::AppState;

/// Run one `kind` sweep against the shared state's pool and mailer, waiting
/// for any sweep of the same kind to finish first.
///
/// # Errors
///
/// Returns a database error if the pending query fails.
pub async fn run_sweep(state: &AppState, kind: ReminderKind) -> Result<SendSummary, NotificationError> {
    let _guard = state.sweep_locks.get(kind).lock().await;
    sweep(state, kind).await
}

/// Like [`run_sweep`], but returns `None` without sweeping when a sweep of
/// the same kind is already running.
pub async fn try_run_sweep(state: &AppState, kind: ReminderKind) -> Option<Result<SendSummary, NotificationError>> {
    let Ok(_guard) = state.sweep_locks.get(kind).try_lock() else {
        debug!(kind = kind.label(), "reminder sweep already running; skipped");
        return None;
    };
    Some(sweep(state, kind).await)
}

async fn sweep(state: &AppState, kind: ReminderKind) -> Result<SendSummary, NotificationError> {
    notification::send_reminders(
        &state.pool,
        state.mailer.as_ref(),
        &state.config.app_name,
        kind,
        ist::now_ist(),
        state.config.reminder_send_concurrency,
    )
    .await
}

/// Run a sweep in the background, logging the outcome.
pub fn spawn_sweep(state: AppState, kind: ReminderKind) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Some(outcome) = try_run_sweep(&state, kind).await {
            log_outcome(kind, outcome);
        }
    })
}

fn log_outcome(kind: ReminderKind, outcome: Result<SendSummary, NotificationError>) {
    match outcome {
        Ok(summary) if summary.emails_sent + summary.failed_emails > 0 => {
            info!(kind = kind.label(), sent = summary.emails_sent, failed = summary.failed_emails, "reminder sweep");
        }
        Ok(_) => {}
        Err(e) => error!(kind = kind.label(), error = %e, "reminder sweep failed"),
    }
}

/// Spawn the periodic sweep task. Returns a handle for shutdown.
pub fn spawn_reminder_task(state: AppState, period: Duration) -> JoinHandle<()> {
    info!(period_secs = period.as_secs(), "reminder sweep configured");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            for kind in [ReminderKind::OneDay, ReminderKind::FifteenMin] {
                if let Some(outcome) = try_run_sweep(&state, kind).await {
                    log_outcome(kind, outcome);
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "reminder_test.rs"]
mod tests;
