//! Reminder and welcome-email routes.
//!
//! The admin send routes detach the sweep and answer immediately. The cron
//! routes are unauthenticated, run the sweep inline, and return its summary.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth::{AdminUser, AuthUser};
use super::enrollments::enrollment_error_to_api;
use super::response::{ApiError, ApiResponse, ApiResult};
use crate::ist;
use crate::services::auth::UserRole;
use crate::services::enrollment::{self, Enrollment, ReminderStatusUpdate};
use crate::services::notification::{
    self, NotificationError, NotificationStats, PendingReminder, ReminderKind, SendSummary, WelcomeSent,
};
use crate::services::reminder;
use crate::state::AppState;

pub(crate) fn notification_error_to_api(err: NotificationError) -> ApiError {
    match err {
        NotificationError::RegistrationNotFound => ApiError::not_found(err.to_string()),
        NotificationError::Mail(e) => {
            tracing::error!(error = %e, "email delivery failed");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to send welcome email: {e}"))
        }
        NotificationError::Database(e) => ApiError::internal(e),
    }
}

#[derive(Debug, Serialize)]
pub struct SweepTriggered {
    pub triggered_by: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

fn trigger(state: AppState, admin_email: String, kind: ReminderKind) -> SweepTriggered {
    tracing::info!(kind = kind.label(), triggered_by = %admin_email, "reminder sweep triggered manually");
    reminder::spawn_sweep(state, kind);
    SweepTriggered {
        triggered_by: admin_email,
        kind: match kind {
            ReminderKind::OneDay => "1day_reminders",
            ReminderKind::FifteenMin => "15min_reminders",
        },
    }
}

/// `POST /api/v1/notifications/send-1day-reminders` (admin)
pub async fn send_1day(State(state): State<AppState>, AdminUser(admin): AdminUser) -> ApiResult<SweepTriggered> {
    Ok(ApiResponse::ok(
        "1-day reminder emails triggered successfully. Processing in background.",
        trigger(state, admin.email, ReminderKind::OneDay),
    ))
}

/// `POST /api/v1/notifications/send-15min-reminders` (admin)
pub async fn send_15min(State(state): State<AppState>, AdminUser(admin): AdminUser) -> ApiResult<SweepTriggered> {
    Ok(ApiResponse::ok(
        "15-minute reminder emails triggered successfully. Processing in background.",
        trigger(state, admin.email, ReminderKind::FifteenMin),
    ))
}

#[derive(Deserialize)]
pub struct WelcomeBody {
    pub user_id: Uuid,
    pub workshop_id: Uuid,
}

/// `POST /api/v1/notifications/send-welcome-email`: self or admin.
pub async fn send_welcome(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<WelcomeBody>,
) -> ApiResult<WelcomeSent> {
    if auth.user.id != body.user_id && auth.user.role != UserRole::Admin {
        return Err(ApiError::forbidden("You can only request your own welcome email"));
    }
    let sent = notification::send_welcome(
        &state.pool,
        state.mailer.as_ref(),
        &state.config.app_name,
        body.user_id,
        body.workshop_id,
    )
    .await
    .map_err(notification_error_to_api)?;
    Ok(ApiResponse::ok("Welcome email sent successfully", sent))
}

/// `POST /api/v1/notifications/update-reminder-status` (admin)
pub async fn update_reminder_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<ReminderStatusUpdate>,
) -> ApiResult<Enrollment> {
    let updated = enrollment::update_reminder_status(&state.pool, &body)
        .await
        .map_err(enrollment_error_to_api)?;
    Ok(ApiResponse::ok("Reminder status updated successfully", updated))
}

/// `GET /api/v1/notifications/stats` (admin)
pub async fn stats(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<NotificationStats> {
    let stats = notification::stats(&state.pool, ist::now_ist())
        .await
        .map_err(notification_error_to_api)?;
    Ok(ApiResponse::ok("Notification statistics retrieved successfully", stats))
}

#[derive(Debug, Serialize)]
pub struct PendingList {
    pub count: usize,
    pub pending_reminders: Vec<PendingReminder>,
}

async fn pending(state: &AppState, kind: ReminderKind) -> ApiResult<PendingList> {
    let pending_reminders = notification::pending_reminders(&state.pool, kind, ist::now_ist())
        .await
        .map_err(notification_error_to_api)?;
    let message = format!("Found {} pending {} reminders", pending_reminders.len(), kind.label());
    Ok(ApiResponse::ok(message, PendingList { count: pending_reminders.len(), pending_reminders }))
}

/// `GET /api/v1/notifications/pending-1day-reminders` (admin)
pub async fn pending_1day(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<PendingList> {
    pending(&state, ReminderKind::OneDay).await
}

/// `GET /api/v1/notifications/pending-15min-reminders` (admin)
pub async fn pending_15min(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<PendingList> {
    pending(&state, ReminderKind::FifteenMin).await
}

#[derive(Debug, Serialize)]
pub struct CronRun {
    #[serde(flatten)]
    pub summary: SendSummary,
    pub timestamp: String,
}

async fn cron(state: &AppState, kind: ReminderKind) -> ApiResult<CronRun> {
    tracing::info!(kind = kind.label(), "cron reminder sweep");
    let summary = reminder::run_sweep(state, kind).await.map_err(notification_error_to_api)?;
    let message = summary.message.clone();
    Ok(ApiResponse::ok(message, CronRun { summary, timestamp: ist::format_ist_seconds(ist::now_ist()) }))
}

/// `POST /api/v1/notifications/cron/1day-reminders`
pub async fn cron_1day(State(state): State<AppState>) -> ApiResult<CronRun> {
    cron(&state, ReminderKind::OneDay).await
}

/// `POST /api/v1/notifications/cron/15min-reminders`
pub async fn cron_15min(State(state): State<AppState>) -> ApiResult<CronRun> {
    cron(&state, ReminderKind::FifteenMin).await
}

#[cfg(test)]
#[path = "notifications_test.rs"]
mod tests;
