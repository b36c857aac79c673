//! Workshop reminder and welcome emails.
//!
//! DESIGN
//! ======
//! A reminder is due when an enrollment's flag for that kind is still unset
//! and its workshop starts inside the kind's window (see
//! [`ist::tomorrow_window`] and [`ist::soon_window`]). A sweep sends every
//! due reminder with bounded concurrency and sets the flag only after the
//! mailer accepts the message. Failures leave the flag unset so the next
//! sweep retries them.
//!
//! Sweeps are triggered three ways: the periodic task in
//! [`crate::services::reminder`], the admin routes (spawned, fire and
//! forget), and the unauthenticated cron routes (inline, summary returned).
//! The caller serializes sweeps of one kind; see [`crate::services::reminder`].

use futures::stream::{self, StreamExt};
use serde::Serialize;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::ist;
use crate::mail::templates::{self, WorkshopEmail};
use crate::mail::{MailError, Mailer, OutgoingEmail};
use crate::services::email_auth::name_from_email;

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("User-workshop registration not found")]
    RegistrationNotFound,
    #[error("failed to send email: {0}")]
    Mail(#[from] MailError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    OneDay,
    FifteenMin,
}

impl ReminderKind {
    fn flag_column(self) -> &'static str {
        match self {
            Self::OneDay => "reminder_1day_sent",
            Self::FifteenMin => "reminder_15min_sent",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::OneDay => "1-day",
            Self::FifteenMin => "15-minute",
        }
    }

    #[must_use]
    pub fn window(self, now: OffsetDateTime) -> (OffsetDateTime, OffsetDateTime) {
        match self {
            Self::OneDay => ist::tomorrow_window(now),
            Self::FifteenMin => ist::soon_window(now),
        }
    }

    fn render(self, ctx: &WorkshopEmail<'_>) -> OutgoingEmail {
        match self {
            Self::OneDay => templates::reminder_1day(ctx),
            Self::FifteenMin => templates::reminder_15min(ctx),
        }
    }
}

/// An enrollment joined with the user and workshop fields an email needs.
#[derive(Debug, Clone, Serialize)]
pub struct PendingReminder {
    pub user_id: Uuid,
    pub workshop_id: Uuid,
    pub user_email: String,
    pub user_name: Option<String>,
    pub workshop_title: String,
    pub description: Option<String>,
    pub meeting_link: Option<String>,
    #[serde(serialize_with = "ist::serde_ist::serialize")]
    pub scheduled_at: OffsetDateTime,
}

impl PendingReminder {
    fn render(&self, app_name: &str, render: impl FnOnce(&WorkshopEmail<'_>) -> OutgoingEmail) -> OutgoingEmail {
        let to_name = self
            .user_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| name_from_email(&self.user_email));
        let start_time = ist::format_ist(self.scheduled_at);
        render(&WorkshopEmail {
            app_name,
            to_email: &self.user_email,
            to_name: &to_name,
            title: &self.workshop_title,
            start_time: &start_time,
            description: self.description.as_deref(),
            meeting_link: self.meeting_link.as_deref(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    Sent,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendResult {
    pub user_email: String,
    pub workshop_title: String,
    pub status: SendStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendSummary {
    pub emails_sent: usize,
    pub failed_emails: usize,
    pub results: Vec<SendResult>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WelcomeSent {
    pub user_email: String,
    pub workshop_title: String,
    pub message_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRates {
    pub one_day_reminder_rate: f64,
    pub fifteen_min_reminder_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationStats {
    pub total_enrollments: i64,
    pub reminders_1day_sent: i64,
    pub reminders_15min_sent: i64,
    pub pending_1day_reminders: usize,
    pub pending_15min_reminders: usize,
    pub completion_rates: CompletionRates,
}

// =============================================================================
// QUERIES
// =============================================================================

const PENDING_SELECT: &str = r"SELECT uw.user_id, uw.workshop_id,
           u.email AS user_email, u.name AS user_name,
           w.title AS workshop_title, w.description, w.meeting_link, w.scheduled_at
    FROM user_workshop uw
    JOIN users u ON u.id = uw.user_id
    JOIN workshops w ON w.id = uw.workshop_id";

fn pending_from_row(row: &sqlx::postgres::PgRow) -> PendingReminder {
    PendingReminder {
        user_id: row.get("user_id"),
        workshop_id: row.get("workshop_id"),
        user_email: row.get("user_email"),
        user_name: row.get("user_name"),
        workshop_title: row.get("workshop_title"),
        description: row.get("description"),
        meeting_link: row.get("meeting_link"),
        scheduled_at: row.get("scheduled_at"),
    }
}

/// Enrollments whose `kind` reminder is due at `now`.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn pending_reminders(
    pool: &PgPool,
    kind: ReminderKind,
    now: OffsetDateTime,
) -> Result<Vec<PendingReminder>, NotificationError> {
    let (start, end) = kind.window(now);
    let rows = sqlx::query(&format!(
        r"{PENDING_SELECT}
          WHERE uw.{flag} = FALSE AND w.scheduled_at BETWEEN $1 AND $2
          ORDER BY w.scheduled_at ASC, uw.user_id ASC",
        flag = kind.flag_column()
    ))
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(pending_from_row).collect())
}

async fn mark_sent(pool: &PgPool, kind: ReminderKind, user_id: Uuid, workshop_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "UPDATE user_workshop SET {} = TRUE WHERE user_id = $1 AND workshop_id = $2",
        kind.flag_column()
    ))
    .bind(user_id)
    .bind(workshop_id)
    .execute(pool)
    .await?;
    Ok(())
}

// =============================================================================
// SENDING
// =============================================================================

/// Render and send one reminder. Returns the provider message id.
///
/// # Errors
///
/// Returns the mailer's error unchanged.
pub async fn deliver_reminder(
    mailer: &dyn Mailer,
    app_name: &str,
    kind: ReminderKind,
    reminder: &PendingReminder,
) -> Result<String, MailError> {
    mailer.send(reminder.render(app_name, |ctx| kind.render(ctx))).await
}

#[must_use]
pub fn summarize(kind: ReminderKind, results: Vec<SendResult>) -> SendSummary {
    let emails_sent = results.iter().filter(|r| r.status == SendStatus::Sent).count();
    let failed_emails = results.len() - emails_sent;
    let message = if results.is_empty() {
        format!("No {} reminders to send", kind.label())
    } else {
        format!("{} reminders processed: {emails_sent} sent, {failed_emails} failed", kind.label())
    };
    SendSummary { emails_sent, failed_emails, results, message }
}

/// Send every due `kind` reminder, at most `concurrency` at a time.
///
/// # Errors
///
/// Returns a database error if the pending query fails. Per-recipient
/// failures are reported in the summary instead.
pub async fn send_reminders(
    pool: &PgPool,
    mailer: &dyn Mailer,
    app_name: &str,
    kind: ReminderKind,
    now: OffsetDateTime,
    concurrency: usize,
) -> Result<SendSummary, NotificationError> {
    let pending = pending_reminders(pool, kind, now).await?;
    if pending.is_empty() {
        info!(kind = kind.label(), "no reminders due");
        return Ok(summarize(kind, Vec::new()));
    }

    let results: Vec<SendResult> = stream::iter(pending)
        .map(|reminder| async move {
            let outcome = match deliver_reminder(mailer, app_name, kind, &reminder).await {
                Ok(id) => match mark_sent(pool, kind, reminder.user_id, reminder.workshop_id).await {
                    Ok(()) => Ok(id),
                    Err(e) => {
                        error!(error = %e, user_id = %reminder.user_id, "reminder sent but flag update failed");
                        Err(format!("sent as {id} but reminder status was not recorded"))
                    }
                },
                Err(e) => {
                    error!(error = %e, to = %reminder.user_email, kind = kind.label(), "reminder send failed");
                    Err(e.to_string())
                }
            };

            let (status, message_id, error) = match outcome {
                Ok(id) => (SendStatus::Sent, Some(id), None),
                Err(e) => (SendStatus::Failed, None, Some(e)),
            };
            SendResult {
                user_email: reminder.user_email,
                workshop_title: reminder.workshop_title,
                status,
                message_id,
                error,
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let summary = summarize(kind, results);
    info!(kind = kind.label(), sent = summary.emails_sent, failed = summary.failed_emails, "reminder sweep finished");
    Ok(summary)
}

/// Send the enrollment welcome email for one registration.
///
/// # Errors
///
/// Returns [`NotificationError::RegistrationNotFound`] when the pair is not
/// enrolled, the mailer's error, or a database error.
pub async fn send_welcome(
    pool: &PgPool,
    mailer: &dyn Mailer,
    app_name: &str,
    user_id: Uuid,
    workshop_id: Uuid,
) -> Result<WelcomeSent, NotificationError> {
    let row = sqlx::query(&format!("{PENDING_SELECT} WHERE uw.user_id = $1 AND uw.workshop_id = $2"))
        .bind(user_id)
        .bind(workshop_id)
        .fetch_optional(pool)
        .await?
        .ok_or(NotificationError::RegistrationNotFound)?;
    let registration = pending_from_row(&row);

    let message_id = mailer
        .send(registration.render(app_name, templates::welcome))
        .await
        .inspect_err(|e| warn!(error = %e, to = %registration.user_email, "welcome email failed"))?;
    info!(%user_id, %workshop_id, "welcome email sent");

    Ok(WelcomeSent { user_email: registration.user_email, workshop_title: registration.workshop_title, message_id })
}

#[allow(clippy::cast_precision_loss)]
fn rate(sent: i64, total: i64) -> f64 {
    if total == 0 { 0.0 } else { sent as f64 / total as f64 * 100.0 }
}

/// Reminder delivery counts across all enrollments.
///
/// # Errors
///
/// Returns a database error if a query fails.
pub async fn stats(pool: &PgPool, now: OffsetDateTime) -> Result<NotificationStats, NotificationError> {
    let row = sqlx::query(
        r"SELECT COUNT(*) AS total,
                 COUNT(*) FILTER (WHERE reminder_1day_sent) AS one_day,
                 COUNT(*) FILTER (WHERE reminder_15min_sent) AS fifteen_min
          FROM user_workshop",
    )
    .fetch_one(pool)
    .await?;
    let total_enrollments: i64 = row.get("total");
    let reminders_1day_sent: i64 = row.get("one_day");
    let reminders_15min_sent: i64 = row.get("fifteen_min");

    let pending_1day_reminders = pending_reminders(pool, ReminderKind::OneDay, now).await?.len();
    let pending_15min_reminders = pending_reminders(pool, ReminderKind::FifteenMin, now).await?.len();

    Ok(NotificationStats {
        total_enrollments,
        reminders_1day_sent,
        reminders_15min_sent,
        pending_1day_reminders,
        pending_15min_reminders,
        completion_rates: CompletionRates {
            one_day_reminder_rate: rate(reminders_1day_sent, total_enrollments),
            fifteen_min_reminder_rate: rate(reminders_15min_sent, total_enrollments),
        },
    })
}

#[cfg(test)]
#[path = "notification_test.rs"]
mod tests;
