use crate::mail::MailError;
use crate::state::test_helpers;

use super::*;

#[test]
fn missing_registration_is_not_found() {
    let err = notification_error_to_api(NotificationError::RegistrationNotFound);
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.message, "User-workshop registration not found");
}

#[test]
fn mail_failure_names_the_cause() {
    let err = notification_error_to_api(NotificationError::Mail(MailError::Disabled));
    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.message, "Failed to send welcome email: email delivery is not configured");
}

#[tokio::test]
async fn trigger_reports_kind_and_admin() {
    let state = test_helpers::test_app_state();
    let triggered = trigger(state, "admin@example.com".into(), ReminderKind::FifteenMin);
    let json = serde_json::to_value(&triggered).unwrap();
    assert_eq!(json["type"], "15min_reminders");
    assert_eq!(json["triggered_by"], "admin@example.com");
}

#[test]
fn cron_run_flattens_summary() {
    let run = CronRun {
        summary: SendSummary {
            emails_sent: 0,
            failed_emails: 0,
            results: vec![],
            message: "No 1-day reminders to send".into(),
        },
        timestamp: "2027-03-01 10:00:00 IST".into(),
    };
    let json = serde_json::to_value(&run).unwrap();
    assert_eq!(json["emails_sent"], 0);
    assert_eq!(json["message"], "No 1-day reminders to send");
    assert!(json.get("summary").is_none());
}
