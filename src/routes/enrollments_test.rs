use axum::http::StatusCode;

use super::*;

#[test]
fn duplicate_registrations_are_conflicts() {
    for err in [EnrollmentError::AlreadyRegistered, EnrollmentError::GuestAlreadyRegistered] {
        assert_eq!(enrollment_error_to_api(err).status, StatusCode::CONFLICT);
    }
}

#[test]
fn account_email_on_guest_route_is_bad_request() {
    let err = enrollment_error_to_api(EnrollmentError::EmailBelongsToAccount);
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert!(err.message.starts_with("This email is already associated with a registered account."));
}

#[test]
fn missing_rows_are_not_found() {
    let cases = [
        (EnrollmentError::WorkshopNotFound(Uuid::nil()), format!("Workshop with ID {} not found", Uuid::nil())),
        (EnrollmentError::RelationNotFound, "User-workshop relationship not found".to_owned()),
        (EnrollmentError::RegistrationNotFound, "User registration not found for this workshop".to_owned()),
    ];
    for (err, message) in cases {
        let api = enrollment_error_to_api(err);
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.message, message);
    }
}

#[test]
fn empty_reminder_update_is_bad_request() {
    let err = enrollment_error_to_api(EnrollmentError::NoReminderFields);
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.message, "At least one reminder status must be provided");
}

#[test]
fn unregistered_payload_shape() {
    let body = Unregistered { user_id: Uuid::nil(), workshop_id: Uuid::nil(), status: "unregistered" };
    let json = serde_json::to_value(body).unwrap();
    assert_eq!(json["status"], "unregistered");
    assert_eq!(json["user_id"], Uuid::nil().to_string());
}
