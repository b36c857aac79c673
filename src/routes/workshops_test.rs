use super::*;

#[test]
fn not_found_keeps_workshop_id_in_message() {
    let id = Uuid::nil();
    let err = workshop_error_to_api(WorkshopError::NotFound(id));
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.message, format!("Workshop with ID {id} not found"));
}

#[test]
fn validation_message_passes_through() {
    let err = workshop_error_to_api(WorkshopError::Validation("title must be at least 3 characters".into()));
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.message, "title must be at least 3 characters");
}

#[test]
fn database_error_is_internal() {
    let err = workshop_error_to_api(WorkshopError::Database(sqlx::Error::PoolTimedOut));
    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
}
