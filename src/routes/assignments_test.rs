use axum::http::StatusCode;

use super::*;

#[test]
fn missing_assignment_is_not_found() {
    let err = assignment_error_to_api(AssignmentError::NotEnrolled);
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.message, "No assignment found for this workshop");

    assert_eq!(assignment_error_to_api(AssignmentError::NotFound).message, "Assignment not found");
}

#[test]
fn validation_is_bad_request() {
    let err = assignment_error_to_api(AssignmentError::Validation(
        "Feedback is required when reviewing or rejecting assignments".into(),
    ));
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
}

#[test]
fn filters_parse_from_query_string() {
    let Query(filters): Query<AssignmentFilters> =
        Query::try_from_uri(&"/assignments?status=under_review&limit=5".parse().unwrap()).unwrap();
    assert_eq!(filters.status, Some(assignment::AssignmentStatus::UnderReview));
    assert_eq!(filters.limit, Some(5));
    assert!(filters.workshop_id.is_none());
}
