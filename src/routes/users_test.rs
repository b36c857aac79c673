use axum::http::StatusCode;

use super::*;

#[test]
fn not_found_maps_to_404() {
    let err = user_error_to_api(UserError::NotFound);
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.message, "User not found");
}

#[test]
fn input_errors_map_to_400() {
    for err in [UserError::NoFields, UserError::InvalidPoints, UserError::Validation("Name too long".into())] {
        assert_eq!(user_error_to_api(err).status, StatusCode::BAD_REQUEST);
    }
}

#[test]
fn database_errors_are_hidden() {
    let err = user_error_to_api(UserError::Database(sqlx::Error::RowNotFound));
    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.message, "Internal server error");
}

#[test]
fn search_query_defaults_to_empty() {
    let params: SearchParams = serde_json::from_value(serde_json::json!({})).unwrap();
    assert_eq!(params.q, "");
    assert!(params.limit.is_none());
}
