use axum::http::StatusCode;

use super::*;

#[test]
fn foreign_or_unknown_certificate_is_not_found() {
    let err = certificate_error_to_api(CertificateError::NotFound);
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.message, "Certificate not found or access denied");
}

#[test]
fn database_error_is_internal() {
    let err = certificate_error_to_api(CertificateError::Database(sqlx::Error::PoolClosed));
    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
}
