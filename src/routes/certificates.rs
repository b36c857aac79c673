//! Read-only certificate routes.

use axum::extract::{Path, State};

use super::auth::AuthUser;
use super::response::{ApiError, ApiResponse, ApiResult};
use crate::services::certificate::{self, Certificate, CertificateError, CertificateList};
use crate::state::AppState;

pub(crate) fn certificate_error_to_api(err: CertificateError) -> ApiError {
    match err {
        CertificateError::NotFound => ApiError::not_found(err.to_string()),
        CertificateError::Database(e) => ApiError::internal(e),
    }
}

/// `GET /api/v1/certificates/me`
pub async fn mine(State(state): State<AppState>, auth: AuthUser) -> ApiResult<CertificateList> {
    let list = certificate::for_user(&state.pool, auth.user.id).await.map_err(certificate_error_to_api)?;
    Ok(ApiResponse::ok(list.message(), list))
}

/// `GET /api/v1/certificates/{id}`
pub async fn get_one(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(certificate_id): Path<i64>,
) -> ApiResult<Certificate> {
    let found = certificate::get_owned(&state.pool, certificate_id, auth.user.id)
        .await
        .map_err(certificate_error_to_api)?;
    Ok(ApiResponse::ok("Certificate retrieved successfully", found))
}

#[cfg(test)]
#[path = "certificates_test.rs"]
mod tests;
