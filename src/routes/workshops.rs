//! Workshop catalogue routes.
//!
//! Reads are public except the per-technology lookup, which needs a session.
//! Writes require an admin.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::{AdminUser, AuthUser};
use super::response::{ApiError, ApiResponse, ApiResult};
use crate::services::workshop::{
    self, DeletedWorkshop, ListFilters, WorkshopCreate, WorkshopError, WorkshopOut, WorkshopPage, WorkshopStats,
    WorkshopUpdate,
};
use crate::state::AppState;

pub(crate) fn workshop_error_to_api(err: WorkshopError) -> ApiError {
    match err {
        WorkshopError::NotFound(_) => ApiError::not_found(err.to_string()),
        WorkshopError::Validation(msg) => ApiError::bad_request(msg),
        WorkshopError::Database(e) => ApiError::internal(e),
    }
}

/// `POST /api/v1/workshops` (admin)
pub async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<WorkshopCreate>,
) -> Result<(StatusCode, Json<ApiResponse<WorkshopOut>>), ApiError> {
    let created = workshop::create_workshop(&state.pool, &body).await.map_err(workshop_error_to_api)?;
    tracing::info!(admin_id = %admin.id, workshop_id = %created.id, "workshop created");
    Ok((StatusCode::CREATED, ApiResponse::ok("Workshop created successfully", created)))
}

/// `GET /api/v1/workshops/stats`
pub async fn stats(State(state): State<AppState>) -> ApiResult<WorkshopStats> {
    let stats = workshop::workshop_stats(&state.pool).await.map_err(workshop_error_to_api)?;
    Ok(ApiResponse::ok("Workshop statistics fetched successfully", stats))
}

#[derive(Deserialize)]
pub struct UpcomingParams {
    pub limit: Option<i64>,
}

/// `GET /api/v1/workshops/upcoming`
pub async fn upcoming(
    State(state): State<AppState>,
    Query(params): Query<UpcomingParams>,
) -> ApiResult<Vec<WorkshopOut>> {
    let limit = params.limit.unwrap_or(workshop::DEFAULT_UPCOMING_LIMIT);
    let workshops = workshop::upcoming_workshops(&state.pool, limit).await.map_err(workshop_error_to_api)?;
    Ok(ApiResponse::ok(format!("Fetched {} upcoming workshops", workshops.len()), workshops))
}

/// `GET /api/v1/workshops/technology/{tech}`
pub async fn by_technology(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(tech): Path<String>,
) -> ApiResult<Vec<WorkshopOut>> {
    let workshops = workshop::by_technology(&state.pool, &tech).await.map_err(workshop_error_to_api)?;
    let message = format!("Found {} workshops for technology: {tech}", workshops.len());
    Ok(ApiResponse::ok(message, workshops))
}

/// `GET /api/v1/workshops`
pub async fn list(State(state): State<AppState>, Query(filters): Query<ListFilters>) -> ApiResult<WorkshopPage> {
    let page = workshop::list_workshops(&state.pool, &filters).await.map_err(workshop_error_to_api)?;
    Ok(ApiResponse::ok(format!("Fetched {} workshops", page.workshops.len()), page))
}

/// `GET /api/v1/workshops/{id}`
pub async fn get_one(State(state): State<AppState>, Path(workshop_id): Path<Uuid>) -> ApiResult<WorkshopOut> {
    let found = workshop::get_workshop(&state.pool, workshop_id).await.map_err(workshop_error_to_api)?;
    Ok(ApiResponse::ok("Workshop details fetched successfully", found))
}

/// `PATCH /api/v1/workshops/{id}` (admin)
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(workshop_id): Path<Uuid>,
    Json(body): Json<WorkshopUpdate>,
) -> ApiResult<WorkshopOut> {
    let updated = workshop::update_workshop(&state.pool, workshop_id, &body)
        .await
        .map_err(workshop_error_to_api)?;
    Ok(ApiResponse::ok("Workshop updated successfully", updated))
}

/// `DELETE /api/v1/workshops/{id}` (admin)
pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(workshop_id): Path<Uuid>,
) -> ApiResult<DeletedWorkshop> {
    let deleted = workshop::delete_workshop(&state.pool, workshop_id).await.map_err(workshop_error_to_api)?;
    Ok(ApiResponse::ok("Workshop deleted successfully", deleted))
}

#[cfg(test)]
#[path = "workshops_test.rs"]
mod tests;
