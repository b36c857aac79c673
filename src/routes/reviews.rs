//! Workshop review routes. Review text is screened by the shared moderator.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AuthUser;
use super::response::{ApiError, ApiResponse, ApiResult};
use crate::services::auth::UserRole;
use crate::services::review::{self, RatingStats, Review, ReviewCreate, ReviewError, ReviewList, ReviewUpdate};
use crate::state::AppState;

pub(crate) fn review_error_to_api(err: ReviewError) -> ApiError {
    match err {
        ReviewError::WorkshopNotFound(_) | ReviewError::NotFound => ApiError::not_found(err.to_string()),
        ReviewError::AlreadyReviewed => ApiError::conflict(err.to_string()),
        ReviewError::NoFields | ReviewError::Moderation(_) => ApiError::bad_request(err.to_string()),
        ReviewError::Validation(msg) => ApiError::bad_request(msg),
        ReviewError::Database(e) => ApiError::internal(e),
    }
}

#[derive(Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `POST /api/v1/reviews`
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ReviewCreate>,
) -> Result<(StatusCode, Json<ApiResponse<Review>>), ApiError> {
    let created = review::create(&state.pool, &state.moderator, auth.user.id, &body)
        .await
        .map_err(review_error_to_api)?;
    Ok((StatusCode::CREATED, ApiResponse::ok("Review created successfully", created)))
}

/// `PATCH /api/v1/reviews/{id}`
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(review_id): Path<i64>,
    Json(body): Json<ReviewUpdate>,
) -> ApiResult<Review> {
    let updated = review::update(&state.pool, &state.moderator, review_id, auth.user.id, &body)
        .await
        .map_err(review_error_to_api)?;
    Ok(ApiResponse::ok("Review updated successfully", updated))
}

/// `DELETE /api/v1/reviews/{id}`: owner or admin.
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(review_id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let is_admin = auth.user.role == UserRole::Admin;
    review::delete(&state.pool, review_id, auth.user.id, is_admin)
        .await
        .map_err(review_error_to_api)?;
    Ok(ApiResponse::ok("Review deleted successfully", serde_json::json!({ "deleted_id": review_id })))
}

/// `GET /api/v1/reviews/workshop/{id}`
pub async fn for_workshop(
    State(state): State<AppState>,
    Path(workshop_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> ApiResult<ReviewList> {
    let list = review::list_by_workshop(&state.pool, workshop_id, params.limit, params.offset)
        .await
        .map_err(review_error_to_api)?;
    Ok(ApiResponse::ok("Reviews retrieved successfully", list))
}

/// `GET /api/v1/reviews/workshop/{id}/stats`
pub async fn workshop_stats(State(state): State<AppState>, Path(workshop_id): Path<Uuid>) -> ApiResult<RatingStats> {
    let stats = review::rating_stats(&state.pool, workshop_id).await.map_err(review_error_to_api)?;
    let message = if stats.total_reviews == 0 { "No reviews found" } else { "Rating statistics retrieved" };
    Ok(ApiResponse::ok(message, stats))
}

/// `GET /api/v1/reviews/me`
pub async fn mine(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PageParams>,
) -> ApiResult<ReviewList> {
    let list = review::list_by_user(&state.pool, auth.user.id, params.limit, params.offset)
        .await
        .map_err(review_error_to_api)?;
    Ok(ApiResponse::ok("User reviews retrieved successfully", list))
}

#[cfg(test)]
#[path = "reviews_test.rs"]
mod tests;
