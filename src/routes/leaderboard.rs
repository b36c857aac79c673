//! Points leaderboard routes.

use axum::extract::{Path, Query, State};
use uuid::Uuid;

use super::auth::RegisteredUser;
use super::response::{ApiError, ApiResponse, ApiResult};
use crate::services::auth::UserRole;
use crate::services::leaderboard::{self, Leaderboard, LeaderboardError, LeaderboardQuery, TopPerformers, UserRank};
use crate::state::AppState;

pub(crate) fn leaderboard_error_to_api(err: LeaderboardError) -> ApiError {
    match err {
        LeaderboardError::Validation(msg) => ApiError::bad_request(msg),
        LeaderboardError::NotRanked => ApiError::not_found(err.to_string()),
        LeaderboardError::Database(e) => ApiError::internal(e),
    }
}

fn rank_message(rank: &UserRank) -> String {
    format!("User rank: #{} with {} points", rank.user_rank.rank, rank.user_rank.points)
}

/// `GET /api/v1/leaderboard`
pub async fn board(
    State(state): State<AppState>,
    RegisteredUser(user): RegisteredUser,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Leaderboard> {
    let filters = query.validate().map_err(leaderboard_error_to_api)?;
    let page = leaderboard::leaderboard(&state.pool, user.id, filters)
        .await
        .map_err(leaderboard_error_to_api)?;
    let message = if page.entries.is_empty() {
        "No users found for leaderboard".to_owned()
    } else {
        format!("Leaderboard fetched successfully ({} users)", page.entries.len())
    };
    Ok(ApiResponse::ok(message, page))
}

/// `GET /api/v1/leaderboard/top`
pub async fn top(State(state): State<AppState>) -> ApiResult<TopPerformers> {
    let top = leaderboard::top_performers(&state.pool).await.map_err(leaderboard_error_to_api)?;
    let message = if top.top_three.is_empty() { "No top performers found" } else { "Top performers fetched successfully" };
    Ok(ApiResponse::ok(message, top))
}

/// `GET /api/v1/leaderboard/me`
pub async fn my_rank(State(state): State<AppState>, RegisteredUser(user): RegisteredUser) -> ApiResult<UserRank> {
    let rank = leaderboard::user_rank(&state.pool, user.id).await.map_err(leaderboard_error_to_api)?;
    Ok(ApiResponse::ok(rank_message(&rank), rank))
}

/// `GET /api/v1/leaderboard/user/{id}`: self or admin.
pub async fn user_rank(
    State(state): State<AppState>,
    RegisteredUser(user): RegisteredUser,
    Path(target_id): Path<Uuid>,
) -> ApiResult<UserRank> {
    if user.id != target_id && user.role != UserRole::Admin {
        return Err(ApiError::forbidden("You can only view your own rank"));
    }
    let rank = leaderboard::user_rank(&state.pool, target_id).await.map_err(leaderboard_error_to_api)?;
    Ok(ApiResponse::ok(rank_message(&rank), rank))
}

#[cfg(test)]
#[path = "leaderboard_test.rs"]
mod tests;
