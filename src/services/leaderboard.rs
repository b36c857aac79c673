//! Points leaderboard over users with complete profiles.
//!
//! Rank is competition-style: 1 + the number of ranked users with strictly
//! more points, so ties share a rank. Per-user activity counts are computed
//! with correlated subqueries in the same statement as the page.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;
/// Keeps `offset + limit` inside `i64`.
pub const MAX_OFFSET: i64 = i64::MAX - MAX_LIMIT;
const TOP_PERFORMERS: i64 = 3;
const ANONYMOUS: &str = "Anonymous";

const ENTRY_SELECT: &str = r"SELECT u.id, u.name, u.points, u.profile_pic_url,
           (SELECT COUNT(*) FROM assignments a WHERE a.user_id = u.id AND a.status = 'submitted') AS assignments_completed,
           (SELECT COUNT(*) FROM user_workshop uw WHERE uw.user_id = u.id) AS workshops_attended,
           (SELECT COUNT(*) FROM certificates c WHERE c.user_id = u.id) AS certificates_earned
    FROM users u";

#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    #[error("{0}")]
    Validation(String),
    #[error("User not found in leaderboard or profile incomplete")]
    NotRanked,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =============================================================================
// TYPES
// =============================================================================

/// Accepted for forward compatibility; every period currently ranks by
/// all-time points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    #[default]
    AllTime,
    ThisMonth,
    ThisWeek,
}

impl TimePeriod {
    /// # Errors
    ///
    /// Returns [`LeaderboardError::Validation`] for unknown periods.
    pub fn parse(raw: &str) -> Result<Self, LeaderboardError> {
        match raw {
            "all_time" => Ok(Self::AllTime),
            "this_month" => Ok(Self::ThisMonth),
            "this_week" => Ok(Self::ThisWeek),
            _ => Err(LeaderboardError::Validation(
                "Invalid time_period. Must be one of: all_time, this_month, this_week".to_owned(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub min_points: Option<i32>,
    pub time_period: Option<String>,
}

/// Validated form of [`LeaderboardQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardFilters {
    pub limit: i64,
    pub offset: i64,
    pub min_points: i32,
    pub time_period: TimePeriod,
}

impl LeaderboardQuery {
    /// # Errors
    ///
    /// Returns [`LeaderboardError::Validation`] for out-of-range values or an
    /// unknown time period.
    pub fn validate(&self) -> Result<LeaderboardFilters, LeaderboardError> {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(LeaderboardError::Validation(format!("Limit must be between 1 and {MAX_LIMIT}")));
        }
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(LeaderboardError::Validation("Offset must be non-negative".to_owned()));
        }
        if offset > MAX_OFFSET {
            return Err(LeaderboardError::Validation(format!("Offset must be at most {MAX_OFFSET}")));
        }
        let min_points = self.min_points.unwrap_or(0);
        if min_points < 0 {
            return Err(LeaderboardError::Validation("min_points must be non-negative".to_owned()));
        }
        let time_period = self.time_period.as_deref().map(TimePeriod::parse).transpose()?.unwrap_or_default();
        Ok(LeaderboardFilters { limit, offset, min_points, time_period })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: Uuid,
    pub name: String,
    pub points: i32,
    pub profile_pic_url: Option<String>,
    pub assignments_completed: i64,
    pub workshops_attended: i64,
    pub certificates_earned: i64,
}

fn entry_from_row(row: &PgRow, rank: i64) -> LeaderboardEntry {
    let name: Option<String> = row.get("name");
    LeaderboardEntry {
        rank,
        user_id: row.get("id"),
        name: name.unwrap_or_else(|| ANONYMOUS.to_owned()),
        points: row.get("points"),
        profile_pic_url: row.get("profile_pic_url"),
        assignments_completed: row.get("assignments_completed"),
        workshops_attended: row.get("workshops_attended"),
        certificates_earned: row.get("certificates_earned"),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
    pub total_users: i64,
    pub current_user_rank: Option<i64>,
    pub current_user_points: Option<i32>,
    pub page: i64,
    pub limit: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopPerformers {
    pub top_three: Vec<LeaderboardEntry>,
    pub total_participants: i64,
    pub highest_points: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRank {
    pub user_rank: LeaderboardEntry,
    pub rank_change: Option<i64>,
    pub points_this_week: i32,
    pub points_this_month: i32,
}

// =============================================================================
// QUERIES
// =============================================================================

/// Rank and points of a profile-complete user, or `None` when unranked.
async fn rank_of(pool: &PgPool, user_id: Uuid) -> Result<Option<(i64, i32)>, LeaderboardError> {
    let row = sqlx::query(
        r"SELECT u.points,
                 1 + (SELECT COUNT(*) FROM users o WHERE o.profile_complete = TRUE AND o.points > u.points) AS rank
          FROM users u
          WHERE u.id = $1 AND u.profile_complete = TRUE",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| (r.get("rank"), r.get("points"))))
}

/// One page of the leaderboard plus the caller's own standing.
///
/// # Errors
///
/// Returns a database error if a query fails.
pub async fn leaderboard(
    pool: &PgPool,
    current_user_id: Uuid,
    filters: LeaderboardFilters,
) -> Result<Leaderboard, LeaderboardError> {
    let rows = sqlx::query(&format!(
        r"{ENTRY_SELECT}
          WHERE u.profile_complete = TRUE AND u.points >= $1
          ORDER BY u.points DESC, u.created_at ASC, u.id ASC
          LIMIT $2 OFFSET $3"
    ))
    .bind(filters.min_points)
    .bind(filters.limit)
    .bind(filters.offset)
    .fetch_all(pool)
    .await?;

    let total_users: i64 =
        sqlx::query("SELECT COUNT(*) AS total FROM users WHERE profile_complete = TRUE AND points >= $1")
            .bind(filters.min_points)
            .fetch_one(pool)
            .await?
            .get("total");

    let entries: Vec<LeaderboardEntry> = rows
        .iter()
        .zip(1..)
        .map(|(row, i)| entry_from_row(row, filters.offset + i))
        .collect();
    let current = rank_of(pool, current_user_id).await?;

    info!(entries = entries.len(), rank = ?current.map(|(r, _)| r), "leaderboard fetched");
    Ok(Leaderboard {
        entries,
        total_users,
        current_user_rank: current.map(|(rank, _)| rank),
        current_user_points: current.map(|(_, points)| points),
        page: filters.offset / filters.limit + 1,
        limit: filters.limit,
        has_next: filters.offset + filters.limit < total_users,
        has_previous: filters.offset > 0,
    })
}

/// The three highest scorers.
///
/// # Errors
///
/// Returns a database error if a query fails.
pub async fn top_performers(pool: &PgPool) -> Result<TopPerformers, LeaderboardError> {
    let rows = sqlx::query(&format!(
        r"{ENTRY_SELECT}
          WHERE u.profile_complete = TRUE
          ORDER BY u.points DESC, u.created_at ASC, u.id ASC
          LIMIT $1"
    ))
    .bind(TOP_PERFORMERS)
    .fetch_all(pool)
    .await?;

    let total_participants: i64 =
        sqlx::query("SELECT COUNT(*) AS total FROM users WHERE profile_complete = TRUE AND points > 0")
            .fetch_one(pool)
            .await?
            .get("total");

    let top_three: Vec<LeaderboardEntry> = rows.iter().zip(1..).map(|(row, i)| entry_from_row(row, i)).collect();
    let highest_points = top_three.first().map_or(0, |e| e.points);
    Ok(TopPerformers { top_three, total_participants, highest_points })
}

/// A single user's leaderboard entry.
///
/// # Errors
///
/// Returns [`LeaderboardError::NotRanked`] for unknown users and incomplete
/// profiles, or a database error.
pub async fn user_rank(pool: &PgPool, user_id: Uuid) -> Result<UserRank, LeaderboardError> {
    let (rank, _) = rank_of(pool, user_id).await?.ok_or(LeaderboardError::NotRanked)?;

    let row = sqlx::query(&format!("{ENTRY_SELECT} WHERE u.id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(LeaderboardError::NotRanked)?;

    Ok(UserRank { user_rank: entry_from_row(&row, rank), rank_change: None, points_this_week: 0, points_this_month: 0 })
}

#[cfg(test)]
#[path = "leaderboard_test.rs"]
mod tests;
