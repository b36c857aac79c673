//! Workshop reviews: one rating (and optional text) per user per workshop.
//!
//! Review text passes through the [`Moderator`] before it is stored. Only
//! hard errors block a write; warnings are logged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ist;
use crate::moderation::Moderator;
use crate::services::workshop::{self, WorkshopError};

const REVIEW_COLUMNS: &str = "id, user_id, workshop_id, rating, review_description, created_at, updated_at";

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("Workshop with ID {0} not found")]
    WorkshopNotFound(Uuid),
    #[error("You have already reviewed this workshop")]
    AlreadyReviewed,
    #[error("Review not found or access denied")]
    NotFound,
    #[error("No fields to update")]
    NoFields,
    #[error("Review validation failed: {}", .0.join(", "))]
    Moderation(Vec<String>),
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<WorkshopError> for ReviewError {
    fn from(err: WorkshopError) -> Self {
        match err {
            WorkshopError::NotFound(id) => Self::WorkshopNotFound(id),
            WorkshopError::Validation(msg) => Self::Validation(msg),
            WorkshopError::Database(e) => Self::Database(e),
        }
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: i64,
    pub user_id: Uuid,
    pub workshop_id: Uuid,
    pub rating: i16,
    pub review_description: Option<String>,
    #[serde(serialize_with = "ist::serde_ist::serialize")]
    pub created_at: OffsetDateTime,
    #[serde(serialize_with = "ist::serde_ist::option::serialize")]
    pub updated_at: Option<OffsetDateTime>,
}

fn review_from_row(row: &PgRow) -> Review {
    Review {
        id: row.get("id"),
        user_id: row.get("user_id"),
        workshop_id: row.get("workshop_id"),
        rating: row.get("rating"),
        review_description: row.get("review_description"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Reviewer {
    pub id: Uuid,
    pub name: Option<String>,
    pub profile_pic_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewWithUser {
    #[serde(flatten)]
    pub review: Review,
    pub user: Reviewer,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewList {
    pub reviews: Vec<ReviewWithUser>,
    pub total_count: i64,
    pub workshop_id: Option<Uuid>,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatingStats {
    pub workshop_id: Uuid,
    pub average_rating: f64,
    pub total_reviews: i64,
    pub rating_distribution: BTreeMap<u8, i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewCreate {
    pub workshop_id: Uuid,
    pub rating: i16,
    pub review_description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewUpdate {
    pub rating: Option<i16>,
    pub review_description: Option<String>,
}

// =============================================================================
// VALIDATION
// =============================================================================

fn validate_rating(rating: i16) -> Result<(), ReviewError> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(ReviewError::Validation("Rating must be between 1 and 5".to_owned()))
    }
}

/// Moderate non-blank review text. Returns the trimmed text to store.
pub(crate) fn moderate(moderator: &Moderator, text: Option<&str>) -> Result<Option<String>, ReviewError> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    let validation = moderator.validate_review(text);
    if !validation.is_valid {
        warn!(errors = ?validation.errors, "review rejected by moderation");
        return Err(ReviewError::Moderation(validation.errors));
    }
    if !validation.warnings.is_empty() {
        warn!(warnings = ?validation.warnings, "review accepted with warnings");
    }
    Ok(Some(text.to_owned()))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[must_use]
pub fn clamp_page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT), offset.unwrap_or(0).max(0))
}

// =============================================================================
// WRITES
// =============================================================================

/// # Errors
///
/// Returns [`ReviewError::Moderation`] or [`ReviewError::Validation`] for bad
/// input, [`ReviewError::WorkshopNotFound`], [`ReviewError::AlreadyReviewed`],
/// or a database error.
pub async fn create(
    pool: &PgPool,
    moderator: &Moderator,
    user_id: Uuid,
    input: &ReviewCreate,
) -> Result<Review, ReviewError> {
    validate_rating(input.rating)?;
    let description = moderate(moderator, input.review_description.as_deref())?;

    if workshop::find_workshop(pool, input.workshop_id).await?.is_none() {
        return Err(ReviewError::WorkshopNotFound(input.workshop_id));
    }

    let row = sqlx::query(&format!(
        r"INSERT INTO reviews (user_id, workshop_id, rating, review_description)
          VALUES ($1, $2, $3, $4)
          ON CONFLICT (user_id, workshop_id) DO NOTHING
          RETURNING {REVIEW_COLUMNS}"
    ))
    .bind(user_id)
    .bind(input.workshop_id)
    .bind(input.rating)
    .bind(description)
    .fetch_optional(pool)
    .await?
    .ok_or(ReviewError::AlreadyReviewed)?;

    let review = review_from_row(&row);
    info!(review_id = review.id, %user_id, workshop_id = %input.workshop_id, "review created");
    Ok(review)
}

/// Update the caller's own review.
///
/// # Errors
///
/// Returns [`ReviewError::NoFields`], a validation error,
/// [`ReviewError::NotFound`] when the review does not exist or belongs to
/// someone else, or a database error.
pub async fn update(
    pool: &PgPool,
    moderator: &Moderator,
    review_id: i64,
    user_id: Uuid,
    input: &ReviewUpdate,
) -> Result<Review, ReviewError> {
    if input.rating.is_none() && input.review_description.is_none() {
        return Err(ReviewError::NoFields);
    }
    if let Some(rating) = input.rating {
        validate_rating(rating)?;
    }
    let description = moderate(moderator, input.review_description.as_deref())?;

    let row = sqlx::query(&format!(
        r"UPDATE reviews
          SET rating = COALESCE($3, rating),
              review_description = CASE WHEN $4 THEN $5 ELSE review_description END,
              updated_at = now()
          WHERE id = $1 AND user_id = $2
          RETURNING {REVIEW_COLUMNS}"
    ))
    .bind(review_id)
    .bind(user_id)
    .bind(input.rating)
    .bind(input.review_description.is_some())
    .bind(description)
    .fetch_optional(pool)
    .await?
    .ok_or(ReviewError::NotFound)?;

    info!(review_id, %user_id, "review updated");
    Ok(review_from_row(&row))
}

/// Delete a review. Admins may delete any review, others only their own.
///
/// # Errors
///
/// Returns [`ReviewError::NotFound`] or a database error.
pub async fn delete(pool: &PgPool, review_id: i64, user_id: Uuid, is_admin: bool) -> Result<(), ReviewError> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = $1 AND ($3 OR user_id = $2)")
        .bind(review_id)
        .bind(user_id)
        .bind(is_admin)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ReviewError::NotFound);
    }
    info!(review_id, %user_id, is_admin, "review deleted");
    Ok(())
}

// =============================================================================
// READS
// =============================================================================

fn review_with_user(row: &PgRow) -> ReviewWithUser {
    ReviewWithUser {
        review: review_from_row(row),
        user: Reviewer {
            id: row.get("user_id"),
            name: row.get("reviewer_name"),
            profile_pic_url: row.get("reviewer_pic"),
        },
    }
}

async fn list_where(
    pool: &PgPool,
    column: &str,
    id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<(Vec<ReviewWithUser>, i64), ReviewError> {
    let rows = sqlx::query(&format!(
        r"SELECT r.id, r.user_id, r.workshop_id, r.rating, r.review_description, r.created_at, r.updated_at,
                 u.name AS reviewer_name, u.profile_pic_url AS reviewer_pic
          FROM reviews r
          JOIN users u ON u.id = r.user_id
          WHERE r.{column} = $1
          ORDER BY r.created_at DESC, r.id DESC
          LIMIT $2 OFFSET $3"
    ))
    .bind(id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query(&format!("SELECT COUNT(*) AS total FROM reviews WHERE {column} = $1"))
        .bind(id)
        .fetch_one(pool)
        .await?
        .get("total");

    Ok((rows.iter().map(review_with_user).collect(), total))
}

/// Newest-first reviews for a workshop plus the workshop's mean rating.
///
/// # Errors
///
/// Returns a database error if a query fails.
pub async fn list_by_workshop(
    pool: &PgPool,
    workshop_id: Uuid,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<ReviewList, ReviewError> {
    let (limit, offset) = clamp_page(limit, offset);
    let (reviews, total_count) = list_where(pool, "workshop_id", workshop_id, limit, offset).await?;

    let average: Option<f64> = sqlx::query("SELECT AVG(rating)::FLOAT8 AS average FROM reviews WHERE workshop_id = $1")
        .bind(workshop_id)
        .fetch_one(pool)
        .await?
        .get("average");

    Ok(ReviewList { reviews, total_count, workshop_id: Some(workshop_id), average_rating: average.map(round2) })
}

/// Newest-first reviews written by a user.
///
/// # Errors
///
/// Returns a database error if a query fails.
pub async fn list_by_user(
    pool: &PgPool,
    user_id: Uuid,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<ReviewList, ReviewError> {
    let (limit, offset) = clamp_page(limit, offset);
    let (reviews, total_count) = list_where(pool, "user_id", user_id, limit, offset).await?;
    Ok(ReviewList { reviews, total_count, workshop_id: None, average_rating: None })
}

pub(crate) fn build_rating_stats(workshop_id: Uuid, counts: &[(i16, i64)]) -> RatingStats {
    let mut rating_distribution: BTreeMap<u8, i64> = (1..=5).map(|r| (r, 0)).collect();
    let mut total_reviews = 0;
    let mut sum = 0;
    for &(rating, count) in counts {
        if let Ok(key) = u8::try_from(rating) {
            if let Some(slot) = rating_distribution.get_mut(&key) {
                *slot += count;
                total_reviews += count;
                sum += i64::from(rating) * count;
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let average_rating = if total_reviews == 0 { 0.0 } else { round2(sum as f64 / total_reviews as f64) };

    RatingStats { workshop_id, average_rating, total_reviews, rating_distribution }
}

/// Mean rating and per-star counts for a workshop.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn rating_stats(pool: &PgPool, workshop_id: Uuid) -> Result<RatingStats, ReviewError> {
    let rows = sqlx::query("SELECT rating, COUNT(*) AS count FROM reviews WHERE workshop_id = $1 GROUP BY rating")
        .bind(workshop_id)
        .fetch_all(pool)
        .await?;
    let counts: Vec<(i16, i64)> = rows.iter().map(|row| (row.get("rating"), row.get("count"))).collect();
    Ok(build_rating_stats(workshop_id, &counts))
}

#[cfg(test)]
#[path = "review_test.rs"]
mod tests;
