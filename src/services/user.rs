//! User profile service: updates, profile completion rewards, points, and
//! admin listing.
//!
//! DESIGN
//! ======
//! Profile completion is derived from a fixed list of required fields. The
//! first time every field is filled the row is flagged `profile_complete` and
//! credited `PROFILE_COMPLETION_POINTS`. The flag flip and the credit happen
//! in one conditional `UPDATE`, so concurrent checks cannot award twice.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::services::auth::{USER_COLUMNS, User, get_user_by_id, user_from_row};

pub const PROFILE_COMPLETION_POINTS: i32 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;
/// Keeps `offset + limit` inside `i64`.
pub const MAX_PAGE_OFFSET: i64 = i64::MAX - MAX_PAGE_LIMIT;
const MAX_NAME_LEN: usize = 100;
const MIN_SEARCH_LEN: usize = 2;

/// Required profile fields and their human-readable descriptions.
const REQUIRED_FIELDS: &[(&str, &str)] = &[("name", "Full name"), ("profile_pic_url", "Profile picture")];

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,
    #[error("No fields to update")]
    NoFields,
    #[error("{0}")]
    Validation(String),
    #[error("Points amount must be positive")]
    InvalidPoints,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<crate::services::auth::AuthError> for UserError {
    fn from(err: crate::services::auth::AuthError) -> Self {
        match err {
            crate::services::auth::AuthError::NotFound => Self::NotFound,
            crate::services::auth::AuthError::Database(e) => Self::Database(e),
        }
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub profile_pic_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MissingField {
    pub field: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileStatus {
    pub is_complete: bool,
    pub missing_fields: Vec<MissingField>,
    pub completed_fields: Vec<String>,
    pub completion_percentage: u8,
    pub newly_completed: bool,
    pub points_awarded: i32,
}

impl ProfileStatus {
    #[must_use]
    pub fn message(&self) -> String {
        if self.newly_completed {
            format!("Profile completed! {PROFILE_COMPLETION_POINTS} points awarded!")
        } else if self.is_complete {
            "Profile already complete".to_owned()
        } else {
            format!("Profile {}% complete", self.completion_percentage)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserWithStatus {
    pub user: User,
    pub profile_status: ProfileStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct PointsResult {
    pub user: User,
    pub points_added: i32,
    pub new_total: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSearchResult {
    pub users: Vec<User>,
    pub total_count: usize,
    pub search_query: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total_count: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_next: bool,
}

// =============================================================================
// PROFILE COMPLETION
// =============================================================================

fn is_filled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Evaluate required fields without touching the database.
#[must_use]
pub fn evaluate_profile(user: &User) -> ProfileStatus {
    let mut missing_fields = Vec::new();
    let mut completed_fields = Vec::new();
    for (field, description) in REQUIRED_FIELDS {
        let value = match *field {
            "name" => user.name.as_deref(),
            _ => user.profile_pic_url.as_deref(),
        };
        if is_filled(value) {
            completed_fields.push((*field).to_owned());
        } else {
            missing_fields.push(MissingField { field: (*field).to_owned(), description: (*description).to_owned() });
        }
    }

    let total = REQUIRED_FIELDS.len();
    let completion_percentage = u8::try_from(completed_fields.len() * 100 / total).unwrap_or(100);

    ProfileStatus {
        is_complete: missing_fields.is_empty(),
        missing_fields,
        completed_fields,
        completion_percentage,
        newly_completed: false,
        points_awarded: 0,
    }
}

/// Compute completion status, awarding the completion bonus on first completion.
///
/// # Errors
///
/// Returns [`UserError::NotFound`] for unknown ids, or a database error.
pub async fn profile_status(pool: &PgPool, user_id: Uuid) -> Result<ProfileStatus, UserError> {
    let user = get_user_by_id(pool, user_id).await?.ok_or(UserError::NotFound)?;
    let mut status = evaluate_profile(&user);

    if status.is_complete && !user.profile_complete {
        let awarded = sqlx::query(
            r"UPDATE users
              SET profile_complete = TRUE, points = points + $2
              WHERE id = $1 AND profile_complete = FALSE
              RETURNING id",
        )
        .bind(user_id)
        .bind(PROFILE_COMPLETION_POINTS)
        .fetch_optional(pool)
        .await?;

        if awarded.is_some() {
            status.newly_completed = true;
            status.points_awarded = PROFILE_COMPLETION_POINTS;
            tracing::info!(%user_id, points = PROFILE_COMPLETION_POINTS, "profile completed, points awarded");
        }
    }

    Ok(status)
}

// =============================================================================
// UPDATES
// =============================================================================

fn validate_update(update: &UserUpdate) -> Result<(), UserError> {
    if update.name.is_none() && update.profile_pic_url.is_none() {
        return Err(UserError::NoFields);
    }
    if let Some(name) = &update.name {
        if name.trim().chars().count() > MAX_NAME_LEN {
            return Err(UserError::Validation(format!("Name must be at most {MAX_NAME_LEN} characters")));
        }
    }
    Ok(())
}

/// Update name and/or picture, then re-run the completion check.
///
/// # Errors
///
/// Returns [`UserError::NoFields`] for an empty update, [`UserError::NotFound`]
/// for unknown ids, or a database error.
pub async fn update_user(pool: &PgPool, user_id: Uuid, update: &UserUpdate) -> Result<UserWithStatus, UserError> {
    validate_update(update)?;

    let updated = sqlx::query(
        r"UPDATE users
          SET name = CASE WHEN $2 THEN $3 ELSE name END,
              profile_pic_url = CASE WHEN $4 THEN $5 ELSE profile_pic_url END
          WHERE id = $1
          RETURNING id",
    )
    .bind(user_id)
    .bind(update.name.is_some())
    .bind(update.name.as_deref().map(str::trim))
    .bind(update.profile_pic_url.is_some())
    .bind(update.profile_pic_url.as_deref().map(str::trim))
    .fetch_optional(pool)
    .await?;
    if updated.is_none() {
        return Err(UserError::NotFound);
    }
    tracing::info!(%user_id, name = update.name.is_some(), picture = update.profile_pic_url.is_some(), "user updated");

    let profile_status = profile_status(pool, user_id).await?;
    let user = get_user_by_id(pool, user_id).await?.ok_or(UserError::NotFound)?;
    Ok(UserWithStatus { user, profile_status })
}

/// Add `amount` points to a user.
///
/// # Errors
///
/// Returns [`UserError::InvalidPoints`] when `amount <= 0`,
/// [`UserError::NotFound`] for unknown ids, or a database error.
pub async fn increment_points(pool: &PgPool, user_id: Uuid, amount: i32) -> Result<PointsResult, UserError> {
    if amount <= 0 {
        return Err(UserError::InvalidPoints);
    }

    let row = sqlx::query(&format!("UPDATE users SET points = points + $2 WHERE id = $1 RETURNING {USER_COLUMNS}"))
        .bind(user_id)
        .bind(amount)
        .fetch_optional(pool)
        .await?
        .ok_or(UserError::NotFound)?;
    let user = user_from_row(&row);
    tracing::info!(%user_id, amount, total = user.points, "points incremented");

    Ok(PointsResult { new_total: user.points, points_added: amount, user })
}

/// Deactivate a user by clearing profile data. Enrollments are kept.
///
/// # Errors
///
/// Returns [`UserError::NotFound`] for unknown ids, or a database error.
pub async fn soft_delete(pool: &PgPool, user_id: Uuid) -> Result<User, UserError> {
    let row = sqlx::query(&format!(
        r"UPDATE users
          SET profile_complete = FALSE, name = NULL, profile_pic_url = NULL
          WHERE id = $1
          RETURNING {USER_COLUMNS}"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(UserError::NotFound)?;
    let user = user_from_row(&row);
    tracing::info!(%user_id, "user soft deleted");
    Ok(user)
}

// =============================================================================
// LISTING
// =============================================================================

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
#[must_use]
pub fn like_pattern(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len() + 2);
    escaped.push('%');
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Case-insensitive substring search over completed profiles.
///
/// # Errors
///
/// Returns [`UserError::Validation`] for queries shorter than two characters,
/// or a database error.
pub async fn search_by_name(pool: &PgPool, query: &str, limit: i64) -> Result<UserSearchResult, UserError> {
    let clean = query.trim();
    if clean.chars().count() < MIN_SEARCH_LEN {
        return Err(UserError::Validation(format!(
            "Search query must be at least {MIN_SEARCH_LEN} characters long"
        )));
    }
    let limit = limit.clamp(1, MAX_PAGE_LIMIT);

    let rows = sqlx::query(&format!(
        r"SELECT {USER_COLUMNS} FROM users
          WHERE profile_complete = TRUE AND name ILIKE $1
          ORDER BY name ASC
          LIMIT $2"
    ))
    .bind(like_pattern(clean))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let users: Vec<User> = rows.iter().map(user_from_row).collect();
    Ok(UserSearchResult { total_count: users.len(), users, search_query: clean.to_owned() })
}

pub(crate) fn validate_page(limit: i64, offset: i64) -> Result<(), UserError> {
    if offset < 0 {
        return Err(UserError::Validation("Offset must be non-negative".to_owned()));
    }
    if offset > MAX_PAGE_OFFSET {
        return Err(UserError::Validation(format!("Offset must be at most {MAX_PAGE_OFFSET}")));
    }
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(UserError::Validation(format!("Limit must be between 1 and {MAX_PAGE_LIMIT}")));
    }
    Ok(())
}

/// One page of users, oldest first.
///
/// # Errors
///
/// Returns [`UserError::Validation`] for out-of-range paging, or a database error.
pub async fn list_paginated(pool: &PgPool, limit: i64, offset: i64) -> Result<UserPage, UserError> {
    validate_page(limit, offset)?;

    let rows = sqlx::query(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    let total_count: i64 = sqlx::query("SELECT COUNT(*) AS total FROM users")
        .fetch_one(pool)
        .await?
        .get("total");

    Ok(UserPage {
        users: rows.iter().map(user_from_row).collect(),
        total_count,
        limit,
        offset,
        has_next: offset + limit < total_count,
    })
}

#[cfg(test)]
#[path = "user_test.rs"]
mod tests;
