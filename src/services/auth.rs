//! User identity service: the `users` row model, role parsing, and the
//! find-or-create step that runs after a successful login.
//!
//! DESIGN
//! ======
//! Guests are ordinary `users` rows with role `guest`, created by the guest
//! enrollment route from nothing more than a name and an email. When the same
//! address later authenticates, the guest row is upgraded in place so its
//! enrollments carry over.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::services::session::UserMetadata;

/// Column list shared by every query that materializes a [`User`].
pub(crate) const USER_COLUMNS: &str =
    "id, email, name, auth_id, profile_pic_url, points, role, profile_complete, created_at";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Guest,
    User,
    Admin,
}

impl UserRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "guest" => Some(Self::Guest),
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub auth_id: Option<Uuid>,
    pub profile_pic_url: Option<String>,
    pub points: i32,
    pub role: UserRole,
    pub profile_complete: bool,
    #[serde(serialize_with = "crate::ist::serde_ist::serialize")]
    pub created_at: OffsetDateTime,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

pub(crate) fn user_from_row(row: &PgRow) -> User {
    let role: String = row.get("role");
    User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        auth_id: row.get("auth_id"),
        profile_pic_url: row.get("profile_pic_url"),
        points: row.get("points"),
        role: UserRole::from_str(&role).unwrap_or(UserRole::User),
        profile_complete: row.get("profile_complete"),
        created_at: row.get("created_at"),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("user not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// QUERIES
// =============================================================================

/// Look up a user by (already normalized) email.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AuthError> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(user_from_row))
}

/// Look up a user by id.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn get_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, AuthError> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(user_from_row))
}

/// Insert a guest row for an email that has never signed in.
///
/// # Errors
///
/// Returns a database error if the insert fails (including a unique
/// violation when the email already exists).
pub async fn create_guest(pool: &PgPool, email: &str, name: &str) -> Result<User, AuthError> {
    let row = sqlx::query(&format!(
        "INSERT INTO users (email, name, role, points) VALUES ($1, $2, 'guest', 0) RETURNING {USER_COLUMNS}"
    ))
    .bind(email)
    .bind(name.trim())
    .fetch_one(pool)
    .await?;
    let user = user_from_row(&row);
    tracing::info!(user_id = %user.id, "guest user created");
    Ok(user)
}

/// Insert a guest unless `email` is already taken. `None` means another row
/// owns the email, possibly one created by a concurrent request.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_guest_if_absent(pool: &PgPool, email: &str, name: &str) -> Result<Option<User>, AuthError> {
    let row = sqlx::query(&format!(
        r"INSERT INTO users (email, name, role, points) VALUES ($1, $2, 'guest', 0)
          ON CONFLICT (email) DO NOTHING
          RETURNING {USER_COLUMNS}"
    ))
    .bind(email)
    .bind(name.trim())
    .fetch_optional(pool)
    .await?;
    let user = row.as_ref().map(user_from_row);
    if let Some(user) = &user {
        tracing::info!(user_id = %user.id, "guest user created");
    }
    Ok(user)
}

/// Resolve the account for an authenticated identity.
///
/// - Existing guest: upgraded to `user`, `auth_id` set, name and picture
///   taken from `metadata` when it carries non-blank values.
/// - Existing non-guest: returned unchanged.
/// - Unknown email: a new `user` row with zero points.
///
/// # Errors
///
/// Returns a database error if any query fails.
pub async fn get_or_create_user(
    pool: &PgPool,
    email: &str,
    auth_id: Uuid,
    metadata: &UserMetadata,
) -> Result<User, AuthError> {
    let name = non_blank(metadata.name.as_deref());
    let avatar = non_blank(metadata.avatar_url.as_deref());

    if let Some(existing) = get_user_by_email(pool, email).await? {
        if existing.role != UserRole::Guest {
            return Ok(existing);
        }

        let row = sqlx::query(&format!(
            r"UPDATE users
              SET role = 'user',
                  auth_id = $2,
                  name = COALESCE($3, name),
                  profile_pic_url = COALESCE($4, profile_pic_url)
              WHERE id = $1
              RETURNING {USER_COLUMNS}"
        ))
        .bind(existing.id)
        .bind(auth_id)
        .bind(name)
        .bind(avatar)
        .fetch_one(pool)
        .await?;
        let user = user_from_row(&row);
        tracing::info!(user_id = %user.id, "guest upgraded to registered user");
        return Ok(user);
    }

    let row = sqlx::query(&format!(
        r"INSERT INTO users (email, name, auth_id, profile_pic_url, role, points)
          VALUES ($1, $2, $3, $4, 'user', 0)
          ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
          RETURNING {USER_COLUMNS}"
    ))
    .bind(email)
    .bind(name)
    .bind(auth_id)
    .bind(avatar)
    .fetch_one(pool)
    .await?;
    let user = user_from_row(&row);
    tracing::info!(user_id = %user.id, "user created");
    Ok(user)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
