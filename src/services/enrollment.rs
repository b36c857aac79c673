//! Enrollment service: the `user_workshop` link between users and workshops.
//!
//! DESIGN
//! ======
//! The `(user_id, workshop_id)` primary key is the only duplicate guard.
//! Inserts use `ON CONFLICT DO NOTHING RETURNING`, so a missing row in the
//! result means "already registered" without a separate pre-check racing
//! concurrent requests. The enrollment row and its pending assignment are
//! written in one transaction.
//!
//! Guest registration reuses an existing guest row for the same email and
//! refuses emails that already belong to a registered account.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ist;
use crate::services::assignment::{self, AssignmentError};
use crate::services::auth::{self, AuthError, User, UserRole};
use crate::services::email_auth::normalize_email;
use crate::services::workshop::{self, WorkshopError};

const MAX_GUEST_NAME_LEN: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    #[error("Workshop with ID {0} not found")]
    WorkshopNotFound(Uuid),
    #[error("You are already registered for this workshop")]
    AlreadyRegistered,
    #[error("This email is already registered for this workshop")]
    GuestAlreadyRegistered,
    #[error(
        "This email is already associated with a registered account. Please log in and register for the workshop."
    )]
    EmailBelongsToAccount,
    #[error("At least one reminder status must be provided")]
    NoReminderFields,
    #[error("User-workshop relationship not found")]
    RelationNotFound,
    #[error("User registration not found for this workshop")]
    RegistrationNotFound,
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<AuthError> for EnrollmentError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotFound => Self::Validation("User not found".to_owned()),
            AuthError::Database(e) => Self::Database(e),
        }
    }
}

impl From<WorkshopError> for EnrollmentError {
    fn from(err: WorkshopError) -> Self {
        match err {
            WorkshopError::NotFound(id) => Self::WorkshopNotFound(id),
            WorkshopError::Validation(msg) => Self::Validation(msg),
            WorkshopError::Database(e) => Self::Database(e),
        }
    }
}

impl From<AssignmentError> for EnrollmentError {
    fn from(err: AssignmentError) -> Self {
        match err {
            AssignmentError::Database(e) => Self::Database(e),
            other => Self::Validation(other.to_string()),
        }
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Registered,
    Guest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuestRegistration {
    pub name: String,
    pub email: String,
    pub workshop_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub user_id: Uuid,
    pub workshop_id: Uuid,
    #[serde(serialize_with = "ist::serde_ist::serialize")]
    pub registration_date: OffsetDateTime,
    pub user_type: UserType,
    pub message: String,
}

/// One `user_workshop` row.
#[derive(Debug, Clone, Serialize)]
pub struct Enrollment {
    pub user_id: Uuid,
    pub workshop_id: Uuid,
    #[serde(serialize_with = "ist::serde_ist::serialize")]
    pub created_at: OffsetDateTime,
    pub reminder_1day_sent: bool,
    pub reminder_15min_sent: bool,
}

fn enrollment_from_row(row: &PgRow) -> Enrollment {
    Enrollment {
        user_id: row.get("user_id"),
        workshop_id: row.get("workshop_id"),
        created_at: row.get("created_at"),
        reminder_1day_sent: row.get("reminder_1day_sent"),
        reminder_15min_sent: row.get("reminder_15min_sent"),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Participant {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub profile_pic_url: Option<String>,
    pub points: i32,
    pub role: UserRole,
    pub reminder_1day_sent: bool,
    pub reminder_15min_sent: bool,
    #[serde(serialize_with = "ist::serde_ist::serialize")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkshopParticipants {
    pub workshop_id: Uuid,
    pub total_participants: usize,
    pub users: Vec<Participant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrolledWorkshop {
    pub workshop_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub technologies: Vec<String>,
    pub conducted_by: String,
    #[serde(serialize_with = "ist::serde_ist::serialize")]
    pub scheduled_at: OffsetDateTime,
    pub reminder_1day_sent: bool,
    pub reminder_15min_sent: bool,
    #[serde(serialize_with = "ist::serde_ist::serialize")]
    pub registration_date: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserWorkshops {
    pub user_id: Uuid,
    pub total_workshops: usize,
    pub workshops: Vec<EnrolledWorkshop>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReminderStatusUpdate {
    pub user_id: Uuid,
    pub workshop_id: Uuid,
    pub reminder_1day_sent: Option<bool>,
    pub reminder_15min_sent: Option<bool>,
}

// =============================================================================
// REGISTRATION
// =============================================================================

/// Insert the enrollment and its pending assignment. `None` means the pair
/// already existed.
async fn insert_enrollment(
    pool: &PgPool,
    user_id: Uuid,
    workshop_id: Uuid,
) -> Result<Option<OffsetDateTime>, EnrollmentError> {
    let mut tx = pool.begin().await?;

    let created_at: Option<OffsetDateTime> = sqlx::query(
        r"INSERT INTO user_workshop (user_id, workshop_id)
          VALUES ($1, $2)
          ON CONFLICT (user_id, workshop_id) DO NOTHING
          RETURNING created_at",
    )
    .bind(user_id)
    .bind(workshop_id)
    .fetch_optional(tx.as_mut())
    .await?
    .map(|row| row.get("created_at"));

    if created_at.is_none() {
        tx.rollback().await?;
        return Ok(None);
    }

    assignment::create_on_enroll(tx.as_mut(), user_id, workshop_id).await?;
    tx.commit().await?;
    Ok(created_at)
}

async fn ensure_workshop(pool: &PgPool, workshop_id: Uuid) -> Result<(), EnrollmentError> {
    workshop::find_workshop(pool, workshop_id)
        .await?
        .map(|_| ())
        .ok_or(EnrollmentError::WorkshopNotFound(workshop_id))
}

/// Enroll an authenticated, non-guest user.
///
/// # Errors
///
/// Returns [`EnrollmentError::WorkshopNotFound`],
/// [`EnrollmentError::AlreadyRegistered`], or a database error.
pub async fn register_user(pool: &PgPool, user_id: Uuid, workshop_id: Uuid) -> Result<Registration, EnrollmentError> {
    ensure_workshop(pool, workshop_id).await?;

    let registration_date = insert_enrollment(pool, user_id, workshop_id)
        .await?
        .ok_or(EnrollmentError::AlreadyRegistered)?;
    info!(%user_id, %workshop_id, "user registered for workshop");

    Ok(Registration {
        user_id,
        workshop_id,
        registration_date,
        user_type: UserType::Registered,
        message: "Successfully registered for workshop and assignment created".to_owned(),
    })
}

pub(crate) fn validate_guest(input: &GuestRegistration) -> Result<(String, String), EnrollmentError> {
    let name = input.name.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_GUEST_NAME_LEN {
        return Err(EnrollmentError::Validation(format!(
            "Name must be between 1 and {MAX_GUEST_NAME_LEN} characters"
        )));
    }
    let email =
        normalize_email(&input.email).ok_or_else(|| EnrollmentError::Validation("Invalid email address".to_owned()))?;
    Ok((name.to_owned(), email))
}

fn reuse_guest(user: User) -> Result<User, EnrollmentError> {
    if user.role != UserRole::Guest {
        return Err(EnrollmentError::EmailBelongsToAccount);
    }
    info!(user_id = %user.id, "reusing guest account");
    Ok(user)
}

/// Existing guest row for `email`, or a new one. Concurrent first
/// registrations for one email settle on a single row.
async fn guest_account(pool: &PgPool, email: &str, name: &str) -> Result<User, EnrollmentError> {
    if let Some(user) = auth::get_user_by_email(pool, email).await? {
        return reuse_guest(user);
    }
    if let Some(created) = auth::create_guest_if_absent(pool, email, name).await? {
        return Ok(created);
    }
    let winner = auth::get_user_by_email(pool, email).await?.ok_or(AuthError::NotFound)?;
    reuse_guest(winner)
}

/// Enroll by name and email only. Returns the registration and the guest row.
///
/// # Errors
///
/// Returns [`EnrollmentError::Validation`] for bad input,
/// [`EnrollmentError::EmailBelongsToAccount`] when the email belongs to a
/// non-guest, [`EnrollmentError::WorkshopNotFound`],
/// [`EnrollmentError::GuestAlreadyRegistered`], or a database error.
pub async fn register_guest(pool: &PgPool, input: &GuestRegistration) -> Result<(Registration, User), EnrollmentError> {
    let (name, email) = validate_guest(input)?;
    ensure_workshop(pool, input.workshop_id).await?;

    let guest = guest_account(pool, &email, &name).await?;
    let registration_date = insert_enrollment(pool, guest.id, input.workshop_id)
        .await?
        .ok_or(EnrollmentError::GuestAlreadyRegistered)?;
    info!(user_id = %guest.id, workshop_id = %input.workshop_id, "guest registered for workshop");

    let registration = Registration {
        user_id: guest.id,
        workshop_id: input.workshop_id,
        registration_date,
        user_type: UserType::Guest,
        message: "Successfully registered as guest for workshop and assignment created".to_owned(),
    };
    Ok((registration, guest))
}

// =============================================================================
// QUERIES
// =============================================================================

/// Everyone enrolled in a workshop, earliest registration first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn participants(pool: &PgPool, workshop_id: Uuid) -> Result<WorkshopParticipants, EnrollmentError> {
    let rows = sqlx::query(
        r"SELECT uw.user_id, uw.created_at, uw.reminder_1day_sent, uw.reminder_15min_sent,
                 u.name, u.email, u.profile_pic_url, u.points, u.role
          FROM user_workshop uw
          JOIN users u ON u.id = uw.user_id
          WHERE uw.workshop_id = $1
          ORDER BY uw.created_at ASC",
    )
    .bind(workshop_id)
    .fetch_all(pool)
    .await?;

    let users: Vec<Participant> = rows
        .iter()
        .map(|row| {
            let role: String = row.get("role");
            Participant {
                user_id: row.get("user_id"),
                name: row.get("name"),
                email: row.get("email"),
                profile_pic_url: row.get("profile_pic_url"),
                points: row.get("points"),
                role: UserRole::from_str(&role).unwrap_or(UserRole::User),
                reminder_1day_sent: row.get("reminder_1day_sent"),
                reminder_15min_sent: row.get("reminder_15min_sent"),
                created_at: row.get("created_at"),
            }
        })
        .collect();

    Ok(WorkshopParticipants { workshop_id, total_participants: users.len(), users })
}

/// Workshops a user is enrolled in, soonest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn user_workshops(pool: &PgPool, user_id: Uuid) -> Result<UserWorkshops, EnrollmentError> {
    let rows = sqlx::query(
        r"SELECT uw.workshop_id, uw.created_at, uw.reminder_1day_sent, uw.reminder_15min_sent,
                 w.title, w.description, w.technologies, w.conducted_by, w.scheduled_at
          FROM user_workshop uw
          JOIN workshops w ON w.id = uw.workshop_id
          WHERE uw.user_id = $1
          ORDER BY w.scheduled_at ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let workshops: Vec<EnrolledWorkshop> = rows
        .iter()
        .map(|row| EnrolledWorkshop {
            workshop_id: row.get("workshop_id"),
            title: row.get("title"),
            description: row.get("description"),
            technologies: row.get("technologies"),
            conducted_by: row.get("conducted_by"),
            scheduled_at: row.get("scheduled_at"),
            reminder_1day_sent: row.get("reminder_1day_sent"),
            reminder_15min_sent: row.get("reminder_15min_sent"),
            registration_date: row.get("created_at"),
        })
        .collect();

    Ok(UserWorkshops { user_id, total_workshops: workshops.len(), workshops })
}

// =============================================================================
// UPDATES
// =============================================================================

/// Set either or both reminder flags on one enrollment.
///
/// # Errors
///
/// Returns [`EnrollmentError::NoReminderFields`] when neither flag is given,
/// [`EnrollmentError::RelationNotFound`] for an unknown pair, or a database error.
pub async fn update_reminder_status(
    pool: &PgPool,
    update: &ReminderStatusUpdate,
) -> Result<Enrollment, EnrollmentError> {
    if update.reminder_1day_sent.is_none() && update.reminder_15min_sent.is_none() {
        warn!("reminder status update without any flag");
        return Err(EnrollmentError::NoReminderFields);
    }

    let row = sqlx::query(
        r"UPDATE user_workshop
          SET reminder_1day_sent = COALESCE($3, reminder_1day_sent),
              reminder_15min_sent = COALESCE($4, reminder_15min_sent)
          WHERE user_id = $1 AND workshop_id = $2
          RETURNING user_id, workshop_id, created_at, reminder_1day_sent, reminder_15min_sent",
    )
    .bind(update.user_id)
    .bind(update.workshop_id)
    .bind(update.reminder_1day_sent)
    .bind(update.reminder_15min_sent)
    .fetch_optional(pool)
    .await?
    .ok_or(EnrollmentError::RelationNotFound)?;

    info!(user_id = %update.user_id, workshop_id = %update.workshop_id, "reminder status updated");
    Ok(enrollment_from_row(&row))
}

/// Remove an enrollment. The assignment row is left in place.
///
/// # Errors
///
/// Returns [`EnrollmentError::RegistrationNotFound`] when the user was not
/// enrolled, or a database error.
pub async fn unregister(pool: &PgPool, user_id: Uuid, workshop_id: Uuid) -> Result<(), EnrollmentError> {
    let result = sqlx::query("DELETE FROM user_workshop WHERE user_id = $1 AND workshop_id = $2")
        .bind(user_id)
        .bind(workshop_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        warn!(%user_id, %workshop_id, "no registration to delete");
        return Err(EnrollmentError::RegistrationNotFound);
    }
    info!(%user_id, %workshop_id, "user unregistered from workshop");
    Ok(())
}

#[cfg(test)]
#[path = "enrollment_test.rs"]
mod tests;
