//! Assignment service: one assignment per enrollment, submitted by the
//! learner and graded by an admin.
//!
//! DESIGN
//! ======
//! Enrolling creates a `pending` row; the unique `(user_id, workshop_id)`
//! constraint plus `ON CONFLICT DO NOTHING` makes that step idempotent.
//! Submission moves the row to `submitted`; grading sets any status along
//! with optional feedback and marks.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, Row};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::ist;

const ASSIGNMENT_COLUMNS: &str =
    "id, user_id, workshop_id, title, submit_link, status, feedback, marks, created_at, updated_at";

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;
const MIN_TITLE_LEN: usize = 3;
const MAX_TITLE_LEN: usize = 200;
const MAX_LINK_LEN: usize = 500;
const MAX_FEEDBACK_LEN: usize = 1000;
const MIN_FEEDBACK_LEN: usize = 5;
const MAX_MARKS: i32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error("Assignment not found")]
    NotFound,
    #[error("No assignment found for this workshop")]
    NotEnrolled,
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Submitted,
    UnderReview,
    Reviewed,
    Rejected,
}

impl AssignmentStatus {
    pub const ALL: [Self; 5] = [Self::Pending, Self::Submitted, Self::UnderReview, Self::Reviewed, Self::Rejected];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::Reviewed => "reviewed",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }

    /// Statuses that close the loop with the learner and so need feedback.
    #[must_use]
    pub fn requires_feedback(self) -> bool {
        matches!(self, Self::Reviewed | Self::Rejected)
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    pub id: i64,
    pub user_id: Uuid,
    pub workshop_id: Uuid,
    pub title: Option<String>,
    pub submit_link: Option<String>,
    pub status: AssignmentStatus,
    pub feedback: Option<String>,
    pub marks: Option<i32>,
    #[serde(serialize_with = "ist::serde_ist::serialize")]
    pub created_at: OffsetDateTime,
    #[serde(serialize_with = "ist::serde_ist::option::serialize")]
    pub updated_at: Option<OffsetDateTime>,
}

fn assignment_from_row(row: &PgRow) -> Assignment {
    let status: String = row.get("status");
    Assignment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        workshop_id: row.get("workshop_id"),
        title: row.get("title"),
        submit_link: row.get("submit_link"),
        // The CHECK constraint keeps unknown values out of the table.
        status: AssignmentStatus::from_str(&status).unwrap_or(AssignmentStatus::Pending),
        feedback: row.get("feedback"),
        marks: row.get("marks"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentSubmit {
    pub title: String,
    pub submit_link: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentGrade {
    pub status: AssignmentStatus,
    pub feedback: Option<String>,
    pub marks: Option<i32>,
}

impl AssignmentGrade {
    #[must_use]
    pub fn summary(&self) -> String {
        let marks = self.marks.map_or_else(|| "N/A".to_owned(), |m| m.to_string());
        format!("Assignment {} with marks: {marks}", self.status)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentFilters {
    pub status: Option<AssignmentStatus>,
    pub workshop_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentPage {
    pub assignments: Vec<Assignment>,
    pub total_count: i64,
    pub user_id: Option<Uuid>,
    pub workshop_id: Option<Uuid>,
    pub page: i64,
    pub per_page: i64,
    pub has_next: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentStats {
    pub workshop_id: Uuid,
    pub total_assignments: i64,
    pub pending: i64,
    pub submitted: i64,
    pub under_review: i64,
    pub reviewed: i64,
    pub rejected: i64,
    pub average_marks: Option<f64>,
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Clamp paging to `1..=MAX_LIMIT` and a non-negative offset.
#[must_use]
pub fn clamp_page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT), offset.unwrap_or(0).max(0))
}

fn page_number(limit: i64, offset: i64) -> i64 {
    offset / limit + 1
}

pub(crate) fn validate_submit(input: &AssignmentSubmit) -> Result<(String, String), AssignmentError> {
    let title = input.title.trim();
    let title_len = title.chars().count();
    if !(MIN_TITLE_LEN..=MAX_TITLE_LEN).contains(&title_len) {
        return Err(AssignmentError::Validation(format!(
            "Title must be between {MIN_TITLE_LEN} and {MAX_TITLE_LEN} characters"
        )));
    }

    let link = input.submit_link.trim();
    if link.is_empty() || link.chars().count() > MAX_LINK_LEN {
        return Err(AssignmentError::Validation(format!(
            "Submit link must be between 1 and {MAX_LINK_LEN} characters"
        )));
    }
    if !(link.starts_with("http://") || link.starts_with("https://")) {
        return Err(AssignmentError::Validation(
            "Submit link must be a valid URL starting with http:// or https://".to_owned(),
        ));
    }

    Ok((title.to_owned(), link.to_owned()))
}

/// Returns the trimmed feedback to store.
pub(crate) fn validate_grade(grade: &AssignmentGrade) -> Result<Option<String>, AssignmentError> {
    if let Some(marks) = grade.marks {
        if !(0..=MAX_MARKS).contains(&marks) {
            return Err(AssignmentError::Validation(format!("Marks must be between 0 and {MAX_MARKS}")));
        }
    }

    let feedback = grade.feedback.as_deref().map(str::trim).filter(|f| !f.is_empty());
    if let Some(text) = feedback {
        if text.chars().count() > MAX_FEEDBACK_LEN {
            return Err(AssignmentError::Validation(format!(
                "Feedback must be at most {MAX_FEEDBACK_LEN} characters"
            )));
        }
    }
    if grade.status.requires_feedback() && feedback.is_none_or(|f| f.chars().count() < MIN_FEEDBACK_LEN) {
        return Err(AssignmentError::Validation(
            "Feedback is required when reviewing or rejecting assignments".to_owned(),
        ));
    }

    Ok(feedback.map(str::to_owned))
}

// =============================================================================
// WRITES
// =============================================================================

/// Create the pending assignment for a fresh enrollment. Returns `true` when
/// a row was inserted and `false` when one already existed.
///
/// Accepts any executor so enrollment can run it inside its transaction.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_on_enroll<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    workshop_id: Uuid,
) -> Result<bool, AssignmentError> {
    let result = sqlx::query(
        r"INSERT INTO assignments (user_id, workshop_id, status)
          VALUES ($1, $2, 'pending')
          ON CONFLICT (user_id, workshop_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(workshop_id)
    .execute(executor)
    .await?;

    let created = result.rows_affected() > 0;
    if created {
        info!(%user_id, %workshop_id, "assignment created on enroll");
    }
    Ok(created)
}

/// Record the learner's submission for their workshop assignment.
///
/// # Errors
///
/// Returns [`AssignmentError::Validation`] for bad input,
/// [`AssignmentError::NotEnrolled`] when no assignment exists, or a database error.
pub async fn submit(
    pool: &PgPool,
    user_id: Uuid,
    workshop_id: Uuid,
    input: &AssignmentSubmit,
) -> Result<Assignment, AssignmentError> {
    let (title, link) = validate_submit(input)?;

    let row = sqlx::query(&format!(
        r"UPDATE assignments
          SET title = $3, submit_link = $4, status = 'submitted', updated_at = now()
          WHERE user_id = $1 AND workshop_id = $2
          RETURNING {ASSIGNMENT_COLUMNS}"
    ))
    .bind(user_id)
    .bind(workshop_id)
    .bind(&title)
    .bind(&link)
    .fetch_optional(pool)
    .await?
    .ok_or(AssignmentError::NotEnrolled)?;

    let assignment = assignment_from_row(&row);
    info!(assignment_id = assignment.id, %user_id, "assignment submitted");
    Ok(assignment)
}

/// Set status, feedback and marks on an assignment.
///
/// # Errors
///
/// Returns [`AssignmentError::Validation`] for bad input,
/// [`AssignmentError::NotFound`] for unknown ids, or a database error.
pub async fn grade(pool: &PgPool, assignment_id: i64, input: &AssignmentGrade) -> Result<Assignment, AssignmentError> {
    let feedback = validate_grade(input)?;

    let row = sqlx::query(&format!(
        r"UPDATE assignments
          SET status = $2, feedback = $3, marks = $4, updated_at = now()
          WHERE id = $1
          RETURNING {ASSIGNMENT_COLUMNS}"
    ))
    .bind(assignment_id)
    .bind(input.status.as_str())
    .bind(feedback)
    .bind(input.marks)
    .fetch_optional(pool)
    .await?
    .ok_or(AssignmentError::NotFound)?;

    info!(assignment_id, status = %input.status, marks = ?input.marks, "assignment graded");
    Ok(assignment_from_row(&row))
}

// =============================================================================
// READS
// =============================================================================

/// # Errors
///
/// Returns [`AssignmentError::NotFound`] for unknown ids, or a database error.
pub async fn get(pool: &PgPool, assignment_id: i64) -> Result<Assignment, AssignmentError> {
    let row = sqlx::query(&format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = $1"))
        .bind(assignment_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AssignmentError::NotFound)?;
    Ok(assignment_from_row(&row))
}

/// The caller's assignment for one workshop.
///
/// # Errors
///
/// Returns [`AssignmentError::NotEnrolled`] when none exists, or a database error.
pub async fn for_user_in_workshop(
    pool: &PgPool,
    user_id: Uuid,
    workshop_id: Uuid,
) -> Result<Assignment, AssignmentError> {
    let row = sqlx::query(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE user_id = $1 AND workshop_id = $2"
    ))
    .bind(user_id)
    .bind(workshop_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AssignmentError::NotEnrolled)?;
    Ok(assignment_from_row(&row))
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &AssignmentFilters) {
    builder.push(" WHERE TRUE");
    if let Some(status) = filters.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(workshop_id) = filters.workshop_id {
        builder.push(" AND workshop_id = ").push_bind(workshop_id);
    }
    if let Some(user_id) = filters.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
}

/// Newest-first page of assignments matching every given filter.
///
/// # Errors
///
/// Returns a database error if a query fails.
pub async fn list(pool: &PgPool, filters: &AssignmentFilters) -> Result<AssignmentPage, AssignmentError> {
    let (limit, offset) = clamp_page(filters.limit, filters.offset);

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total FROM assignments");
    push_filters(&mut count, filters);
    let total_count: i64 = count.build().fetch_one(pool).await?.get("total");

    let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments"));
    push_filters(&mut query, filters);
    query
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let rows = query.build().fetch_all(pool).await?;

    Ok(AssignmentPage {
        assignments: rows.iter().map(assignment_from_row).collect(),
        total_count,
        user_id: filters.user_id,
        workshop_id: filters.workshop_id,
        page: page_number(limit, offset),
        per_page: limit,
        has_next: total_count > offset + limit,
    })
}

/// Every assignment belonging to `user_id`, newest first.
///
/// # Errors
///
/// Returns a database error if a query fails.
pub async fn mine(pool: &PgPool, user_id: Uuid, limit: Option<i64>, offset: Option<i64>) -> Result<AssignmentPage, AssignmentError> {
    let filters = AssignmentFilters { user_id: Some(user_id), limit, offset, ..AssignmentFilters::default() };
    list(pool, &filters).await
}

/// Per-status counts and mean marks for one workshop.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn stats(pool: &PgPool, workshop_id: Uuid) -> Result<AssignmentStats, AssignmentError> {
    let row = sqlx::query(
        r"SELECT
              COUNT(*) AS total,
              COUNT(*) FILTER (WHERE status = 'pending') AS pending,
              COUNT(*) FILTER (WHERE status = 'submitted') AS submitted,
              COUNT(*) FILTER (WHERE status = 'under_review') AS under_review,
              COUNT(*) FILTER (WHERE status = 'reviewed') AS reviewed,
              COUNT(*) FILTER (WHERE status = 'rejected') AS rejected,
              AVG(marks)::FLOAT8 AS average_marks
          FROM assignments
          WHERE workshop_id = $1",
    )
    .bind(workshop_id)
    .fetch_one(pool)
    .await?;

    Ok(AssignmentStats {
        workshop_id,
        total_assignments: row.get("total"),
        pending: row.get("pending"),
        submitted: row.get("submitted"),
        under_review: row.get("under_review"),
        reviewed: row.get("reviewed"),
        rejected: row.get("rejected"),
        average_marks: row.get::<Option<f64>, _>("average_marks").map(|m| (m * 100.0).round() / 100.0),
    })
}

#[cfg(test)]
#[path = "assignment_test.rs"]
mod tests;
