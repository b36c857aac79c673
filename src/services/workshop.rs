//! Workshop service: CRUD, filtered listing, and catalogue statistics.
//!
//! DESIGN
//! ======
//! Rows are stored with `TIMESTAMPTZ` schedules. Every read path converts a
//! [`Workshop`] into a [`WorkshopOut`] against a single `now`, which adds the
//! derived `is_upcoming`, `time_until_workshop`, and `scheduled_at_ist`
//! fields. Passing `now` in keeps those derivations deterministic in tests.
//!
//! ERROR HANDLING
//! ==============
//! Input validation runs before any query and reports the first failing
//! field. A schedule that is not strictly in the future is rejected on both
//! create and update.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::ist;

const WORKSHOP_COLUMNS: &str = "id, title, description, technologies, conducted_by, scheduled_at, meeting_link, created_at";

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_UPCOMING_LIMIT: i64 = 10;
pub const MAX_UPCOMING_LIMIT: i64 = 50;
const POPULAR_TECH_LIMIT: i64 = 10;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WorkshopError {
    #[error("Workshop with ID {0} not found")]
    NotFound(Uuid),
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Row from the `workshops` table.
#[derive(Debug, Clone)]
pub struct Workshop {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub technologies: Vec<String>,
    pub conducted_by: String,
    pub scheduled_at: OffsetDateTime,
    pub meeting_link: Option<String>,
    pub created_at: OffsetDateTime,
}

pub(crate) fn workshop_from_row(row: &PgRow) -> Workshop {
    Workshop {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        technologies: row.get("technologies"),
        conducted_by: row.get("conducted_by"),
        scheduled_at: row.get("scheduled_at"),
        meeting_link: row.get("meeting_link"),
        created_at: row.get("created_at"),
    }
}

/// API representation with derived schedule fields.
#[derive(Debug, Clone, Serialize)]
pub struct WorkshopOut {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub technologies: Vec<String>,
    pub conducted_by: String,
    #[serde(serialize_with = "ist::serde_ist::serialize")]
    pub scheduled_at: OffsetDateTime,
    pub meeting_link: Option<String>,
    #[serde(serialize_with = "ist::serde_ist::serialize")]
    pub created_at: OffsetDateTime,
    pub is_upcoming: bool,
    pub time_until_workshop: String,
    pub scheduled_at_ist: String,
}

impl WorkshopOut {
    #[must_use]
    pub fn from_workshop(w: Workshop, now: OffsetDateTime) -> Self {
        Self {
            is_upcoming: w.scheduled_at > now,
            time_until_workshop: ist::time_until(w.scheduled_at, now),
            scheduled_at_ist: ist::format_ist(w.scheduled_at),
            id: w.id,
            title: w.title,
            description: w.description,
            technologies: w.technologies,
            conducted_by: w.conducted_by,
            scheduled_at: w.scheduled_at,
            meeting_link: w.meeting_link,
            created_at: w.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkshopCreate {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    pub conducted_by: String,
    pub scheduled_at: String,
    pub meeting_link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkshopUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub conducted_by: Option<String>,
    pub scheduled_at: Option<String>,
    pub meeting_link: Option<String>,
}

impl WorkshopUpdate {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.technologies.is_none()
            && self.conducted_by.is_none()
            && self.scheduled_at.is_none()
            && self.meeting_link.is_none()
    }
}

/// Validated insert payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkshop {
    pub title: String,
    pub description: Option<String>,
    pub technologies: Vec<String>,
    pub conducted_by: String,
    pub scheduled_at: OffsetDateTime,
    pub meeting_link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListFilters {
    pub search: Option<String>,
    pub technology: Option<String>,
    pub instructor: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    #[must_use]
    pub fn new(total: i64, page: i64, page_size: i64) -> Self {
        Self {
            total,
            page,
            page_size,
            total_pages: total.saturating_add(page_size - 1) / page_size,
            has_next: total > page.saturating_mul(page_size),
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FiltersApplied {
    pub search: Option<String>,
    pub technology: Option<String>,
    pub instructor: Option<String>,
    pub date_range: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkshopPage {
    pub workshops: Vec<WorkshopOut>,
    pub pagination: Pagination,
    pub filters_applied: FiltersApplied,
}

#[derive(Debug, Clone, Serialize)]
pub struct TechCount {
    pub tech: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkshopStats {
    pub total_workshops: i64,
    pub upcoming_workshops: i64,
    pub past_workshops: i64,
    pub popular_technologies: Vec<TechCount>,
    pub active_instructors: i64,
    pub next_workshop: Option<WorkshopOut>,
    pub current_time_ist: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedWorkshop {
    pub message: String,
    pub deleted_workshop: String,
    pub deleted_id: Uuid,
}

// =============================================================================
// VALIDATION
// =============================================================================

fn validate_len(field: &str, value: &str, min: usize, max: usize) -> Result<String, WorkshopError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min || len > max {
        return Err(WorkshopError::Validation(format!("{field} must be between {min} and {max} characters")));
    }
    Ok(trimmed.to_owned())
}

fn validate_description(value: Option<&str>) -> Result<Option<String>, WorkshopError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if value.chars().count() > 2000 {
        return Err(WorkshopError::Validation("description must be at most 2000 characters".to_owned()));
    }
    Ok(Some(value.to_owned()))
}

fn validate_schedule(raw: &str, now: OffsetDateTime) -> Result<OffsetDateTime, WorkshopError> {
    let scheduled_at = ist::parse_datetime(raw).map_err(|e| WorkshopError::Validation(e.to_string()))?;
    if scheduled_at <= now {
        return Err(WorkshopError::Validation("Workshop must be scheduled for the future (IST)".to_owned()));
    }
    Ok(scheduled_at)
}

fn clean_technologies(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for tech in raw.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !out.iter().any(|t| t == tech) {
            out.push(tech.to_owned());
        }
    }
    out
}

fn clean_link(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
}

/// Validate a create payload against `now`.
///
/// # Errors
///
/// Returns [`WorkshopError::Validation`] naming the first invalid field.
pub fn validate_create(input: &WorkshopCreate, now: OffsetDateTime) -> Result<NewWorkshop, WorkshopError> {
    Ok(NewWorkshop {
        title: validate_len("title", &input.title, 3, 200)?,
        description: validate_description(input.description.as_deref())?,
        technologies: clean_technologies(&input.technologies),
        conducted_by: validate_len("conducted_by", &input.conducted_by, 2, 100)?,
        scheduled_at: validate_schedule(&input.scheduled_at, now)?,
        meeting_link: clean_link(input.meeting_link.as_deref()),
    })
}

// =============================================================================
// CRUD
// =============================================================================

/// Create a workshop.
///
/// # Errors
///
/// Returns a validation error or a database error if the insert fails.
pub async fn create_workshop(pool: &PgPool, input: &WorkshopCreate) -> Result<WorkshopOut, WorkshopError> {
    let now = ist::now_ist();
    let new = validate_create(input, now)?;

    let row = sqlx::query(&format!(
        r"INSERT INTO workshops (title, description, technologies, conducted_by, scheduled_at, meeting_link)
          VALUES ($1, $2, $3, $4, $5, $6)
          RETURNING {WORKSHOP_COLUMNS}"
    ))
    .bind(&new.title)
    .bind(&new.description)
    .bind(&new.technologies)
    .bind(&new.conducted_by)
    .bind(new.scheduled_at)
    .bind(&new.meeting_link)
    .fetch_one(pool)
    .await?;

    let workshop = workshop_from_row(&row);
    info!(workshop_id = %workshop.id, title = %workshop.title, "workshop created");
    Ok(WorkshopOut::from_workshop(workshop, now))
}

/// Fetch the raw row, or `None`.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn find_workshop(pool: &PgPool, workshop_id: Uuid) -> Result<Option<Workshop>, WorkshopError> {
    let row = sqlx::query(&format!("SELECT {WORKSHOP_COLUMNS} FROM workshops WHERE id = $1"))
        .bind(workshop_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(workshop_from_row))
}

/// Fetch one workshop.
///
/// # Errors
///
/// Returns [`WorkshopError::NotFound`] or a database error.
pub async fn get_workshop(pool: &PgPool, workshop_id: Uuid) -> Result<WorkshopOut, WorkshopError> {
    let workshop = find_workshop(pool, workshop_id)
        .await?
        .ok_or(WorkshopError::NotFound(workshop_id))?;
    Ok(WorkshopOut::from_workshop(workshop, ist::now_ist()))
}

/// Apply a partial update. An empty patch returns the current record.
///
/// # Errors
///
/// Returns [`WorkshopError::NotFound`], a validation error, or a database error.
pub async fn update_workshop(
    pool: &PgPool,
    workshop_id: Uuid,
    patch: &WorkshopUpdate,
) -> Result<WorkshopOut, WorkshopError> {
    let now = ist::now_ist();
    if patch.is_empty() {
        return get_workshop(pool, workshop_id).await;
    }

    let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("UPDATE workshops SET ");
    {
        let mut set = builder.separated(", ");
        if let Some(title) = &patch.title {
            set.push("title = ").push_bind_unseparated(validate_len("title", title, 3, 200)?);
        }
        if let Some(description) = &patch.description {
            set.push("description = ")
                .push_bind_unseparated(validate_description(Some(description))?);
        }
        if let Some(technologies) = &patch.technologies {
            set.push("technologies = ")
                .push_bind_unseparated(clean_technologies(technologies));
        }
        if let Some(conducted_by) = &patch.conducted_by {
            set.push("conducted_by = ")
                .push_bind_unseparated(validate_len("conducted_by", conducted_by, 2, 100)?);
        }
        if let Some(scheduled_at) = &patch.scheduled_at {
            set.push("scheduled_at = ")
                .push_bind_unseparated(validate_schedule(scheduled_at, now)?);
        }
        if let Some(meeting_link) = &patch.meeting_link {
            set.push("meeting_link = ")
                .push_bind_unseparated(clean_link(Some(meeting_link)));
        }
    }
    builder.push(" WHERE id = ").push_bind(workshop_id);
    builder.push(format!(" RETURNING {WORKSHOP_COLUMNS}"));

    let row = builder
        .build()
        .fetch_optional(pool)
        .await?
        .ok_or(WorkshopError::NotFound(workshop_id))?;
    let workshop = workshop_from_row(&row);
    info!(%workshop_id, "workshop updated");
    Ok(WorkshopOut::from_workshop(workshop, now))
}

/// Delete a workshop. Enrollments, reviews and assignments cascade.
///
/// # Errors
///
/// Returns [`WorkshopError::NotFound`] or a database error.
pub async fn delete_workshop(pool: &PgPool, workshop_id: Uuid) -> Result<DeletedWorkshop, WorkshopError> {
    let row = sqlx::query("DELETE FROM workshops WHERE id = $1 RETURNING title")
        .bind(workshop_id)
        .fetch_optional(pool)
        .await?
        .ok_or(WorkshopError::NotFound(workshop_id))?;
    let title: String = row.get("title");
    info!(%workshop_id, %title, "workshop deleted");
    Ok(DeletedWorkshop { message: "Workshop deleted successfully".to_owned(), deleted_workshop: title, deleted_id: workshop_id })
}

// =============================================================================
// LISTING
// =============================================================================

/// Parsed, validated list filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ResolvedFilters {
    search: Option<String>,
    technology: Option<String>,
    instructor: Option<String>,
    from_date: Option<OffsetDateTime>,
    to_date: Option<OffsetDateTime>,
    page: i64,
    page_size: i64,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
}

pub(crate) fn resolve_filters(filters: &ListFilters) -> Result<ResolvedFilters, WorkshopError> {
    let page = filters.page.unwrap_or(1);
    if page < 1 {
        return Err(WorkshopError::Validation("page must be at least 1".to_owned()));
    }
    let page_size = filters.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(WorkshopError::Validation(format!("page_size must be between 1 and {MAX_PAGE_SIZE}")));
    }
    // OFFSET is (page - 1) * page_size and must fit in i64.
    let max_page = i64::MAX / page_size;
    if page > max_page {
        return Err(WorkshopError::Validation(format!("page must be at most {max_page}")));
    }
    let parse_date = |raw: Option<&str>| -> Result<Option<OffsetDateTime>, WorkshopError> {
        non_blank(raw)
            .map(|v| ist::parse_datetime(&v).map_err(|e| WorkshopError::Validation(e.to_string())))
            .transpose()
    };

    Ok(ResolvedFilters {
        search: non_blank(filters.search.as_deref()),
        technology: non_blank(filters.technology.as_deref()),
        instructor: non_blank(filters.instructor.as_deref()),
        from_date: parse_date(filters.from_date.as_deref())?,
        to_date: parse_date(filters.to_date.as_deref())?,
        page,
        page_size,
    })
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &ResolvedFilters) {
    builder.push(" WHERE TRUE");
    if let Some(search) = &filters.search {
        let pattern = crate::services::user::like_pattern(search);
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(technology) = &filters.technology {
        builder
            .push(" AND technologies @> ARRAY[")
            .push_bind(technology.clone())
            .push("]::TEXT[]");
    }
    if let Some(instructor) = &filters.instructor {
        builder
            .push(" AND conducted_by ILIKE ")
            .push_bind(crate::services::user::like_pattern(instructor));
    }
    if let Some(from) = filters.from_date {
        builder.push(" AND scheduled_at >= ").push_bind(from);
    }
    if let Some(to) = filters.to_date {
        builder.push(" AND scheduled_at <= ").push_bind(to);
    }
}

/// Filtered, paginated listing ordered by schedule.
///
/// # Errors
///
/// Returns a validation error for bad paging or dates, or a database error.
pub async fn list_workshops(pool: &PgPool, filters: &ListFilters) -> Result<WorkshopPage, WorkshopError> {
    let resolved = resolve_filters(filters)?;

    let mut count_builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT COUNT(*) AS total FROM workshops");
    push_filters(&mut count_builder, &resolved);
    let total: i64 = count_builder.build().fetch_one(pool).await?.get("total");

    let mut builder: QueryBuilder<'_, Postgres> =
        QueryBuilder::new(format!("SELECT {WORKSHOP_COLUMNS} FROM workshops"));
    push_filters(&mut builder, &resolved);
    builder
        .push(" ORDER BY scheduled_at ASC, id ASC LIMIT ")
        .push_bind(resolved.page_size)
        .push(" OFFSET ")
        .push_bind((resolved.page - 1) * resolved.page_size);
    let rows = builder.build().fetch_all(pool).await?;

    let now = ist::now_ist();
    Ok(WorkshopPage {
        workshops: rows
            .iter()
            .map(|r| WorkshopOut::from_workshop(workshop_from_row(r), now))
            .collect(),
        pagination: Pagination::new(total, resolved.page, resolved.page_size),
        filters_applied: FiltersApplied {
            date_range: resolved.from_date.is_some() || resolved.to_date.is_some(),
            search: resolved.search,
            technology: resolved.technology,
            instructor: resolved.instructor,
        },
    })
}

/// Next `limit` workshops that have not started yet.
///
/// # Errors
///
/// Returns a validation error when `limit` is outside `1..=50`, or a database error.
pub async fn upcoming_workshops(pool: &PgPool, limit: i64) -> Result<Vec<WorkshopOut>, WorkshopError> {
    if !(1..=MAX_UPCOMING_LIMIT).contains(&limit) {
        return Err(WorkshopError::Validation(format!("limit must be between 1 and {MAX_UPCOMING_LIMIT}")));
    }
    let now = ist::now_ist();
    let rows = sqlx::query(&format!(
        "SELECT {WORKSHOP_COLUMNS} FROM workshops WHERE scheduled_at >= $1 ORDER BY scheduled_at ASC LIMIT $2"
    ))
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .iter()
        .map(|r| WorkshopOut::from_workshop(workshop_from_row(r), now))
        .collect())
}

/// All workshops tagged with `technology` (exact, case-sensitive match).
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn by_technology(pool: &PgPool, technology: &str) -> Result<Vec<WorkshopOut>, WorkshopError> {
    let rows = sqlx::query(&format!(
        "SELECT {WORKSHOP_COLUMNS} FROM workshops WHERE technologies @> ARRAY[$1]::TEXT[] ORDER BY scheduled_at ASC"
    ))
    .bind(technology.trim())
    .fetch_all(pool)
    .await?;
    let now = ist::now_ist();
    Ok(rows
        .iter()
        .map(|r| WorkshopOut::from_workshop(workshop_from_row(r), now))
        .collect())
}

/// Catalogue-wide counts, top technologies, and the next scheduled workshop.
///
/// # Errors
///
/// Returns a database error if any query fails.
pub async fn workshop_stats(pool: &PgPool) -> Result<WorkshopStats, WorkshopError> {
    let now = ist::now_ist();

    let counts = sqlx::query(
        r"SELECT COUNT(*) AS total,
                 COUNT(*) FILTER (WHERE scheduled_at > $1) AS upcoming,
                 COUNT(DISTINCT conducted_by) AS instructors
          FROM workshops",
    )
    .bind(now)
    .fetch_one(pool)
    .await?;

    let popular_technologies = sqlx::query(
        r"SELECT tech, COUNT(*) AS count
          FROM workshops, unnest(technologies) AS tech
          GROUP BY tech
          ORDER BY count DESC, tech ASC
          LIMIT $1",
    )
    .bind(POPULAR_TECH_LIMIT)
    .fetch_all(pool)
    .await?
    .iter()
    .map(|r| TechCount { tech: r.get("tech"), count: r.get("count") })
    .collect();

    let next_workshop = sqlx::query(&format!(
        "SELECT {WORKSHOP_COLUMNS} FROM workshops WHERE scheduled_at > $1 ORDER BY scheduled_at ASC LIMIT 1"
    ))
    .bind(now)
    .fetch_optional(pool)
    .await?
    .map(|r| WorkshopOut::from_workshop(workshop_from_row(&r), now));

    let total_workshops: i64 = counts.get("total");
    let upcoming_workshops: i64 = counts.get("upcoming");
    Ok(WorkshopStats {
        total_workshops,
        upcoming_workshops,
        past_workshops: total_workshops - upcoming_workshops,
        popular_technologies,
        active_instructors: counts.get("instructors"),
        next_workshop,
        current_time_ist: ist::format_ist(now),
    })
}

#[cfg(test)]
#[path = "workshop_test.rs"]
mod tests;
