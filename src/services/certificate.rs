//! Read-only access to issued certificates. Issuing happens outside this
//! service; rows arrive already populated.

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::ist;

const CERTIFICATE_SELECT: &str = r"SELECT c.id, c.user_id, c.workshop_id, c.certificate_url, c.created_at,
           w.title AS workshop_title, w.conducted_by AS workshop_conducted_by
    FROM certificates c
    LEFT JOIN workshops w ON w.id = c.workshop_id";

#[derive(Debug, thiserror::Error)]
pub enum CertificateError {
    #[error("Certificate not found or access denied")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct Certificate {
    pub id: i64,
    pub user_id: Uuid,
    pub workshop_id: Uuid,
    pub certificate_url: Option<String>,
    #[serde(serialize_with = "ist::serde_ist::serialize")]
    pub created_at: OffsetDateTime,
    pub workshop_title: Option<String>,
    pub workshop_conducted_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CertificateList {
    pub certificates: Vec<Certificate>,
    pub total_count: usize,
    pub user_id: Uuid,
}

impl CertificateList {
    #[must_use]
    pub fn message(&self) -> String {
        if self.certificates.is_empty() {
            "No certificates found for this user".to_owned()
        } else {
            format!("Found {} certificates", self.total_count)
        }
    }
}

fn certificate_from_row(row: &PgRow) -> Certificate {
    Certificate {
        id: row.get("id"),
        user_id: row.get("user_id"),
        workshop_id: row.get("workshop_id"),
        certificate_url: row.get("certificate_url"),
        created_at: row.get("created_at"),
        workshop_title: row.get("workshop_title"),
        workshop_conducted_by: row.get("workshop_conducted_by"),
    }
}

/// The user's certificates, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn for_user(pool: &PgPool, user_id: Uuid) -> Result<CertificateList, CertificateError> {
    let rows = sqlx::query(&format!("{CERTIFICATE_SELECT} WHERE c.user_id = $1 ORDER BY c.created_at DESC"))
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    let certificates: Vec<Certificate> = rows.iter().map(certificate_from_row).collect();
    tracing::debug!(%user_id, count = certificates.len(), "certificates fetched");
    Ok(CertificateList { total_count: certificates.len(), certificates, user_id })
}

/// A single certificate, visible only to its owner.
///
/// # Errors
///
/// Returns [`CertificateError::NotFound`] for unknown ids and for other
/// users' certificates, or a database error.
pub async fn get_owned(pool: &PgPool, certificate_id: i64, user_id: Uuid) -> Result<Certificate, CertificateError> {
    let row = sqlx::query(&format!("{CERTIFICATE_SELECT} WHERE c.id = $1 AND c.user_id = $2"))
        .bind(certificate_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(CertificateError::NotFound)?;
    Ok(certificate_from_row(&row))
}

#[cfg(test)]
#[path = "certificate_test.rs"]
mod tests;
