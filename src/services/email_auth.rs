//! Email access-code auth service.
//!
//! Creates and verifies short-lived six-character codes linked to an email.
//! Only the SHA-256 hash of a code is stored. A code expires after ten
//! minutes (column default) and is burned after five wrong guesses.

use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use crate::mail::{MailError, Mailer, templates};
use crate::services::session::bytes_to_hex;

const CODE_LEN: usize = 6;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const MAX_FAILED_ATTEMPTS: i32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum EmailAuthError {
    #[error("invalid email")]
    InvalidEmail,
    #[error("invalid code")]
    InvalidCode,
    #[error("expired or incorrect code")]
    VerificationFailed,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    EmailDelivery(#[from] MailError),
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    if normalized.is_empty() || !normalized.contains('@') {
        return None;
    }
    let parts = normalized.split('@').collect::<Vec<_>>();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return None;
    }
    if parts[1].starts_with('.') || parts[1].ends_with('.') || !parts[1].contains('.') {
        return None;
    }
    Some(normalized)
}

#[must_use]
pub fn normalize_code(code: &str) -> Option<String> {
    let normalized = code.trim().to_ascii_uppercase();
    if normalized.len() != CODE_LEN
        || !normalized
            .chars()
            .all(|c| c.is_ascii() && CODE_ALPHABET.contains(&(c as u8)))
    {
        return None;
    }
    Some(normalized)
}

#[must_use]
pub fn generate_access_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

#[must_use]
pub fn hash_access_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    bytes_to_hex(&hasher.finalize())
}

/// Fallback display name for accounts created through email login.
#[must_use]
pub fn name_from_email(email: &str) -> String {
    let local = email
        .split('@')
        .next()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("user");
    local.to_owned()
}

/// Replace any outstanding code for `email` with a fresh one.
///
/// Returns the normalized email and the plaintext code to deliver.
///
/// # Errors
///
/// Returns [`EmailAuthError::InvalidEmail`] for malformed addresses, or a
/// database error.
pub async fn request_access_code(pool: &PgPool, email: &str) -> Result<(String, String), EmailAuthError> {
    let normalized = normalize_email(email).ok_or(EmailAuthError::InvalidEmail)?;

    sqlx::query("DELETE FROM email_login_codes WHERE email = $1 AND consumed_at IS NULL")
        .bind(&normalized)
        .execute(pool)
        .await?;

    let code = generate_access_code();
    let code_hash = hash_access_code(&code);

    sqlx::query("INSERT INTO email_login_codes (email, code_hash) VALUES ($1, $2)")
        .bind(&normalized)
        .bind(code_hash)
        .execute(pool)
        .await?;

    tracing::info!(email = %normalized, "access code issued");
    Ok((normalized, code))
}

/// Consume the newest live code for `email` if `code` matches it.
///
/// A mismatch increments the attempt counter and burns the code once
/// `MAX_FAILED_ATTEMPTS` is reached. Returns the normalized email.
///
/// # Errors
///
/// Returns [`EmailAuthError::VerificationFailed`] when there is no live code
/// or the code does not match.
pub async fn verify_access_code(pool: &PgPool, email: &str, code: &str) -> Result<String, EmailAuthError> {
    let normalized_email = normalize_email(email).ok_or(EmailAuthError::InvalidEmail)?;
    let normalized_code = normalize_code(code).ok_or(EmailAuthError::InvalidCode)?;
    let code_hash = hash_access_code(&normalized_code);

    let update = sqlx::query(
        r"UPDATE email_login_codes
          SET consumed_at = now()
          WHERE id = (
              SELECT id
              FROM email_login_codes
              WHERE email = $1
                AND consumed_at IS NULL
                AND expires_at > now()
              ORDER BY created_at DESC
              LIMIT 1
          )
          AND code_hash = $2
          RETURNING id",
    )
    .bind(&normalized_email)
    .bind(&code_hash)
    .fetch_optional(pool)
    .await?;

    if update.is_none() {
        sqlx::query(
            r"UPDATE email_login_codes
              SET attempts = attempts + 1,
                  consumed_at = CASE WHEN attempts + 1 >= $2 THEN now() ELSE consumed_at END
              WHERE id = (
                  SELECT id
                  FROM email_login_codes
                  WHERE email = $1
                    AND consumed_at IS NULL
                    AND expires_at > now()
                  ORDER BY created_at DESC
                  LIMIT 1
              )",
        )
        .bind(&normalized_email)
        .bind(MAX_FAILED_ATTEMPTS)
        .execute(pool)
        .await?;
        tracing::warn!(email = %normalized_email, "access code verification failed");
        return Err(EmailAuthError::VerificationFailed);
    }

    Ok(normalized_email)
}

/// Deliver an access code through the configured mailer.
///
/// # Errors
///
/// Returns [`EmailAuthError::EmailDelivery`] when the mailer fails.
pub async fn send_access_code_email(
    mailer: &dyn Mailer,
    app_name: &str,
    to_email: &str,
    code: &str,
) -> Result<(), EmailAuthError> {
    let message_id = mailer
        .send(templates::access_code(app_name, to_email, code))
        .await?;
    tracing::info!(to = %to_email, %message_id, "access code email sent");
    Ok(())
}

#[cfg(test)]
#[path = "email_auth_test.rs"]
mod tests;
