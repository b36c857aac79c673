//! Session tokens: HS256 JWT issuance and verification.
//!
//! ARCHITECTURE
//! ============
//! Tokens are compact JWS strings (`header.payload.signature`, base64url
//! without padding) signed with HMAC-SHA256 over the shared `JWT_SECRET`.
//! The claim layout follows the common hosted-auth shape (`sub`, `email`,
//! `aud`, `user_metadata`) so tokens minted by an external identity provider
//! that shares the secret are accepted as well as the ones issued here.
//!
//! TRADE-OFFS
//! ==========
//! Verification is stateless: there is no server-side revocation list, so
//! logout only clears the cookie and a leaked token stays valid until `exp`.

use std::fmt::Write;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::services::auth::User;

const JWT_ALG: &str = "HS256";

type HmacSha256 = Hmac<Sha256>;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Verified token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub user_metadata: UserMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
}

/// Payload as it arrives on the wire, before claim validation.
#[derive(Deserialize)]
struct RawClaims {
    sub: Option<String>,
    email: Option<String>,
    aud: Option<serde_json::Value>,
    exp: Option<i64>,
    #[serde(default)]
    iat: Option<i64>,
    user_metadata: Option<UserMetadata>,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid token")]
    Invalid,
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token claims")]
    InvalidClaims,
    #[error("Invalid token payload")]
    InvalidPayload,
    #[error("failed to encode token: {0}")]
    Encode(String),
}

// =============================================================================
// ISSUE
// =============================================================================

/// Issue a signed token for `user`, valid for `config.ttl`.
///
/// # Errors
///
/// Returns [`TokenError::Encode`] if the claims cannot be serialized.
pub fn issue_token(config: &JwtConfig, user: &User) -> Result<String, TokenError> {
    issue_token_at(config, user, time::OffsetDateTime::now_utc().unix_timestamp())
}

pub(crate) fn issue_token_at(config: &JwtConfig, user: &User, now: i64) -> Result<String, TokenError> {
    let ttl = i64::try_from(config.ttl.as_secs()).unwrap_or(i64::MAX);
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        aud: config.audience.clone(),
        exp: now.saturating_add(ttl),
        iat: now,
        user_metadata: UserMetadata { name: user.name.clone(), avatar_url: user.profile_pic_url.clone() },
        role: Some(user.role.as_str().to_owned()),
    };
    encode_claims(&config.secret, &claims)
}

pub(crate) fn encode_claims<T: Serialize>(secret: &str, claims: &T) -> Result<String, TokenError> {
    let header = Header { alg: JWT_ALG.to_owned(), typ: Some("JWT".to_owned()) };
    let header_json = serde_json::to_vec(&header).map_err(|e| TokenError::Encode(e.to_string()))?;
    let claims_json = serde_json::to_vec(claims).map_err(|e| TokenError::Encode(e.to_string()))?;

    let signing_input = format!("{}.{}", URL_SAFE_NO_PAD.encode(header_json), URL_SAFE_NO_PAD.encode(claims_json));
    let signature = sign(secret, signing_input.as_bytes())?;
    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
}

fn sign(secret: &str, input: &[u8]) -> Result<Vec<u8>, TokenError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| TokenError::Encode(e.to_string()))?;
    mac.update(input);
    Ok(mac.finalize().into_bytes().to_vec())
}

// =============================================================================
// DECODE
// =============================================================================

/// Verify signature and claims, returning the decoded [`Claims`].
///
/// # Errors
///
/// - [`TokenError::Invalid`]: malformed, wrong algorithm, or bad signature
/// - [`TokenError::Expired`]: `exp` is not in the future
/// - [`TokenError::InvalidClaims`]: missing `exp` or `aud` mismatch
/// - [`TokenError::InvalidPayload`]: missing `sub`, `email`, or `user_metadata`
pub fn decode_token(config: &JwtConfig, token: &str) -> Result<Claims, TokenError> {
    decode_token_at(config, token, time::OffsetDateTime::now_utc().unix_timestamp())
}

pub(crate) fn decode_token_at(config: &JwtConfig, token: &str, now: i64) -> Result<Claims, TokenError> {
    let mut parts = token.trim().split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Invalid);
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header_b64).map_err(|_| TokenError::Invalid)?;
    let header: Header = serde_json::from_slice(&header_bytes).map_err(|_| TokenError::Invalid)?;
    if header.alg != JWT_ALG {
        return Err(TokenError::Invalid);
    }

    let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|_| TokenError::Invalid)?;
    let mut mac = HmacSha256::new_from_slice(config.secret.as_bytes()).map_err(|_| TokenError::Invalid)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&signature).map_err(|_| TokenError::Invalid)?;

    let payload_bytes = URL_SAFE_NO_PAD.decode(payload_b64).map_err(|_| TokenError::Invalid)?;
    let raw: RawClaims = serde_json::from_slice(&payload_bytes).map_err(|_| TokenError::Invalid)?;

    let exp = raw.exp.ok_or(TokenError::InvalidClaims)?;
    if exp <= now {
        return Err(TokenError::Expired);
    }
    if !audience_matches(raw.aud.as_ref(), &config.audience) {
        return Err(TokenError::InvalidClaims);
    }

    let (Some(sub), Some(email), Some(user_metadata)) = (raw.sub, raw.email, raw.user_metadata) else {
        return Err(TokenError::InvalidPayload);
    };
    let sub = Uuid::parse_str(&sub).map_err(|_| TokenError::InvalidPayload)?;
    if email.trim().is_empty() {
        return Err(TokenError::InvalidPayload);
    }

    Ok(Claims {
        sub,
        email,
        aud: config.audience.clone(),
        exp,
        iat: raw.iat.unwrap_or_default(),
        user_metadata,
        role: raw.role,
    })
}

/// `aud` may be a single string or an array of strings.
fn audience_matches(aud: Option<&serde_json::Value>, expected: &str) -> bool {
    match aud {
        Some(serde_json::Value::String(single)) => single == expected,
        Some(serde_json::Value::Array(many)) => many.iter().any(|v| v.as_str() == Some(expected)),
        _ => false,
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
