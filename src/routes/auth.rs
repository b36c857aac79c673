//! Auth routes and extractors: bearer/cookie token auth, role gates, and the
//! email access-code login flow.

use axum::extract::{FromRef, FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;
use uuid::Uuid;

use super::response::{ApiError, ApiResponse, ApiResult};
use crate::rate_limit::RateLimitError;
use crate::services::auth::{self as auth_svc, AuthError, User, UserRole};
use crate::services::email_auth::{self, EmailAuthError};
use crate::services::session::{self, Claims, TokenError, UserMetadata};
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";

fn session_cookie(value: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

/// Token from `Authorization: Bearer ...`, falling back to the session cookie.
pub(crate) fn token_from_parts(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (scheme, token) = v.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim().to_owned())
        })
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    let jar = CookieJar::from_headers(&parts.headers);
    jar.get(COOKIE_NAME)
        .map(|c| c.value().to_owned())
        .filter(|t| !t.is_empty())
}

pub(crate) fn auth_error_to_api(err: AuthError) -> ApiError {
    match err {
        AuthError::NotFound => ApiError::not_found("User not found"),
        AuthError::Database(e) => ApiError::internal(e),
    }
}

fn token_error_to_api(err: TokenError) -> ApiError {
    match err {
        TokenError::Encode(e) => ApiError::internal(e),
        other => ApiError::unauthorized(other.to_string()),
    }
}

// =============================================================================
// AUTH EXTRACTORS
// =============================================================================

/// Any authenticated user, guests included.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: User,
    pub claims: Claims,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts).ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

        let app_state = AppState::from_ref(state);
        let claims = session::decode_token(&app_state.config.jwt, &token).map_err(token_error_to_api)?;
        let user = auth_svc::get_or_create_user(&app_state.pool, &claims.email, claims.sub, &claims.user_metadata)
            .await
            .map_err(auth_error_to_api)?;

        Ok(Self { user, claims })
    }
}

/// An authenticated non-guest user.
pub struct RegisteredUser(pub User);

impl<S> FromRequestParts<S> for RegisteredUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser { user, .. } = AuthUser::from_request_parts(parts, state).await?;
        require_registered(user).map(Self)
    }
}

/// An authenticated admin.
pub struct AdminUser(pub User);

impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser { user, .. } = AuthUser::from_request_parts(parts, state).await?;
        require_admin(user).map(Self)
    }
}

pub(crate) fn require_registered(user: User) -> Result<User, ApiError> {
    if user.role == UserRole::Guest {
        return Err(ApiError::forbidden("Guest users must use the guest registration route"));
    }
    Ok(user)
}

pub(crate) fn require_admin(user: User) -> Result<User, ApiError> {
    if user.role != UserRole::Admin {
        return Err(ApiError::forbidden(format!("Admin access required. Current role: {}", user.role)));
    }
    Ok(user)
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /api/v1/auth/me`: return the current user.
pub async fn me(auth: AuthUser) -> ApiResult<User> {
    Ok(ApiResponse::ok("User authenticated successfully", auth.user))
}

/// `POST /api/v1/auth/logout`: clear the session cookie.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = session_cookie(String::new(), Duration::ZERO, state.config.cookie_secure);
    let jar = CookieJar::new().add(cookie);
    (jar, ApiResponse::ok("Logged out successfully", serde_json::Value::Null))
}

#[derive(Deserialize)]
pub struct RequestCodeBody {
    pub email: String,
}

#[derive(Serialize)]
pub struct RequestCodeData {
    pub email: String,
    pub expires_in_seconds: u32,
}

fn email_auth_error_to_api(err: EmailAuthError) -> ApiError {
    match err {
        EmailAuthError::InvalidEmail => ApiError::bad_request("Invalid email address"),
        EmailAuthError::InvalidCode => ApiError::bad_request("Invalid access code format"),
        EmailAuthError::VerificationFailed => ApiError::unauthorized("Invalid or expired access code"),
        EmailAuthError::EmailDelivery(e) => {
            tracing::error!(error = %e, "access code delivery failed");
            ApiError::new(StatusCode::BAD_GATEWAY, "Failed to send access code email")
        }
        EmailAuthError::Database(e) => ApiError::internal(e),
    }
}

fn rate_limit_error_to_api(err: RateLimitError) -> ApiError {
    ApiError::new(StatusCode::TOO_MANY_REQUESTS, format!("Too many access code requests: {err}"))
}

/// `POST /api/v1/auth/email/request-code`: email a one-time access code.
pub async fn request_email_code(
    State(state): State<AppState>,
    Json(body): Json<RequestCodeBody>,
) -> Result<impl IntoResponse, ApiError> {
    let email = email_auth::normalize_email(&body.email).ok_or_else(|| ApiError::bad_request("Invalid email address"))?;
    state
        .rate_limiter
        .check_and_record(&email)
        .map_err(rate_limit_error_to_api)?;

    let (email, code) = email_auth::request_access_code(&state.pool, &email)
        .await
        .map_err(email_auth_error_to_api)?;
    email_auth::send_access_code_email(state.mailer.as_ref(), &state.config.app_name, &email, &code)
        .await
        .map_err(email_auth_error_to_api)?;

    Ok((
        StatusCode::ACCEPTED,
        ApiResponse::ok("Access code sent", RequestCodeData { email, expires_in_seconds: 600 }),
    ))
}

#[derive(Deserialize)]
pub struct VerifyCodeBody {
    pub email: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifyCodeData {
    pub token: String,
    pub user: User,
}

/// `POST /api/v1/auth/email/verify-code`: exchange a code for a session token.
pub async fn verify_email_code(
    State(state): State<AppState>,
    Json(body): Json<VerifyCodeBody>,
) -> Result<impl IntoResponse, ApiError> {
    let email = email_auth::verify_access_code(&state.pool, &body.email, &body.code)
        .await
        .map_err(email_auth_error_to_api)?;

    let metadata = UserMetadata { name: Some(email_auth::name_from_email(&email)), avatar_url: None };
    let user = auth_svc::get_or_create_user(&state.pool, &email, Uuid::new_v4(), &metadata)
        .await
        .map_err(auth_error_to_api)?;
    let token = session::issue_token(&state.config.jwt, &user).map_err(token_error_to_api)?;

    let max_age = Duration::seconds(i64::try_from(state.config.jwt.ttl.as_secs()).unwrap_or(i64::MAX));
    let jar = CookieJar::new().add(session_cookie(token.clone(), max_age, state.config.cookie_secure));
    tracing::info!(user_id = %user.id, "email login succeeded");

    Ok((jar, ApiResponse::ok("Login successful", VerifyCodeData { token, user })))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
