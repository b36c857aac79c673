//! Application configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Configuration is read once at startup (after `dotenvy` has loaded any
//! `.env` file) and shared through `AppState`. Parsing goes through a lookup
//! closure so tests can feed a map instead of mutating the process env.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_APP_NAME: &str = "Workshop Hub";
pub const DEFAULT_JWT_AUDIENCE: &str = "authenticated";
pub const DEFAULT_JWT_TTL_SECS: u64 = 7 * 24 * 3600;
pub const DEFAULT_EMAIL_FROM: &str = "Workshop Hub <noreply@example.com>";
pub const DEFAULT_MAX_REVIEW_LENGTH: usize = 1000;
pub const DEFAULT_REMINDER_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_REMINDER_SEND_CONCURRENCY: usize = 4;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// JWT signing and validation settings.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub audience: String,
    pub ttl: Duration,
}

/// Outbound email settings. `api_key` is `None` when delivery is disabled.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_key: Option<String>,
    pub from: String,
}

/// Review moderation switches and extra word list.
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    pub enabled: bool,
    pub spam_detection: bool,
    pub max_review_length: usize,
    pub bad_words: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub app_name: String,
    pub debug: bool,
    /// `Secure` attribute on the session cookie. Defaults to `!debug`.
    pub cookie_secure: bool,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub moderation: ModerationConfig,
    /// Period of the background reminder sweep. `None` disables it.
    pub reminder_interval: Option<Duration>,
    pub reminder_send_concurrency: usize,
}

impl AppConfig {
    /// Build typed config from the process environment.
    ///
    /// Required:
    /// - `DATABASE_URL`
    /// - `JWT_SECRET` (falls back to `SECRET_KEY`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required variable is missing or empty,
    /// or a numeric variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let database_url = non_empty("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let secret = non_empty("JWT_SECRET")
            .or_else(|| non_empty("SECRET_KEY"))
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let port = parse_or("PORT", non_empty("PORT"), DEFAULT_PORT)?;
        let ttl_secs = parse_or("JWT_TTL_SECS", non_empty("JWT_TTL_SECS"), DEFAULT_JWT_TTL_SECS)?;
        let max_review_length =
            parse_or("MAX_REVIEW_LENGTH", non_empty("MAX_REVIEW_LENGTH"), DEFAULT_MAX_REVIEW_LENGTH)?;
        let reminder_secs =
            parse_or("REMINDER_INTERVAL_SECS", non_empty("REMINDER_INTERVAL_SECS"), DEFAULT_REMINDER_INTERVAL_SECS)?;
        let reminder_send_concurrency = parse_or(
            "REMINDER_SEND_CONCURRENCY",
            non_empty("REMINDER_SEND_CONCURRENCY"),
            DEFAULT_REMINDER_SEND_CONCURRENCY,
        )?
        .max(1);

        let flag = |key: &str, default: bool| non_empty(key).and_then(|v| parse_bool(&v)).unwrap_or(default);
        let debug = flag("DEBUG", false);

        Ok(Self {
            database_url,
            port,
            app_name: non_empty("APP_NAME").unwrap_or_else(|| DEFAULT_APP_NAME.to_owned()),
            debug,
            cookie_secure: flag("COOKIE_SECURE", !debug),
            jwt: JwtConfig {
                secret,
                audience: non_empty("JWT_AUDIENCE").unwrap_or_else(|| DEFAULT_JWT_AUDIENCE.to_owned()),
                ttl: Duration::from_secs(ttl_secs),
            },
            email: EmailConfig {
                api_key: non_empty("RESEND_API_KEY"),
                from: non_empty("EMAIL_FROM").unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_owned()),
            },
            moderation: ModerationConfig {
                enabled: flag("ENABLE_CONTENT_MODERATION", true),
                spam_detection: flag("ENABLE_SPAM_DETECTION", true),
                max_review_length,
                bad_words: non_empty("BAD_WORDS")
                    .map(|raw| parse_word_list(&raw))
                    .unwrap_or_default(),
            },
            reminder_interval: (reminder_secs > 0).then(|| Duration::from_secs(reminder_secs)),
            reminder_send_concurrency,
        })
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Split a comma-separated word list, lowercasing and dropping blanks.
#[must_use]
pub fn parse_word_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().and_then(|raw| parse_bool(&raw))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
