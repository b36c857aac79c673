//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the database pool, the parsed config, the outbound mailer, the
//! review moderator, the access-code rate limiter, and one lock per reminder
//! kind. Nothing else is cached in memory; every request reads Postgres
//! directly.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::mail::Mailer;
use crate::moderation::Moderator;
use crate::rate_limit::RateLimiter;
use crate::services::notification::ReminderKind;

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    /// Outbound email. A disabled mailer is installed when no provider key is set.
    pub mailer: Arc<dyn Mailer>,
    pub moderator: Arc<Moderator>,
    /// In-memory rate limiter for access-code emails.
    pub rate_limiter: RateLimiter,
    /// Held for the whole of a reminder sweep so two sweeps of one kind never
    /// read the same unsent rows.
    pub sweep_locks: SweepLocks,
}

/// One sweep lock per reminder kind.
#[derive(Clone, Default)]
pub struct SweepLocks {
    one_day: Arc<Mutex<()>>,
    fifteen_min: Arc<Mutex<()>>,
}

impl SweepLocks {
    #[must_use]
    pub fn get(&self, kind: ReminderKind) -> &Mutex<()> {
        match kind {
            ReminderKind::OneDay => &self.one_day,
            ReminderKind::FifteenMin => &self.fifteen_min,
        }
    }
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, config: AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        let moderator = Moderator::from_config(&config.moderation);
        Self {
            pool,
            config: Arc::new(config),
            mailer,
            moderator: Arc::new(moderator),
            rate_limiter: RateLimiter::new(),
            sweep_locks: SweepLocks::default(),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
