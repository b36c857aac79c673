//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every API route lives under `/api/v1`. The welcome document is served at
//! `/`. CORS, gzip compression, and request tracing wrap the whole router.
//! Access rules are enforced by the extractors each handler declares
//! (`AuthUser`, `RegisteredUser`, `AdminUser`), not by route groups.

pub mod assignments;
pub mod auth;
pub mod certificates;
pub mod enrollments;
pub mod health;
pub mod leaderboard;
pub mod notifications;
pub mod response;
pub mod reviews;
pub mod users;
pub mod workshops;

use axum::Router;
use axum::http::Method;
use axum::routing::{delete, get, patch, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use self::response::ApiError;
use crate::state::AppState;

fn api_routes() -> Router<AppState> {
    Router::new()
        // auth
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/email/request-code", post(auth::request_email_code))
        .route("/auth/email/verify-code", post(auth::verify_email_code))
        // users
        .route("/users", get(users::list))
        .route("/users/me", get(users::me).patch(users::update_me))
        .route("/users/me/profile-status", get(users::profile_status))
        .route("/users/search", get(users::search))
        .route("/users/{id}", delete(users::deactivate))
        .route("/users/{id}/points", post(users::add_points))
        // workshops
        .route("/workshops", get(workshops::list).post(workshops::create))
        .route("/workshops/stats", get(workshops::stats))
        .route("/workshops/upcoming", get(workshops::upcoming))
        .route("/workshops/technology/{tech}", get(workshops::by_technology))
        .route(
            "/workshops/{id}",
            get(workshops::get_one).patch(workshops::update).delete(workshops::delete),
        )
        // registration
        .route("/user-workshop/register/registered-user", post(enrollments::register_registered_user))
        .route("/user-workshop/register/guest", post(enrollments::register_guest))
        .route("/user-workshop/workshop/{id}/participants", get(enrollments::participants))
        .route("/user-workshop/user/workshops", get(enrollments::my_workshops))
        .route("/user-workshop/reminder-status", patch(enrollments::update_reminder_status))
        .route("/user-workshop/unregister/{workshop_id}", delete(enrollments::unregister))
        // assignments
        .route("/assignments", get(assignments::list))
        .route("/assignments/me", get(assignments::mine))
        .route("/assignments/workshop/{id}/submit", post(assignments::submit))
        .route("/assignments/workshop/{id}/me", get(assignments::mine_for_workshop))
        .route("/assignments/workshop/{id}/stats", get(assignments::stats))
        .route("/assignments/{id}", get(assignments::get_one))
        .route("/assignments/{id}/grade", patch(assignments::grade))
        // reviews
        .route("/reviews", post(reviews::create))
        .route("/reviews/me", get(reviews::mine))
        .route("/reviews/workshop/{id}", get(reviews::for_workshop))
        .route("/reviews/workshop/{id}/stats", get(reviews::workshop_stats))
        .route("/reviews/{id}", patch(reviews::update).delete(reviews::delete))
        // certificates
        .route("/certificates/me", get(certificates::mine))
        .route("/certificates/{id}", get(certificates::get_one))
        // leaderboard
        .route("/leaderboard", get(leaderboard::board))
        .route("/leaderboard/top", get(leaderboard::top))
        .route("/leaderboard/me", get(leaderboard::my_rank))
        .route("/leaderboard/user/{id}", get(leaderboard::user_rank))
        // notifications
        .route("/notifications/send-1day-reminders", post(notifications::send_1day))
        .route("/notifications/send-15min-reminders", post(notifications::send_15min))
        .route("/notifications/send-welcome-email", post(notifications::send_welcome))
        .route("/notifications/update-reminder-status", post(notifications::update_reminder_status))
        .route("/notifications/stats", get(notifications::stats))
        .route("/notifications/pending-1day-reminders", get(notifications::pending_1day))
        .route("/notifications/pending-15min-reminders", get(notifications::pending_15min))
        .route("/notifications/cron/1day-reminders", post(notifications::cron_1day))
        .route("/notifications/cron/15min-reminders", post(notifications::cron_15min))
        // health
        .route("/health", get(health::health))
        .route("/health/status", get(health::status))
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

/// The full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/", get(health::root))
        .nest("/api/v1", api_routes())
        .fallback(not_found)
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
