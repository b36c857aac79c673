//! Workshop registration routes for registered users and guests.
//!
//! A successful registration schedules the welcome email on a detached task.
//! The response never waits on mail delivery.

use axum::extract::{Path, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth::{AdminUser, RegisteredUser};
use super::response::{ApiError, ApiResponse, ApiResult};
use crate::services::enrollment::{
    self, Enrollment, EnrollmentError, GuestRegistration, Registration, ReminderStatusUpdate, UserWorkshops,
    WorkshopParticipants,
};
use crate::services::notification;
use crate::state::AppState;

pub(crate) fn enrollment_error_to_api(err: EnrollmentError) -> ApiError {
    match err {
        EnrollmentError::WorkshopNotFound(_)
        | EnrollmentError::RelationNotFound
        | EnrollmentError::RegistrationNotFound => ApiError::not_found(err.to_string()),
        EnrollmentError::AlreadyRegistered | EnrollmentError::GuestAlreadyRegistered => {
            ApiError::conflict(err.to_string())
        }
        EnrollmentError::EmailBelongsToAccount | EnrollmentError::NoReminderFields => {
            ApiError::bad_request(err.to_string())
        }
        EnrollmentError::Validation(msg) => ApiError::bad_request(msg),
        EnrollmentError::Database(e) => ApiError::internal(e),
    }
}

fn spawn_welcome_email(state: AppState, user_id: Uuid, workshop_id: Uuid) {
    tokio::spawn(async move {
        if let Err(e) = notification::send_welcome(
            &state.pool,
            state.mailer.as_ref(),
            &state.config.app_name,
            user_id,
            workshop_id,
        )
        .await
        {
            tracing::warn!(%user_id, %workshop_id, error = %e, "welcome email not sent");
        }
    });
}

#[derive(Deserialize)]
pub struct RegisterBody {
    pub workshop_id: Uuid,
}

/// `POST /api/v1/user-workshop/register/registered-user`
pub async fn register_registered_user(
    State(state): State<AppState>,
    RegisteredUser(user): RegisteredUser,
    Json(body): Json<RegisterBody>,
) -> ApiResult<Registration> {
    let registration = enrollment::register_user(&state.pool, user.id, body.workshop_id)
        .await
        .map_err(enrollment_error_to_api)?;
    spawn_welcome_email(state, user.id, body.workshop_id);
    Ok(ApiResponse::ok("Registration successful with assignment created", registration))
}

/// `POST /api/v1/user-workshop/register/guest`
pub async fn register_guest(
    State(state): State<AppState>,
    Json(body): Json<GuestRegistration>,
) -> ApiResult<Registration> {
    let (registration, guest) = enrollment::register_guest(&state.pool, &body)
        .await
        .map_err(enrollment_error_to_api)?;
    spawn_welcome_email(state, guest.id, body.workshop_id);
    Ok(ApiResponse::ok("Guest registration successful with assignment created", registration))
}

/// `GET /api/v1/user-workshop/workshop/{id}/participants` (admin)
pub async fn participants(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(workshop_id): Path<Uuid>,
) -> ApiResult<WorkshopParticipants> {
    let list = enrollment::participants(&state.pool, workshop_id)
        .await
        .map_err(enrollment_error_to_api)?;
    Ok(ApiResponse::ok(format!("Found {} participants", list.total_participants), list))
}

/// `GET /api/v1/user-workshop/user/workshops`
pub async fn my_workshops(
    State(state): State<AppState>,
    RegisteredUser(user): RegisteredUser,
) -> ApiResult<UserWorkshops> {
    let list = enrollment::user_workshops(&state.pool, user.id)
        .await
        .map_err(enrollment_error_to_api)?;
    Ok(ApiResponse::ok(format!("Found {} registered workshops", list.total_workshops), list))
}

/// `PATCH /api/v1/user-workshop/reminder-status` (admin)
pub async fn update_reminder_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<ReminderStatusUpdate>,
) -> ApiResult<Enrollment> {
    let updated = enrollment::update_reminder_status(&state.pool, &body)
        .await
        .map_err(enrollment_error_to_api)?;
    Ok(ApiResponse::ok("Reminder status updated successfully", updated))
}

#[derive(Debug, Serialize)]
pub struct Unregistered {
    pub user_id: Uuid,
    pub workshop_id: Uuid,
    pub status: &'static str,
}

/// `DELETE /api/v1/user-workshop/unregister/{workshop_id}`
pub async fn unregister(
    State(state): State<AppState>,
    RegisteredUser(user): RegisteredUser,
    Path(workshop_id): Path<Uuid>,
) -> ApiResult<Unregistered> {
    enrollment::unregister(&state.pool, user.id, workshop_id)
        .await
        .map_err(enrollment_error_to_api)?;
    Ok(ApiResponse::ok(
        "Successfully unregistered from workshop",
        Unregistered { user_id: user.id, workshop_id, status: "unregistered" },
    ))
}

#[cfg(test)]
#[path = "enrollments_test.rs"]
mod tests;
