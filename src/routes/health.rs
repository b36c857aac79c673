//! Liveness and status endpoints. None of these touch the database.

use axum::extract::State;
use axum::response::Json;
use serde_json::{Value, json};

use crate::ist;
use crate::state::AppState;

const API_VERSION: &str = "v1";

/// `GET /`
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let app_name = &state.config.app_name;
    Json(json!({
        "message": format!("Welcome to {app_name}!"),
        "description": "Workshop management backend API",
        "status": "online",
        "current_time_ist": ist::format_ist_seconds(ist::now_ist()),
        "api_info": {
            "version": API_VERSION,
            "base_url": "/api/v1",
            "health": "/api/v1/health",
        },
    }))
}

/// `GET /api/v1/health`
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let app_name = &state.config.app_name;
    Json(json!({
        "status": "healthy",
        "message": format!("{app_name} is running successfully!"),
        "app_name": app_name,
        "debug_mode": state.config.debug,
        "current_time_ist": ist::format_ist_seconds(ist::now_ist()),
        "timezone": "Asia/Kolkata",
        "api_version": API_VERSION,
        "endpoints": {
            "auth": "/api/v1/auth",
            "users": "/api/v1/users",
            "workshops": "/api/v1/workshops",
            "registration": "/api/v1/user-workshop",
            "notifications": "/api/v1/notifications",
            "health": "/api/v1/health",
        },
    }))
}

/// `GET /api/v1/health/status`
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let now = ist::now_ist();
    let debug = state.config.debug;
    Json(json!({
        "system_status": "operational",
        "uptime_info": "Server is running",
        "server_time": {
            "ist": ist::format_ist_seconds(now),
            "utc": ist::format_utc_seconds(now),
            "timestamp": now.unix_timestamp(),
        },
        "application": {
            "name": state.config.app_name,
            "debug": debug,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "features": {
            "authentication": "active",
            "workshops": "active",
            "reminders": if state.config.reminder_interval.is_some() { "scheduled" } else { "manual" },
            "cors": "configured",
            "logging": "active",
        },
        "environment": if debug { "development" } else { "production" },
    }))
}

#[cfg(test)]
#[path = "health_test.rs"]
mod tests;
