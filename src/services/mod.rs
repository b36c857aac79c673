//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on request parsing, auth gates, and mapping
//! typed errors to status codes.

pub mod assignment;
pub mod auth;
pub mod certificate;
pub mod email_auth;
pub mod enrollment;
pub mod leaderboard;
pub mod notification;
pub mod reminder;
pub mod review;
pub mod session;
pub mod user;
pub mod workshop;
