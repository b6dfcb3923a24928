//! API handlers for taskaro.
//!
//! Auth endpoints (signup, login, OTP verification, password reset, sessions)
//! live under `auth`; per-user calendar task CRUD under `tasks`.

pub mod auth;
pub mod health;
pub mod tasks;
