//! Account registration.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use sqlx::PgPool;
use std::sync::Arc;

use super::error::AuthError;
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::state::AuthState;
use super::storage::{insert_user_and_otp, SignupOutcome};
use super::types::{MessageResponse, SignupRequest, SignupResponse};
use super::utils::{
    extract_client_ip, hash_password, normalize_email, valid_email, MIN_PASSWORD_LENGTH,
};

#[utoipa::path(
    post,
    path = "/api/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Account created, verification pending", body = SignupResponse),
        (status = 400, description = "Validation error or duplicate username/email", body = MessageResponse),
        (status = 429, description = "Rate limited", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn signup(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignupRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };

    let username = request.username.trim().to_string();
    if username.is_empty() {
        return Err(AuthError::Validation("Missing username".to_string()));
    }

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(AuthError::Validation("Invalid email".to_string()));
    }

    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::Signup)
        == RateLimitDecision::Limited
        || auth_state
            .rate_limiter()
            .check_email(&email, RateLimitAction::Signup)
            == RateLimitDecision::Limited
    {
        return Err(AuthError::RateLimited);
    }

    let password_hash = hash_password(&request.password)?;

    // Uniqueness is decided by the insert itself; no read-then-write race.
    match insert_user_and_otp(&pool, &username, &email, &password_hash, auth_state.config())
        .await?
    {
        SignupOutcome::Created(user_id) => Ok((
            StatusCode::OK,
            Json(SignupResponse {
                success: true,
                message: "Account created, verification code sent to your email".to_string(),
                email,
                user_id: user_id.to_string(),
            }),
        )
            .into_response()),
        SignupOutcome::DuplicateUsername => Err(AuthError::DuplicateUsername),
        SignupOutcome::DuplicateEmail => Err(AuthError::DuplicateEmail),
    }
}
