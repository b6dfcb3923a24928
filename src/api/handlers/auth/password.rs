//! Password reset.
//!
//! TODO: gate this behind a verified one-time reset token; today any caller
//! who knows an account's email can rotate its password.

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
use super::storage::{lookup_user_by_email, rotate_password};
use super::types::{MessageResponse, ResetPasswordRequest, StatusResponse};
use super::utils::{
    extract_client_ip, hash_password, normalize_email, valid_email, verify_password,
    MIN_PASSWORD_LENGTH,
};

#[utoipa::path(
    post,
    path = "/api/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = StatusResponse),
        (status = 400, description = "Validation error, mismatch, or unchanged password", body = MessageResponse),
        (status = 404, description = "Unknown account", body = MessageResponse),
        (status = 429, description = "Rate limited", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };

    // Confirmation is checked before any store access.
    if request.new_password != request.confirm_password {
        return Err(AuthError::PasswordMismatch);
    }

    if request.new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(AuthError::Validation("Invalid email".to_string()));
    }

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::ResetPassword)
        == RateLimitDecision::Limited
        || auth_state
            .rate_limiter()
            .check_email(&email, RateLimitAction::ResetPassword)
            == RateLimitDecision::Limited
    {
        return Err(AuthError::RateLimited);
    }

    let user = lookup_user_by_email(&pool, &email)
        .await?
        .ok_or(AuthError::AccountNotFound)?;

    if verify_password(&request.new_password, &user.password_hash) {
        return Err(AuthError::DuplicatePassword);
    }

    let password_hash = hash_password(&request.new_password)?;
    rotate_password(&pool, user.id, &password_hash).await?;

    Ok((
        StatusCode::OK,
        Json(StatusResponse {
            success: true,
            message: "Password reset successfully".to_string(),
        }),
    )
        .into_response())
}
