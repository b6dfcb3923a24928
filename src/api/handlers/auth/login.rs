//! Credential login and the verification state machine.
//!
//! A verified account gets a session cookie; an unverified one gets a fresh
//! verification code and is routed back to the OTP step.

use anyhow::anyhow;
use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use sqlx::PgPool;
use std::sync::Arc;

use super::error::AuthError;
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::session::session_cookie;
use super::state::AuthState;
use super::storage::{insert_session, lookup_user_by_identifier, reissue_otp};
use super::types::{LoginPendingResponse, LoginRequest, LoginVerifiedResponse, MessageResponse};
use super::utils::{extract_client_ip, normalize_email, verify_password};

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success (verified) or verification pending", body = LoginVerifiedResponse),
        (status = 401, description = "Unknown identifier or wrong password", body = MessageResponse),
        (status = 429, description = "Rate limited", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };

    let identifier = request.username.trim().to_string();
    if identifier.is_empty() || request.password.is_empty() {
        return Err(AuthError::Validation("Missing credentials".to_string()));
    }

    let email_normalized = normalize_email(&identifier);
    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::Login)
        == RateLimitDecision::Limited
        || auth_state
            .rate_limiter()
            .check_email(&email_normalized, RateLimitAction::Login)
            == RateLimitDecision::Limited
    {
        return Err(AuthError::RateLimited);
    }

    // Unknown identifier and wrong password produce the same error.
    let user = lookup_user_by_identifier(&pool, &identifier, &email_normalized)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(&request.password, &user.password_hash) {
        return Err(AuthError::InvalidCredentials);
    }

    if user.verified {
        let ttl_seconds = auth_state.config().session_ttl_seconds();
        let token = insert_session(&pool, user.id, ttl_seconds).await?;
        let cookie = session_cookie(&auth_state, &token)
            .map_err(|err| AuthError::Server(anyhow!("failed to build session cookie: {err}")))?;

        let mut response_headers = HeaderMap::new();
        response_headers.insert(SET_COOKIE, cookie);

        return Ok((
            StatusCode::OK,
            response_headers,
            Json(LoginVerifiedResponse {
                success: true,
                verified: true,
                user: user.public(),
            }),
        )
            .into_response());
    }

    // Unverified: swap in a fresh code and route the client to the OTP step.
    // No session is established.
    reissue_otp(&pool, &user, auth_state.config()).await?;

    Ok((
        StatusCode::OK,
        Json(LoginPendingResponse {
            success: true,
            verified: false,
            message: "Account not verified. A new verification code has been sent to your email"
                .to_string(),
            email: user.email,
            user_id: user.id.to_string(),
        }),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::super::rate_limit::NoopRateLimiter;
    use super::super::state::{AuthConfig, AuthState};
    use super::{login, LoginRequest};
    use anyhow::Result;
    use axum::extract::Extension;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::Json;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    fn auth_state() -> Arc<AuthState> {
        let config = AuthConfig::new("http://localhost:5173".to_string());
        Arc::new(AuthState::new(config, Arc::new(NoopRateLimiter)))
    }

    #[tokio::test]
    async fn login_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = login(HeaderMap::new(), Extension(pool), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn login_rejects_empty_credentials() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = login(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()),
            Some(Json(LoginRequest {
                username: "alice".to_string(),
                password: String::new(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
