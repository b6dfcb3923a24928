//! OTP verification endpoints.

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
use super::storage::{consume_otp, lookup_user_by_email, reissue_otp, VerifyOutcome};
use super::types::{
    MessageResponse, ResendOtpRequest, StatusResponse, VerifyOtpRequest, VerifyOtpResponse,
};
use super::utils::{extract_client_ip, normalize_email, valid_email};

#[utoipa::path(
    post,
    path = "/api/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Account verified", body = VerifyOtpResponse),
        (status = 400, description = "Expired or incorrect code", body = MessageResponse),
        (status = 404, description = "Unknown account or no code issued", body = MessageResponse),
        (status = 429, description = "Rate limited", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn verify_otp(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(AuthError::Validation("Invalid email".to_string()));
    }

    let submitted = request.otp.trim().to_string();
    if submitted.is_empty() {
        return Err(AuthError::Validation("Missing code".to_string()));
    }

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::VerifyOtp)
        == RateLimitDecision::Limited
        || auth_state
            .rate_limiter()
            .check_email(&email, RateLimitAction::VerifyOtp)
            == RateLimitDecision::Limited
    {
        return Err(AuthError::RateLimited);
    }

    let user = lookup_user_by_email(&pool, &email)
        .await?
        .ok_or(AuthError::AccountNotFound)?;

    // The verified flag is the source of truth once set; re-verifying an
    // already-verified account is a no-op success.
    if user.verified {
        return Ok((
            StatusCode::OK,
            Json(VerifyOtpResponse {
                success: true,
                message: "Account already verified".to_string(),
                user: user.public(),
            }),
        )
            .into_response());
    }

    // Codes are numeric; anything else can never match.
    let Ok(submitted_code) = submitted.parse::<i32>() else {
        return Err(AuthError::CodeIncorrect);
    };

    match consume_otp(&pool, user.id, submitted_code).await? {
        VerifyOutcome::Verified => Ok((
            StatusCode::OK,
            Json(VerifyOtpResponse {
                success: true,
                message: "Email verified successfully".to_string(),
                user: user.public(),
            }),
        )
            .into_response()),
        VerifyOutcome::NoCode => Err(AuthError::NoCodeIssued),
        VerifyOutcome::Expired => Err(AuthError::CodeExpired),
        VerifyOutcome::Mismatch => Err(AuthError::CodeIncorrect),
    }
}

#[utoipa::path(
    post,
    path = "/api/resend-otp",
    request_body = ResendOtpRequest,
    responses(
        (status = 200, description = "Fresh code issued", body = StatusResponse),
        (status = 404, description = "Unknown account", body = MessageResponse),
        (status = 429, description = "Rate limited", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn resend_otp(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResendOtpRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(AuthError::Validation("Invalid email".to_string()));
    }

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::ResendOtp)
        == RateLimitDecision::Limited
        || auth_state
            .rate_limiter()
            .check_email(&email, RateLimitAction::ResendOtp)
            == RateLimitDecision::Limited
    {
        return Err(AuthError::RateLimited);
    }

    let user = lookup_user_by_email(&pool, &email)
        .await?
        .ok_or(AuthError::AccountNotFound)?;

    // Always replaces the pending code, whatever its state.
    reissue_otp(&pool, &user, auth_state.config()).await?;

    Ok((
        StatusCode::OK,
        Json(StatusResponse {
            success: true,
            message: "A new verification code has been sent to your email".to_string(),
        }),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::super::rate_limit::NoopRateLimiter;
    use super::super::state::{AuthConfig, AuthState};
    use super::{resend_otp, verify_otp, ResendOtpRequest, VerifyOtpRequest};
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
    async fn verify_otp_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = verify_otp(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_otp_rejects_invalid_email() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = verify_otp(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()),
            Some(Json(VerifyOtpRequest {
                email: "not-an-email".to_string(),
                otp: "1234".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_otp_rejects_blank_code() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = verify_otp(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()),
            Some(Json(VerifyOtpRequest {
                email: "a@x.com".to_string(),
                otp: "  ".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn resend_otp_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = resend_otp(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn resend_otp_rejects_invalid_email() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = resend_otp(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()),
            Some(Json(ResendOtpRequest {
                email: "missing-at.example.com".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
