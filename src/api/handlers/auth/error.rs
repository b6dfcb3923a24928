//! Error kinds surfaced by the auth endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::error;

use super::types::MessageResponse;

/// Everything an auth request can fail with. Each variant maps to a status
/// code and a user-facing message.
///
/// Unknown identifier and wrong password share `InvalidCredentials` so the
/// response never reveals which field was wrong (account enumeration).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username already exists - try another")]
    DuplicateUsername,
    #[error("Email already exists")]
    DuplicateEmail,
    #[error("Username/email or password incorrect")]
    InvalidCredentials,
    #[error("Account not found")]
    AccountNotFound,
    #[error("No verification code issued for this account")]
    NoCodeIssued,
    #[error("Verification code has expired")]
    CodeExpired,
    #[error("Incorrect verification code")]
    CodeIncorrect,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("New password must be different from the current password")]
    DuplicatePassword,
    #[error("{0}")]
    Validation(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Internal server error")]
    Server(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::DuplicateUsername
            | Self::DuplicateEmail
            | Self::CodeExpired
            | Self::CodeIncorrect
            | Self::PasswordMismatch
            | Self::DuplicatePassword
            | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::AccountNotFound | Self::NoCodeIssued => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Server(err) = &self {
            // The cause stays in the logs; callers only see a generic message.
            error!("auth request failed: {err:#}");
        }
        let message = self.to_string();
        (self.status(), Json(MessageResponse { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn statuses_match_kinds() {
        assert_eq!(AuthError::DuplicateUsername.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::DuplicateEmail.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::AccountNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AuthError::NoCodeIssued.status(), StatusCode::NOT_FOUND);
        assert_eq!(AuthError::CodeExpired.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::CodeIncorrect.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::PasswordMismatch.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::DuplicatePassword.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::Validation("bad".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::RateLimited.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AuthError::Server(anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn credentials_message_does_not_name_the_field() {
        let message = AuthError::InvalidCredentials.to_string();
        assert!(!message.to_lowercase().contains("unknown"));
        assert!(message.contains("or password"));
    }

    #[test]
    fn server_error_hides_cause() {
        let message = AuthError::Server(anyhow!("connection refused")).to_string();
        assert_eq!(message, "Internal server error");
    }

    #[test]
    fn response_carries_status() {
        let response = AuthError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
