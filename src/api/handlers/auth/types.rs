//! Request/response types for auth endpoints.
//!
//! Field names follow the calendar frontend's JSON contract (camelCase,
//! `userId`, `newPassword`, ...).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub success: bool,
    pub message: String,
    pub email: String,
    pub user_id: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    /// Username or email; both are accepted.
    pub username: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginVerifiedResponse {
    pub success: bool,
    pub verified: bool,
    pub user: PublicUser,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginPendingResponse {
    pub success: bool,
    pub verified: bool,
    pub message: String,
    pub email: String,
    pub user_id: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub message: String,
    pub user: PublicUser,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResendOtpRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusResponse {
    pub is_authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicUser>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

/// Generic `{success, message}` body for resend/reset/logout.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

/// Account fields safe to return to the client.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn signup_response_uses_camel_case() -> Result<()> {
        let response = SignupResponse {
            success: true,
            message: "ok".to_string(),
            email: "a@x.com".to_string(),
            user_id: "42".to_string(),
        };
        let value = serde_json::to_value(&response)?;
        assert!(value.get("userId").is_some());
        assert!(value.get("user_id").is_none());
        Ok(())
    }

    #[test]
    fn reset_password_request_accepts_frontend_fields() -> Result<()> {
        let request: ResetPasswordRequest = serde_json::from_str(
            r#"{"email":"a@x.com","newPassword":"password1","confirmPassword":"password1"}"#,
        )?;
        assert_eq!(request.new_password, "password1");
        assert_eq!(request.confirm_password, "password1");
        Ok(())
    }

    #[test]
    fn auth_status_omits_missing_user() -> Result<()> {
        let response = AuthStatusResponse {
            is_authenticated: false,
            user: None,
        };
        let value = serde_json::to_value(&response)?;
        assert!(value.get("user").is_none());
        assert_eq!(
            value
                .get("isAuthenticated")
                .and_then(serde_json::Value::as_bool),
            Some(false)
        );
        Ok(())
    }

    #[test]
    fn login_request_round_trips() -> Result<()> {
        let request = LoginRequest {
            username: "alice".to_string(),
            password: "password1".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let decoded: LoginRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.username, "alice");
        Ok(())
    }

    #[test]
    fn public_user_keeps_plain_field_names() -> Result<()> {
        let user = PublicUser {
            id: "1".to_string(),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
        };
        let value = serde_json::to_value(&user)?;
        let username = value
            .get("username")
            .and_then(serde_json::Value::as_str)
            .context("missing username")?;
        assert_eq!(username, "alice");
        Ok(())
    }
}
