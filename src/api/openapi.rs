use crate::api::handlers::{auth, health, tasks};
use utoipa::OpenApi;

/// `OpenAPI` document for the taskaro API, served by Swagger UI and the
/// `openapi` binary.
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::signup::signup,
        auth::login::login,
        auth::verification::verify_otp,
        auth::verification::resend_otp,
        auth::password::reset_password,
        auth::session::auth_status,
        auth::session::logout,
        tasks::create_task,
        tasks::list_tasks,
        tasks::delete_task,
    ),
    components(schemas(
        health::Health,
        auth::types::SignupRequest,
        auth::types::SignupResponse,
        auth::types::LoginRequest,
        auth::types::LoginVerifiedResponse,
        auth::types::LoginPendingResponse,
        auth::types::VerifyOtpRequest,
        auth::types::VerifyOtpResponse,
        auth::types::ResendOtpRequest,
        auth::types::ResetPasswordRequest,
        auth::types::AuthStatusResponse,
        auth::types::MessageResponse,
        auth::types::StatusResponse,
        auth::types::PublicUser,
        tasks::CreateTaskRequest,
        tasks::CreateTaskResponse,
        tasks::ListTasksResponse,
        tasks::TaskResponse,
    )),
    tags(
        (name = "taskaro", description = "Accounts and calendar task API"),
        (name = "auth", description = "Signup, login, and OTP verification"),
        (name = "tasks", description = "Per-user calendar tasks"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::ApiDoc;
    use utoipa::OpenApi;

    #[test]
    fn openapi_paths_registered() {
        let spec = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/signup",
            "/api/login",
            "/api/verify-otp",
            "/api/resend-otp",
            "/api/reset-password",
            "/api/auth-status",
            "/api/logout",
            "/api/tasks",
            "/api/tasks/{task_id}",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing path: {path}");
        }
    }

    #[test]
    fn openapi_tags_registered() {
        let spec = ApiDoc::openapi();
        let tags = spec.tags.clone().unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "auth"));
        assert!(tags.iter().any(|tag| tag.name == "tasks"));
    }
}
