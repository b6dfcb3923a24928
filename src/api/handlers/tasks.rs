//! Calendar task CRUD, scoped to the session user.
//!
//! Task dates are literal `YYYY-MM-DD` strings end to end; the client's date
//! grid owns their meaning and the server never parses them into real dates.

use anyhow::{Context, Result};
use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::{error, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::principal::require_auth;
use super::auth::types::{MessageResponse, StatusResponse};

/// Task categories understood by the calendar grid.
const TASK_TYPES: [&str; 5] = ["homework", "lecture/meetings", "general", "free time", "other"];

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateTaskRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub time: String,
    pub date: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskResponse {
    pub success: bool,
    pub message: String,
    pub task_id: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TaskResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub time: String,
    pub date: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ListTasksResponse {
    pub success: bool,
    pub tasks: Vec<TaskResponse>,
}

#[derive(Deserialize, Debug)]
pub struct ListTasksQuery {
    pub date: String,
}

fn valid_task_date(date: &str) -> bool {
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").is_ok_and(|regex| regex.is_match(date))
}

fn valid_task_type(task_type: &str) -> bool {
    TASK_TYPES.contains(&task_type)
}

#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = CreateTaskResponse),
        (status = 400, description = "Validation error", body = MessageResponse),
        (status = 401, description = "Missing or invalid session")
    ),
    tag = "tasks"
)]
pub async fn create_task(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    payload: Option<Json<CreateTaskRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let Some(Json(request)) = payload else {
        return bad_request("Missing payload");
    };

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return bad_request("Task name is required");
    }
    if !valid_task_type(&request.task_type) {
        return bad_request("Unknown task type");
    }
    if !valid_task_date(&request.date) {
        return bad_request("Date must be YYYY-MM-DD");
    }

    match insert_task(&pool, principal.user_id, &name, &request).await {
        Ok(task_id) => (
            StatusCode::CREATED,
            Json(CreateTaskResponse {
                success: true,
                message: "Task created".to_string(),
                task_id: task_id.to_string(),
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to create task: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/tasks",
    params(("date" = String, Query, description = "Calendar day as YYYY-MM-DD")),
    responses(
        (status = 200, description = "Tasks for the given day", body = ListTasksResponse),
        (status = 400, description = "Invalid date", body = MessageResponse),
        (status = 401, description = "Missing or invalid session")
    ),
    tag = "tasks"
)]
pub async fn list_tasks(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    Query(query): Query<ListTasksQuery>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    if !valid_task_date(&query.date) {
        return bad_request("Date must be YYYY-MM-DD");
    }

    match fetch_tasks(&pool, principal.user_id, &query.date).await {
        Ok(tasks) => (
            StatusCode::OK,
            Json(ListTasksResponse {
                success: true,
                tasks,
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to list tasks: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{task_id}",
    params(("task_id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task deleted", body = StatusResponse),
        (status = 401, description = "Missing or invalid session"),
        (status = 404, description = "Task not found", body = MessageResponse)
    ),
    tag = "tasks"
)]
pub async fn delete_task(
    Path(task_id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    // An unparseable id can't belong to anyone.
    let Ok(task_id) = Uuid::parse_str(task_id.trim()) else {
        return not_found("Task not found");
    };

    match delete_task_row(&pool, principal.user_id, task_id).await {
        Ok(true) => (
            StatusCode::OK,
            Json(StatusResponse {
                success: true,
                message: "Task deleted".to_string(),
            }),
        )
            .into_response(),
        Ok(false) => not_found("Task not found"),
        Err(err) => {
            error!("Failed to delete task: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn bad_request(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(MessageResponse {
            message: message.to_string(),
        }),
    )
        .into_response()
}

fn not_found(message: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(MessageResponse {
            message: message.to_string(),
        }),
    )
        .into_response()
}

async fn insert_task(
    pool: &PgPool,
    user_id: Uuid,
    name: &str,
    request: &CreateTaskRequest,
) -> Result<Uuid> {
    let query = r"
        INSERT INTO calendar_tasks (user_id, name, description, task_type, task_time, task_date)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(name)
        .bind(request.description.trim())
        .bind(&request.task_type)
        .bind(request.time.trim())
        .bind(&request.date)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert task")?;
    Ok(row.get("id"))
}

async fn fetch_tasks(pool: &PgPool, user_id: Uuid, date: &str) -> Result<Vec<TaskResponse>> {
    let query = r"
        SELECT id, name, description, task_type, task_time, task_date
        FROM calendar_tasks
        WHERE user_id = $1
          AND task_date = $2
        ORDER BY created_at ASC
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(user_id)
        .bind(date)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list tasks")?;

    Ok(rows
        .into_iter()
        .map(|row| TaskResponse {
            id: row.get::<Uuid, _>("id").to_string(),
            name: row.get("name"),
            description: row.get("description"),
            task_type: row.get("task_type"),
            time: row.get("task_time"),
            date: row.get("task_date"),
        })
        .collect())
}

async fn delete_task_row(pool: &PgPool, user_id: Uuid, task_id: Uuid) -> Result<bool> {
    // Ownership is enforced in the query itself; someone else's task id
    // behaves exactly like a missing one.
    let query = "DELETE FROM calendar_tasks WHERE id = $1 AND user_id = $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(task_id)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete task")?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::extract::{Extension, Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;

    #[test]
    fn task_dates_are_literal_strings() {
        assert!(valid_task_date("2025-01-31"));
        assert!(valid_task_date("1999-12-01"));
        assert!(!valid_task_date("2025-1-31"));
        assert!(!valid_task_date("31-01-2025"));
        assert!(!valid_task_date("2025-01-31T00:00:00Z"));
        assert!(!valid_task_date(""));
    }

    #[test]
    fn task_types_match_the_grid() {
        assert!(valid_task_type("homework"));
        assert!(valid_task_type("lecture/meetings"));
        assert!(valid_task_type("free time"));
        assert!(!valid_task_type("Homework"));
        assert!(!valid_task_type("chores"));
    }

    #[test]
    fn create_request_accepts_frontend_fields() -> Result<()> {
        let request: CreateTaskRequest = serde_json::from_str(
            r#"{"name":"essay","type":"homework","date":"2025-01-31"}"#,
        )?;
        assert_eq!(request.task_type, "homework");
        assert_eq!(request.description, "");
        assert_eq!(request.time, "");
        Ok(())
    }

    #[tokio::test]
    async fn create_task_requires_session() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = create_task(HeaderMap::new(), Extension(pool), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn list_tasks_requires_session() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = list_tasks(
            HeaderMap::new(),
            Extension(pool),
            Query(ListTasksQuery {
                date: "2025-01-31".to_string(),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn delete_task_requires_session() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = delete_task(
            Path("00000000-0000-0000-0000-000000000000".to_string()),
            HeaderMap::new(),
            Extension(pool),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
