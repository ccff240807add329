/// Task endpoints
///
/// All routes require authentication. Mutations go through
/// [`TaskService`](collabtask_shared::service::TaskService), which persists,
/// records side effects and fans the change out to realtime connections
/// before the response is sent.
///
/// - `POST   /api/tasks` - Create a task (201)
/// - `GET    /api/tasks` - Every task with creator and assignee
/// - `PUT    /api/tasks/:id` - Partial update
/// - `DELETE /api/tasks/:id` - Delete (204), creator only
/// - `GET    /api/tasks/:id/audit` - Audit entries, oldest first

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use collabtask_shared::auth::AuthContext;
use collabtask_shared::models::{AuditLog, CreateTaskInput, Task, TaskDetails, TaskPatch};
use uuid::Uuid;
use validator::Validate;

use crate::{app::AppState, error::ApiResult};

/// Create a task assigned by email
///
/// Any `status` in the body is ignored; the task starts in `TODO`.
///
/// # Errors
///
/// - `404 Not Found`: No user with the assignee email
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskInput>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let task = state.tasks.create_task(req, auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(State(state): State<AppState>) -> ApiResult<Json<Vec<TaskDetails>>> {
    Ok(Json(state.tasks.list_tasks().await?))
}

/// Apply a partial update
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a participant, or the assignee sent a
///   field other than `status`
/// - `404 Not Found`: Unknown task or new assignee email
/// - `409 Conflict`: The task changed concurrently
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(patch): Json<TaskPatch>,
) -> ApiResult<Json<Task>> {
    patch.validate()?;

    let task = state.tasks.update_task(task_id, patch, auth.user_id).await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.tasks.delete_task(task_id, auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn task_audit_trail(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Vec<AuditLog>>> {
    Ok(Json(state.tasks.task_audit_trail(task_id).await?))
}
