/// Task endpoints
///
/// All routes require a bearer token. A task the caller may not edit answers
/// 404, exactly like a task that does not exist.
///
/// # Endpoints
///
/// - `GET /v1/tasks` - Tasks visible to the caller (all of them for an admin)
/// - `POST /v1/tasks` - Create a task owned by the caller
/// - `GET /v1/tasks/:id` - Show a task with its attachment
/// - `PATCH /v1/tasks/:id` - Change name, description or attachment
/// - `DELETE /v1/tasks/:id` - Delete a task and its attachment
/// - `POST /v1/tasks/:id/events/:event` - Fire `start` or `finish`
///
/// # Task JSON
///
/// ```json
/// {
///   "id": "uuid",
///   "user_id": "uuid",
///   "name": "Write report",
///   "description": null,
///   "state": "new",
///   "events": ["start"],
///   "assigned": true,
///   "editable": true,
///   "attachment": null,
///   "created_at": "2024-01-01T00:00:00Z",
///   "updated_at": "2024-01-01T00:00:00Z"
/// }
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use taskman_shared::{
    auth::{
        authorization::{assigned, editable},
        middleware::CurrentUser,
    },
    models::{
        attachment::Attachment,
        task::{NewTask, Task, TaskChanges, TaskEvent, TaskState},
        user::User,
    },
};
use uuid::Uuid;

/// A task as seen by the requesting user
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub state: TaskState,

    /// Events that are legal from `state`
    pub events: Vec<TaskEvent>,

    /// The requester owns the task
    pub assigned: bool,

    /// The requester may change the task
    pub editable: bool,

    /// Omitted in listings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskResponse {
    fn new(task: Task, requester: &User, attachment: Option<Attachment>) -> Self {
        Self {
            events: task.state.events(),
            assigned: assigned(&task, requester),
            editable: editable(&task, requester),
            id: task.id,
            user_id: task.user_id,
            name: task.name,
            description: task.description,
            state: task.state,
            attachment,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Outcome of firing an event
#[derive(Debug, Serialize)]
pub struct EventResponse {
    /// The task as it now stands
    pub task: TaskResponse,

    /// False when the event was not legal from the task's state
    pub changed: bool,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let tasks = state.tasks.visible_tasks_for(&user).await?;

    Ok(Json(
        tasks
            .into_iter()
            .map(|task| TaskResponse::new(task, &user, None))
            .collect(),
    ))
}

/// Create handler
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Blank name, a `state` other than `new`, or an
///   attachment without a file name
pub async fn create_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(form): Json<NewTask>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let task = state.tasks.create(&user, form).await?;
    let attachment = state.tasks.attachment(&user, task.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(TaskResponse::new(task, &user, attachment)),
    ))
}

pub async fn show_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state
        .tasks
        .find_editable(&user, id)
        .await?
        .ok_or_else(task_not_found)?;
    let attachment = state.tasks.attachment(&user, id).await?;

    Ok(Json(TaskResponse::new(task, &user, attachment)))
}

/// Update handler
///
/// Sending a `state` different from the current one is a validation error;
/// lifecycle moves go through the events endpoint.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(changes): Json<TaskChanges>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state
        .tasks
        .update(&user, id, changes)
        .await?
        .ok_or_else(task_not_found)?;
    let attachment = state.tasks.attachment(&user, id).await?;

    Ok(Json(TaskResponse::new(task, &user, attachment)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.tasks.delete(&user, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(task_not_found())
    }
}

/// Fires a lifecycle event
///
/// An illegal or unknown event is not an error: the response carries
/// `changed: false` and the unchanged task.
pub async fn fire_event(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((id, event)): Path<(Uuid, String)>,
) -> ApiResult<Json<EventResponse>> {
    let (task, changed) = state
        .tasks
        .fire(&user, id, &event)
        .await?
        .ok_or_else(task_not_found)?;
    let attachment = state.tasks.attachment(&user, id).await?;

    Ok(Json(EventResponse {
        task: TaskResponse::new(task, &user, attachment),
        changed,
    }))
}

fn task_not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}
