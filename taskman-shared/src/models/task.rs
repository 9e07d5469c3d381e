/// Task model and database operations
///
/// A task belongs to exactly one user and moves through a fixed lifecycle.
///
/// # State Machine
///
/// ```text
/// new ──start──> started ──finish──> finished
/// ```
///
/// The lifecycle lives in [`TRANSITIONS`]; adding a state or event means adding a row.
/// `finished` has no outgoing rows and is terminal.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_state AS ENUM ('new', 'started', 'finished');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     state task_state NOT NULL DEFAULT 'new',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```
/// use taskman_shared::models::task::{TaskEvent, TaskState};
///
/// assert_eq!(TaskState::New.next(TaskEvent::Start), Some(TaskState::Started));
/// assert_eq!(TaskState::New.next(TaskEvent::Finish), None);
/// assert!(TaskState::Finished.is_terminal());
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::attachment::AttachmentInput;
use super::ParseEnumError;
use crate::validation::{exceeds, too_long, ValidationErrors, BLANK, MAX_LENGTH, NOT_INCLUDED};

/// Lifecycle state of a task
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Created, not yet picked up
    #[default]
    New,

    /// Work in progress
    Started,

    /// Done; terminal
    Finished,
}

/// Named trigger that advances a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskEvent {
    Start,
    Finish,
}

/// Every legal `(from, event, to)` move
pub const TRANSITIONS: &[(TaskState, TaskEvent, TaskState)] = &[
    (TaskState::New, TaskEvent::Start, TaskState::Started),
    (TaskState::Started, TaskEvent::Finish, TaskState::Finished),
];

impl TaskState {
    pub const ALL: [TaskState; 3] = [TaskState::New, TaskState::Started, TaskState::Finished];

    /// Wire and database value
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::New => "new",
            TaskState::Started => "started",
            TaskState::Finished => "finished",
        }
    }

    /// State reached by applying `event`, or `None` if the table has no such move
    pub fn next(&self, event: TaskEvent) -> Option<TaskState> {
        TRANSITIONS
            .iter()
            .find(|(from, on, _)| from == self && *on == event)
            .map(|(_, _, to)| *to)
    }

    /// Events that are legal from this state
    pub fn events(&self) -> Vec<TaskEvent> {
        TRANSITIONS
            .iter()
            .filter(|(from, _, _)| from == self)
            .map(|(_, event, _)| *event)
            .collect()
    }

    /// True when no event leaves this state
    pub fn is_terminal(&self) -> bool {
        self.events().is_empty()
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("state", s))
    }
}

impl TaskEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskEvent::Start => "start",
            TaskEvent::Finish => "finish",
        }
    }
}

impl fmt::Display for TaskEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskEvent {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(TaskEvent::Start),
            "finish" => Ok(TaskEvent::Finish),
            other => Err(ParseEnumError::new("event", other)),
        }
    }
}

/// Task owned by a single user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owner; never changed by updates
    pub user_id: Uuid,

    /// Non-blank name
    pub name: String,

    pub description: Option<String>,

    /// Current lifecycle state
    pub state: TaskState,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Form for creating a task
///
/// The owner is always the creating user, so it is not part of the form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    #[serde(default)]
    pub name: String,

    pub description: Option<String>,

    /// Optional; must be `new` when given
    pub state: Option<String>,

    pub attachment: Option<AttachmentInput>,
}

impl NewTask {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        validate_name(&self.name, &mut errors);

        if let Some(raw) = self.state.as_deref() {
            match raw.parse::<TaskState>() {
                Ok(TaskState::New) => {}
                Ok(_) => errors.add("state", "must be new when creating a task"),
                Err(_) => errors.add("state", NOT_INCLUDED),
            }
        }

        if let Some(attachment) = &self.attachment {
            if let Err(e) = attachment.validate() {
                errors.merge(e);
            }
        }

        errors.into_result()
    }
}

/// Form for updating a task
///
/// State moves go through events; a `state` here may only repeat the current one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskChanges {
    pub name: Option<String>,

    pub description: Option<String>,

    pub state: Option<String>,

    pub attachment: Option<AttachmentInput>,
}

impl TaskChanges {
    /// Validates against the task being changed
    pub fn validate(&self, current: &Task) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(name) = &self.name {
            validate_name(name, &mut errors);
        }

        if let Some(raw) = self.state.as_deref() {
            match raw.parse::<TaskState>() {
                Ok(state) if state == current.state => {}
                Ok(_) => errors.add("state", "can only be changed by a start or finish event"),
                Err(_) => errors.add("state", NOT_INCLUDED),
            }
        }

        if let Some(attachment) = &self.attachment {
            if let Err(e) = attachment.validate() {
                errors.merge(e);
            }
        }

        errors.into_result()
    }
}

fn validate_name(name: &str, errors: &mut ValidationErrors) {
    let name = name.trim();
    if name.is_empty() {
        errors.add("name", BLANK);
    } else if exceeds(name, MAX_LENGTH) {
        errors.add("name", too_long(MAX_LENGTH));
    }
}

/// Row to insert
#[derive(Debug, Clone)]
pub struct NewTaskRecord {
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// Column updates; only `Some` fields are written
#[derive(Debug, Clone, Default)]
pub struct TaskRecordChanges {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl TaskRecordChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

const TASK_COLUMNS: &str = "id, user_id, name, description, state, created_at, updated_at";

impl Task {
    /// Inserts a task in the `new` state
    pub async fn create<'e, E>(executor: E, data: NewTaskRecord) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (id, user_id, name, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(data.user_id)
        .bind(data.name)
        .bind(data.description)
        .fetch_one(executor)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(task)
    }

    /// Updates name/description and bumps `updated_at`
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: TaskRecordChanges,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {TASK_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }

        let task = q.fetch_optional(executor).await?;

        Ok(task)
    }

    /// Moves a task from `from` to `to` in a single conditional update
    ///
    /// Returns `None` when the task is gone or is no longer in `from`, in which
    /// case nothing was written.
    pub async fn transition(
        pool: &PgPool,
        id: Uuid,
        from: TaskState,
        to: TaskState,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET state = $3,
                updated_at = NOW()
            WHERE id = $1 AND state = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists a user's tasks, oldest first
    pub async fn list_by_owner(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE user_id = $1
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Lists every task, oldest first
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Deletes a task
    ///
    /// The attachment goes with it (ON DELETE CASCADE).
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
