//! Persistence port for users, tasks and attachments.
//!
//! Services talk to a [`Store`] and never to a pool directly. Two adapters exist:
//!
//! - [`PgStore`]: PostgreSQL through the queries in [`crate::models`]
//! - [`MemoryStore`]: process-local tables for tests and local runs
//!
//! Both give the same guarantees per call: a write either fully applies or
//! leaves the records untouched, and [`Store::transition_task`] only moves a task
//! that is still in the expected state. A task and its attachment are written
//! by the same call, so one cannot be saved without the other.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::attachment::{Attachment, AttachmentChange, NewAttachment};
use crate::models::task::{NewTaskRecord, Task, TaskRecordChanges, TaskState};
use crate::models::user::{NewUserRecord, User, UserRecordChanges};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("{field} already exists")]
    Conflict {
        /// Field whose value is already taken.
        field: &'static str,
    },

    /// Database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence contract.
///
/// Lookups return `Ok(None)` for missing rows; only infrastructure problems and
/// constraint violations are errors.
#[async_trait]
pub trait Store: Send + Sync {
    /// Checks that the backing storage is reachable.
    async fn ping(&self) -> StoreResult<()>;

    /// Stores a new user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] with field `email` when the address is taken.
    async fn insert_user(&self, data: NewUserRecord) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Finds a user by normalized email, ignoring case.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Applies the `Some` fields of `changes`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] with field `email` when the new address is taken.
    async fn update_user(&self, id: Uuid, changes: UserRecordChanges)
        -> StoreResult<Option<User>>;

    /// Deletes a user together with their tasks and attachments.
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;

    /// Stores a task in the `new` state, with its attachment if given.
    ///
    /// Nothing is stored when either write fails.
    async fn insert_task(
        &self,
        data: NewTaskRecord,
        attachment: Option<NewAttachment>,
    ) -> StoreResult<Task>;

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    /// Applies the `Some` fields of `changes` and the attachment change.
    ///
    /// Owner and state are never touched, and `updated_at` only moves when
    /// `changes` is not empty. Nothing is written when either part fails.
    async fn update_task(
        &self,
        id: Uuid,
        changes: TaskRecordChanges,
        attachment: Option<AttachmentChange>,
    ) -> StoreResult<Option<Task>>;

    /// Moves a task from `from` to `to` if it is still in `from`.
    ///
    /// Returns `None` when the task is missing or has already left `from`.
    async fn transition_task(
        &self,
        id: Uuid,
        from: TaskState,
        to: TaskState,
    ) -> StoreResult<Option<Task>>;

    /// Deletes a task together with its attachment.
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;

    /// Tasks owned by `user_id`, ordered by `(created_at, id)`.
    async fn tasks_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Task>>;

    /// Every task, ordered by `(created_at, id)`.
    async fn all_tasks(&self) -> StoreResult<Vec<Task>>;

    async fn attachment_for(&self, task_id: Uuid) -> StoreResult<Option<Attachment>>;
}
