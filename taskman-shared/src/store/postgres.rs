//! PostgreSQL store adapter.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::db::pool::health_check;
use crate::models::attachment::{Attachment, AttachmentChange, NewAttachment};
use crate::models::task::{NewTaskRecord, Task, TaskRecordChanges, TaskState};
use crate::models::user::{NewUserRecord, User, UserRecordChanges};

const USERS_EMAIL_KEY: &str = "users_email_key";

/// Store backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps the email unique constraint to a field conflict.
fn map_user_error(err: sqlx::Error) -> StoreError {
    let is_email_conflict = err
        .as_database_error()
        .map(|db| db.is_unique_violation() && db.constraint() == Some(USERS_EMAIL_KEY))
        .unwrap_or(false);

    if is_email_conflict {
        StoreError::Conflict { field: "email" }
    } else {
        StoreError::Database(err)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        health_check(&self.pool).await?;
        Ok(())
    }

    async fn insert_user(&self, data: NewUserRecord) -> StoreResult<User> {
        User::create(&self.pool, data).await.map_err(map_user_error)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn update_user(
        &self,
        id: Uuid,
        changes: UserRecordChanges,
    ) -> StoreResult<Option<User>> {
        User::update(&self.pool, id, changes)
            .await
            .map_err(map_user_error)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        Ok(User::delete(&self.pool, id).await?)
    }

    async fn insert_task(
        &self,
        data: NewTaskRecord,
        attachment: Option<NewAttachment>,
    ) -> StoreResult<Task> {
        let mut tx = self.pool.begin().await?;

        let task = Task::create(&mut *tx, data).await?;
        if let Some(attachment) = attachment {
            Attachment::upsert(&mut *tx, task.id, attachment).await?;
        }

        tx.commit().await?;
        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn update_task(
        &self,
        id: Uuid,
        changes: TaskRecordChanges,
        attachment: Option<AttachmentChange>,
    ) -> StoreResult<Option<Task>> {
        let mut tx = self.pool.begin().await?;

        let task = if changes.is_empty() {
            Task::find_by_id(&mut *tx, id).await?
        } else {
            Task::update(&mut *tx, id, changes).await?
        };
        // Dropping the transaction rolls it back
        let Some(task) = task else {
            return Ok(None);
        };

        match attachment {
            Some(AttachmentChange::Replace(data)) => {
                Attachment::upsert(&mut *tx, id, data).await?;
            }
            Some(AttachmentChange::Remove) => {
                Attachment::delete_by_task(&mut *tx, id).await?;
            }
            None => {}
        }

        tx.commit().await?;
        Ok(Some(task))
    }

    async fn transition_task(
        &self,
        id: Uuid,
        from: TaskState,
        to: TaskState,
    ) -> StoreResult<Option<Task>> {
        Ok(Task::transition(&self.pool, id, from, to).await?)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn tasks_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        Ok(Task::list_by_owner(&self.pool, user_id).await?)
    }

    async fn all_tasks(&self) -> StoreResult<Vec<Task>> {
        Ok(Task::list_all(&self.pool).await?)
    }

    async fn attachment_for(&self, task_id: Uuid) -> StoreResult<Option<Attachment>> {
        Ok(Attachment::find_by_task(&self.pool, task_id).await?)
    }
}
