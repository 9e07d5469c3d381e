//! Task CRUD, visibility and lifecycle transitions.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::ServiceResult;
use crate::auth::authorization::{editable, is_admin};
use crate::models::attachment::{Attachment, AttachmentInput};
use crate::models::task::{NewTask, NewTaskRecord, Task, TaskChanges, TaskEvent, TaskRecordChanges};
use crate::models::user::User;
use crate::store::Store;

/// Task operations over a [`Store`].
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates a task owned by `owner`, in the `new` state.
    pub async fn create(&self, owner: &User, form: NewTask) -> ServiceResult<Task> {
        form.validate()?;

        // `{"remove": true}` on a new task has nothing to remove
        let attachment = form.attachment.as_ref().and_then(AttachmentInput::to_new);
        let with_attachment = attachment.is_some();

        let task = self
            .store
            .insert_task(
                NewTaskRecord {
                    user_id: owner.id,
                    name: form.name.trim().to_string(),
                    description: form.description,
                },
                attachment,
            )
            .await?;

        info!(
            task_id = %task.id,
            user_id = %owner.id,
            attachment = with_attachment,
            "Task created"
        );
        Ok(task)
    }

    /// The task, if it exists and `requester` may edit it.
    pub async fn find_editable(&self, requester: &User, id: Uuid) -> ServiceResult<Option<Task>> {
        let task = self.store.find_task(id).await?;

        Ok(task.filter(|task| editable(task, requester)))
    }

    /// Applies name, description and attachment changes.
    ///
    /// A `state` in `changes` may only repeat the current state; moves go
    /// through [`change_state`](Self::change_state).
    pub async fn update(
        &self,
        requester: &User,
        id: Uuid,
        changes: TaskChanges,
    ) -> ServiceResult<Option<Task>> {
        let Some(task) = self.find_editable(requester, id).await? else {
            return Ok(None);
        };
        changes.validate(&task)?;

        let record = TaskRecordChanges {
            name: changes.name.map(|name| name.trim().to_string()),
            description: changes.description,
        };

        let attachment = changes.attachment.as_ref().map(AttachmentInput::to_change);

        let task = if record.is_empty() && attachment.is_none() {
            task
        } else {
            match self.store.update_task(id, record, attachment).await? {
                Some(task) => task,
                None => return Ok(None),
            }
        };

        info!(task_id = %task.id, user_id = %requester.id, "Task updated");
        Ok(Some(task))
    }

    /// Deletes a task and its attachment; false if missing or not editable.
    pub async fn delete(&self, requester: &User, id: Uuid) -> ServiceResult<bool> {
        if self.find_editable(requester, id).await?.is_none() {
            return Ok(false);
        }

        let deleted = self.store.delete_task(id).await?;
        if deleted {
            info!(task_id = %id, user_id = %requester.id, "Task deleted");
        }
        Ok(deleted)
    }

    /// Attachment of an editable task.
    pub async fn attachment(
        &self,
        requester: &User,
        id: Uuid,
    ) -> ServiceResult<Option<Attachment>> {
        if self.find_editable(requester, id).await?.is_none() {
            return Ok(None);
        }

        Ok(self.store.attachment_for(id).await?)
    }

    /// Fires `event` on `task` on behalf of `user`.
    ///
    /// Returns `false` without writing when the user may not edit the task, the
    /// event name is unknown, or the event is not legal from the current state.
    /// Also `false` if the stored task left its state since it was read. On
    /// success `task` is replaced with the stored row.
    pub async fn change_state(
        &self,
        task: &mut Task,
        user: &User,
        event: &str,
    ) -> ServiceResult<bool> {
        if !editable(task, user) {
            debug!(task_id = %task.id, user_id = %user.id, event, "Transition denied");
            return Ok(false);
        }

        let Ok(event) = event.parse::<TaskEvent>() else {
            debug!(task_id = %task.id, event, "Unknown task event");
            return Ok(false);
        };

        let from = task.state;
        let Some(to) = from.next(event) else {
            debug!(task_id = %task.id, %from, %event, "Illegal transition");
            return Ok(false);
        };

        match self.store.transition_task(task.id, from, to).await? {
            Some(updated) => {
                *task = updated;
                info!(task_id = %task.id, user_id = %user.id, %from, %to, "Task state changed");
                Ok(true)
            }
            None => {
                debug!(task_id = %task.id, %from, "Task moved concurrently");
                Ok(false)
            }
        }
    }

    /// Loads an editable task and fires `event` on it.
    ///
    /// `None` when the task is missing or not editable; otherwise the task as it
    /// now stands and whether the event was applied.
    pub async fn fire(
        &self,
        requester: &User,
        id: Uuid,
        event: &str,
    ) -> ServiceResult<Option<(Task, bool)>> {
        let Some(mut task) = self.find_editable(requester, id).await? else {
            return Ok(None);
        };

        let changed = self.change_state(&mut task, requester, event).await?;
        if !changed {
            // Report the stored state, which a concurrent writer may have moved
            if let Some(current) = self.store.find_task(id).await? {
                task = current;
            }
        }

        Ok(Some((task, changed)))
    }

    /// Tasks `requester` may see: all for an admin, own tasks otherwise.
    pub async fn visible_tasks_for(&self, requester: &User) -> ServiceResult<Vec<Task>> {
        let tasks = if is_admin(requester) {
            self.store.all_tasks().await?
        } else {
            self.store.tasks_by_owner(requester.id).await?
        };

        Ok(tasks)
    }
}
