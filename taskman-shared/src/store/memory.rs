//! In-memory store adapter for tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::attachment::{Attachment, AttachmentChange, NewAttachment};
use crate::models::task::{NewTaskRecord, Task, TaskRecordChanges, TaskState};
use crate::models::user::{NewUserRecord, User, UserRecordChanges};
use crate::validation::{exceeds, MAX_LENGTH};

/// Thread-safe in-memory store.
///
/// Clones share the same tables. Rows keep insertion order, and timestamps are
/// strictly increasing so `(created_at, id)` ordering matches insertion order.
/// Short text columns have the same 255 character width as in PostgreSQL.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<Tables>>,
    writes: Arc<AtomicU64>,
}

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    tasks: Vec<Task>,
    attachments: Vec<Attachment>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Tables {
    fn now(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .iter()
            .any(|u| Some(u.id) != except && u.email.to_lowercase() == email.to_lowercase())
    }

    fn user_mut(&mut self, id: Uuid) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    fn task_mut(&mut self, id: Uuid) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    fn sorted_tasks<'a>(&self, tasks: impl Iterator<Item = &'a Task>) -> Vec<Task> {
        let mut tasks: Vec<Task> = tasks.cloned().collect();
        tasks.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        tasks
    }
}

/// Rejects values wider than their column, like a `VARCHAR(255)` does.
fn check_width(value: &str) -> StoreResult<()> {
    if exceeds(value, MAX_LENGTH) {
        return Err(StoreError::Database(sqlx::Error::Protocol(format!(
            "value too long for type character varying({MAX_LENGTH})"
        ))));
    }
    Ok(())
}

fn check_attachment(data: &NewAttachment) -> StoreResult<()> {
    check_width(&data.file_name)?;
    if let Some(content_type) = &data.content_type {
        check_width(content_type)?;
    }
    Ok(())
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_user(&self, data: NewUserRecord) -> StoreResult<User> {
        let mut state = self.state.write().await;

        if state.email_taken(&data.email, None) {
            return Err(StoreError::Conflict { field: "email" });
        }

        let now = state.now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            password_hash: data.password_hash,
            role: data.role,
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());
        self.record_write();

        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        let email = email.to_lowercase();
        Ok(state
            .users
            .iter()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn update_user(
        &self,
        id: Uuid,
        changes: UserRecordChanges,
    ) -> StoreResult<Option<User>> {
        let mut state = self.state.write().await;

        if state.user_mut(id).is_none() {
            return Ok(None);
        }
        if let Some(email) = &changes.email {
            if state.email_taken(email, Some(id)) {
                return Err(StoreError::Conflict { field: "email" });
            }
        }

        let now = state.now();
        let Some(user) = state.user_mut(id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        user.updated_at = now;
        let user = user.clone();
        self.record_write();

        Ok(Some(user))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;

        let before = state.users.len();
        state.users.retain(|u| u.id != id);
        if state.users.len() == before {
            return Ok(false);
        }

        let owned: Vec<Uuid> = state
            .tasks
            .iter()
            .filter(|t| t.user_id == id)
            .map(|t| t.id)
            .collect();
        state.tasks.retain(|t| t.user_id != id);
        state.attachments.retain(|a| !owned.contains(&a.task_id));
        self.record_write();

        Ok(true)
    }

    async fn insert_task(
        &self,
        data: NewTaskRecord,
        attachment: Option<NewAttachment>,
    ) -> StoreResult<Task> {
        let mut state = self.state.write().await;

        if !state.users.iter().any(|u| u.id == data.user_id) {
            return Err(StoreError::Database(sqlx::Error::RowNotFound));
        }
        check_width(&data.name)?;
        if let Some(attachment) = &attachment {
            check_attachment(attachment)?;
        }

        let now = state.now();
        let task = Task {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            name: data.name,
            description: data.description,
            state: TaskState::New,
            created_at: now,
            updated_at: now,
        };
        state.tasks.push(task.clone());
        if let Some(data) = attachment {
            state.attachments.push(Attachment {
                id: Uuid::new_v4(),
                task_id: task.id,
                file_name: data.file_name,
                content_type: data.content_type,
                created_at: now,
            });
        }
        self.record_write();

        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let state = self.state.read().await;
        Ok(state.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn update_task(
        &self,
        id: Uuid,
        changes: TaskRecordChanges,
        attachment: Option<AttachmentChange>,
    ) -> StoreResult<Option<Task>> {
        let mut state = self.state.write().await;

        if state.task_mut(id).is_none() {
            return Ok(None);
        }
        if let Some(name) = &changes.name {
            check_width(name)?;
        }
        if let Some(AttachmentChange::Replace(data)) = &attachment {
            check_attachment(data)?;
        }

        let now = state.now();
        let mut written = false;
        let Some(task) = state.task_mut(id) else {
            return Ok(None);
        };
        if !changes.is_empty() {
            if let Some(name) = changes.name {
                task.name = name;
            }
            if let Some(description) = changes.description {
                task.description = Some(description);
            }
            task.updated_at = now;
            written = true;
        }
        let task = task.clone();

        match attachment {
            Some(AttachmentChange::Replace(data)) => {
                state.attachments.retain(|a| a.task_id != id);
                state.attachments.push(Attachment {
                    id: Uuid::new_v4(),
                    task_id: id,
                    file_name: data.file_name,
                    content_type: data.content_type,
                    created_at: now,
                });
                written = true;
            }
            Some(AttachmentChange::Remove) => {
                let before = state.attachments.len();
                state.attachments.retain(|a| a.task_id != id);
                written |= state.attachments.len() != before;
            }
            None => {}
        }
        if written {
            self.record_write();
        }

        Ok(Some(task))
    }

    async fn transition_task(
        &self,
        id: Uuid,
        from: TaskState,
        to: TaskState,
    ) -> StoreResult<Option<Task>> {
        let mut state = self.state.write().await;

        let now = state.now();
        let Some(task) = state.task_mut(id).filter(|t| t.state == from) else {
            return Ok(None);
        };
        task.state = to;
        task.updated_at = now;
        let task = task.clone();
        self.record_write();

        Ok(Some(task))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;

        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != id);
        if state.tasks.len() == before {
            return Ok(false);
        }
        state.attachments.retain(|a| a.task_id != id);
        self.record_write();

        Ok(true)
    }

    async fn tasks_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;
        Ok(state.sorted_tasks(state.tasks.iter().filter(|t| t.user_id == user_id)))
    }

    async fn all_tasks(&self) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;
        Ok(state.sorted_tasks(state.tasks.iter()))
    }

    async fn attachment_for(&self, task_id: Uuid) -> StoreResult<Option<Attachment>> {
        let state = self.state.read().await;
        Ok(state
            .attachments
            .iter()
            .find(|a| a.task_id == task_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    fn new_user(email: &str) -> NewUserRecord {
        NewUserRecord {
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role: Role::Regular,
        }
    }

    fn new_task(user_id: Uuid, name: &str) -> NewTaskRecord {
        NewTaskRecord {
            user_id,
            name: name.to_string(),
            description: None,
        }
    }

    fn attachment(file_name: &str) -> NewAttachment {
        NewAttachment {
            file_name: file_name.to_string(),
            content_type: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts_ignoring_case() {
        let store = MemoryStore::new();
        store.insert_user(new_user("ann@example.com")).await.unwrap();

        let err = store
            .insert_user(new_user("ANN@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict { field: "email" }));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_update_user_email_conflict() {
        let store = MemoryStore::new();
        store.insert_user(new_user("ann@example.com")).await.unwrap();
        let bob = store.insert_user(new_user("bob@example.com")).await.unwrap();

        let changes = UserRecordChanges {
            email: Some("ann@example.com".to_string()),
            ..Default::default()
        };
        let err = store.update_user(bob.id, changes).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { field: "email" }));

        // Keeping one's own address is not a conflict
        let changes = UserRecordChanges {
            email: Some("bob@example.com".to_string()),
            ..Default::default()
        };
        assert!(store.update_user(bob.id, changes).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_tasks_keep_insertion_order() {
        let store = MemoryStore::new();
        let ann = store.insert_user(new_user("ann@example.com")).await.unwrap();

        let mut ids = Vec::new();
        for i in 0..5 {
            let task = store
                .insert_task(new_task(ann.id, &format!("t{i}")), None)
                .await
                .unwrap();
            ids.push(task.id);
        }

        let listed: Vec<Uuid> = store.all_tasks().await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_transition_requires_expected_state() {
        let store = MemoryStore::new();
        let ann = store.insert_user(new_user("ann@example.com")).await.unwrap();
        let task = store.insert_task(new_task(ann.id, "Write"), None).await.unwrap();
        let writes = store.write_count();

        let moved = store
            .transition_task(task.id, TaskState::Started, TaskState::Finished)
            .await
            .unwrap();
        assert!(moved.is_none());
        assert_eq!(store.write_count(), writes);

        let moved = store
            .transition_task(task.id, TaskState::New, TaskState::Started)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.state, TaskState::Started);
        assert_eq!(store.write_count(), writes + 1);
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let store = MemoryStore::new();
        let ann = store.insert_user(new_user("ann@example.com")).await.unwrap();
        let bob = store.insert_user(new_user("bob@example.com")).await.unwrap();
        let task = store
            .insert_task(new_task(ann.id, "Ann's"), Some(attachment("notes.txt")))
            .await
            .unwrap();
        store.insert_task(new_task(bob.id, "Bob's"), None).await.unwrap();
        assert!(store.attachment_for(task.id).await.unwrap().is_some());

        assert!(store.delete_user(ann.id).await.unwrap());

        assert!(store.find_task(task.id).await.unwrap().is_none());
        assert!(store.attachment_for(task.id).await.unwrap().is_none());
        assert_eq!(store.all_tasks().await.unwrap().len(), 1);
        assert!(!store.delete_user(ann.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_task_replaces_and_removes_attachment() {
        let store = MemoryStore::new();
        let ann = store.insert_user(new_user("ann@example.com")).await.unwrap();
        let task = store
            .insert_task(new_task(ann.id, "Write"), Some(attachment("a.txt")))
            .await
            .unwrap();

        let replace = Some(AttachmentChange::Replace(attachment("b.txt")));
        let updated = store
            .update_task(task.id, TaskRecordChanges::default(), replace)
            .await
            .unwrap()
            .unwrap();
        // Only the attachment changed
        assert_eq!(updated.updated_at, task.updated_at);
        let stored = store.attachment_for(task.id).await.unwrap().unwrap();
        assert_eq!(stored.file_name, "b.txt");

        let writes = store.write_count();
        let remove = Some(AttachmentChange::Remove);
        store
            .update_task(task.id, TaskRecordChanges::default(), remove.clone())
            .await
            .unwrap();
        assert!(store.attachment_for(task.id).await.unwrap().is_none());
        assert_eq!(store.write_count(), writes + 1);

        // Removing a missing attachment writes nothing
        store
            .update_task(task.id, TaskRecordChanges::default(), remove)
            .await
            .unwrap();
        assert_eq!(store.write_count(), writes + 1);
    }

    #[tokio::test]
    async fn test_rejected_attachment_leaves_no_task() {
        let store = MemoryStore::new();
        let ann = store.insert_user(new_user("ann@example.com")).await.unwrap();
        let writes = store.write_count();

        let wide = attachment(&"f".repeat(MAX_LENGTH + 1));
        let result = store.insert_task(new_task(ann.id, "Write"), Some(wide)).await;

        assert!(matches!(result, Err(StoreError::Database(_))));
        assert!(store.all_tasks().await.unwrap().is_empty());
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_rejected_attachment_keeps_task_unchanged() {
        let store = MemoryStore::new();
        let ann = store.insert_user(new_user("ann@example.com")).await.unwrap();
        let task = store.insert_task(new_task(ann.id, "Write"), None).await.unwrap();
        let writes = store.write_count();

        let changes = TaskRecordChanges {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        let wide = AttachmentChange::Replace(attachment(&"f".repeat(MAX_LENGTH + 1)));
        let result = store.update_task(task.id, changes, Some(wide)).await;

        assert!(matches!(result, Err(StoreError::Database(_))));
        assert_eq!(store.find_task(task.id).await.unwrap().unwrap(), task);
        assert!(store.attachment_for(task.id).await.unwrap().is_none());
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_name_wider_than_column_is_rejected() {
        let store = MemoryStore::new();
        let ann = store.insert_user(new_user("ann@example.com")).await.unwrap();

        let result = store
            .insert_task(new_task(ann.id, &"n".repeat(MAX_LENGTH + 1)), None)
            .await;

        assert!(matches!(result, Err(StoreError::Database(_))));
        assert!(store.all_tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_task_for_unknown_owner_fails() {
        let store = MemoryStore::new();

        let result = store.insert_task(new_task(Uuid::new_v4(), "Orphan"), None).await;

        assert!(matches!(result, Err(StoreError::Database(_))));
    }
}
