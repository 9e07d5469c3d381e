/// Task attachment metadata
///
/// A task has at most one attachment. Only the metadata is stored; the file
/// body lives elsewhere.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE attachments (
///     id UUID PRIMARY KEY,
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     file_name VARCHAR(255) NOT NULL,
///     content_type VARCHAR(255),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT attachments_task_id_key UNIQUE (task_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::validation::{exceeds, too_long, ValidationErrors, BLANK, MAX_LENGTH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attachment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub file_name: String,
    pub content_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Nested `attachment` object of a task form
///
/// `{"remove": true}` deletes the current attachment; anything else replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AttachmentInput {
    #[serde(default)]
    pub file_name: Option<String>,

    #[serde(default)]
    pub content_type: Option<String>,

    #[serde(default)]
    pub remove: bool,
}

impl AttachmentInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        if self.remove {
            return Ok(());
        }

        let mut errors = ValidationErrors::new();

        match self.file_name.as_deref().map(str::trim) {
            Some(name) if exceeds(name, MAX_LENGTH) => {
                errors.add("attachment.file_name", too_long(MAX_LENGTH));
            }
            Some(name) if !name.is_empty() => {}
            _ => errors.add("attachment.file_name", BLANK),
        }

        if let Some(content_type) = &self.content_type {
            if exceeds(content_type, MAX_LENGTH) {
                errors.add("attachment.content_type", too_long(MAX_LENGTH));
            }
        }

        errors.into_result()
    }

    /// Metadata to store, or `None` when this input removes the attachment
    pub fn to_new(&self) -> Option<NewAttachment> {
        if self.remove {
            return None;
        }

        Some(NewAttachment {
            file_name: self.file_name.clone().unwrap_or_default().trim().to_string(),
            content_type: self.content_type.clone(),
        })
    }

    pub fn to_change(&self) -> AttachmentChange {
        match self.to_new() {
            Some(data) => AttachmentChange::Replace(data),
            None => AttachmentChange::Remove,
        }
    }
}

/// Metadata for a replacement attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    pub file_name: String,
    pub content_type: Option<String>,
}

/// What an update does to a task's attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentChange {
    Replace(NewAttachment),
    Remove,
}

const ATTACHMENT_COLUMNS: &str = "id, task_id, file_name, content_type, created_at";

impl Attachment {
    /// Inserts or replaces the attachment of `task_id`
    pub async fn upsert<'e, E>(
        executor: E,
        task_id: Uuid,
        data: NewAttachment,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let attachment = sqlx::query_as::<_, Attachment>(&format!(
            r#"
            INSERT INTO attachments (id, task_id, file_name, content_type)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (task_id) DO UPDATE
            SET file_name = EXCLUDED.file_name,
                content_type = EXCLUDED.content_type,
                created_at = NOW()
            RETURNING {ATTACHMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(task_id)
        .bind(data.file_name)
        .bind(data.content_type)
        .fetch_one(executor)
        .await?;

        Ok(attachment)
    }

    pub async fn find_by_task(pool: &PgPool, task_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let attachment = sqlx::query_as::<_, Attachment>(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE task_id = $1"
        ))
        .bind(task_id)
        .fetch_optional(pool)
        .await?;

        Ok(attachment)
    }

    /// Removes the attachment of `task_id`; false if there was none
    pub async fn delete_by_task<'e, E>(executor: E, task_id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM attachments WHERE task_id = $1")
            .bind(task_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_skips_file_name_check() {
        let input = AttachmentInput {
            remove: true,
            ..Default::default()
        };

        assert!(input.validate().is_ok());
        assert_eq!(input.to_new(), None);
        assert_eq!(input.to_change(), AttachmentChange::Remove);
    }

    #[test]
    fn test_file_name_required() {
        let input = AttachmentInput {
            file_name: Some("  ".to_string()),
            ..Default::default()
        };

        let errors = input.validate().unwrap_err();
        assert_eq!(errors.reasons_for("attachment.file_name"), vec![BLANK]);
    }

    #[test]
    fn test_lengths_fit_columns() {
        let input = AttachmentInput {
            file_name: Some("f".repeat(MAX_LENGTH + 1)),
            content_type: Some("t".repeat(MAX_LENGTH + 1)),
            remove: false,
        };
        let errors = input.validate().unwrap_err();

        assert_eq!(
            errors.reasons_for("attachment.file_name"),
            vec![too_long(MAX_LENGTH).as_str()]
        );
        assert!(errors.has_field("attachment.content_type"));

        let input = AttachmentInput {
            file_name: Some(format!(" {} ", "f".repeat(MAX_LENGTH))),
            content_type: Some("t".repeat(MAX_LENGTH)),
            remove: false,
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_deserialize_and_convert() {
        let input: AttachmentInput = serde_json::from_value(serde_json::json!({
            "file_name": " plan.pdf ",
            "content_type": "application/pdf"
        }))
        .unwrap();

        assert!(input.validate().is_ok());
        assert_eq!(
            input.to_new(),
            Some(NewAttachment {
                file_name: "plan.pdf".to_string(),
                content_type: Some("application/pdf".to_string()),
            })
        );
    }
}
