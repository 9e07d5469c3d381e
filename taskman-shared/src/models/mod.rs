/// Database models for Taskman
///
/// This module contains the domain records and their PostgreSQL queries.
///
/// # Models
///
/// - `user`: User accounts, roles and sign-up/update forms
/// - `task`: Tasks and their `new → started → finished` state machine
/// - `attachment`: Optional file metadata attached to a task
///
/// # Example
///
/// ```no_run
/// use taskman_shared::models::user::{NewUserRecord, Role, User};
/// use taskman_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, NewUserRecord {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: Role::Regular,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod attachment;
pub mod task;
pub mod user;

/// Error returned when a string is not one of an enumeration's wire values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    /// What was being parsed (e.g. "role", "state")
    pub kind: &'static str,

    /// The rejected input
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
