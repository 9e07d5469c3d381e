/// User model and database operations
///
/// Users authenticate with an email and password and carry a coarse role:
/// administrators see and edit every task, regular users only their own.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('admin', 'user');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     email CITEXT NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     role user_role NOT NULL DEFAULT 'user',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Deleting a user cascades to their tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::ParseEnumError;
use crate::validation::{ValidationErrors, BLANK, NOT_INCLUDED};

/// Privilege level of a user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role")]
pub enum Role {
    /// Sees and edits every task
    #[sqlx(rename = "admin")]
    #[serde(rename = "admin")]
    Admin,

    /// Sees and edits only owned tasks
    #[default]
    #[sqlx(rename = "user")]
    #[serde(rename = "user")]
    Regular,
}

impl Role {
    /// Wire and database value
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Regular => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::Regular),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

/// User account
///
/// Two users are equal when they are the same account (same id).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Normalized email address (trimmed, lower-cased)
    pub email: String,

    /// Argon2id PHC string, never serialized
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Privilege level
    pub role: Role,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for User {}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.email)
    }
}

/// Trims and lower-cases an email so lookups and uniqueness ignore case
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Sign-up form
///
/// Missing JSON fields deserialize as empty so they are reported as
/// validation errors instead of request-parse failures.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct Registration {
    #[serde(default)]
    #[validate(email(message = "is incorrect format"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 6, message = "is too short (minimum is 6 characters)"))]
    pub password: String,

    #[serde(default)]
    #[validate(must_match(other = "password", message = "doesn't match password"))]
    pub password_confirmation: String,

    /// `admin` or `user`; defaults to `user`
    #[serde(default)]
    pub role: Option<String>,
}

impl Registration {
    /// Checks every field and returns the parsed role
    ///
    /// Email uniqueness needs the store and is checked by the account service.
    pub fn check(&self) -> Result<Role, ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(e) => ValidationErrors::from(e),
        };

        if self.password.is_empty() {
            errors.replace("password", BLANK);
        }

        let role = parse_role(self.role.as_deref(), &mut errors);

        errors.into_result()?;
        Ok(role.unwrap_or_default())
    }
}

/// Partial update of a user
///
/// `password_confirmation` must accompany a new `password`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserChanges {
    #[validate(email(message = "is incorrect format"))]
    pub email: Option<String>,

    #[validate(length(min = 6, message = "is too short (minimum is 6 characters)"))]
    pub password: Option<String>,

    pub password_confirmation: Option<String>,

    pub role: Option<String>,
}

impl UserChanges {
    /// Checks every supplied field and returns the parsed role, if one was given
    pub fn check(&self) -> Result<Option<Role>, ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(e) => ValidationErrors::from(e),
        };

        if self.password.as_deref() == Some("") {
            errors.replace("password", BLANK);
        }
        if self.password.is_some() && self.password_confirmation != self.password {
            errors.add("password_confirmation", "doesn't match password");
        }

        let role = parse_role(self.role.as_deref(), &mut errors);

        errors.into_result()?;
        Ok(role)
    }

    /// True when nothing would change
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none() && self.role.is_none()
    }
}

fn parse_role(raw: Option<&str>, errors: &mut ValidationErrors) -> Option<Role> {
    let raw = raw?;
    match raw.parse::<Role>() {
        Ok(role) => Some(role),
        Err(_) => {
            errors.add("role", NOT_INCLUDED);
            None
        }
    }
}

/// Row to insert; the hash is computed by the caller
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Column updates; only `Some` fields are written
#[derive(Debug, Clone, Default)]
pub struct UserRecordChanges {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

impl UserRecordChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password_hash.is_none() && self.role.is_none()
    }
}

const USER_COLUMNS: &str = "id, email::TEXT AS email, password_hash, role, created_at, updated_at";

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Returns an error if the email already exists (`users_email_key`) or the
    /// database is unreachable.
    pub async fn create(pool: &PgPool, data: NewUserRecord) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.role)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email (case-insensitive via CITEXT)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1::CITEXT"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Updates the supplied columns and bumps `updated_at`
    ///
    /// Returns `None` if the user doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UserRecordChanges,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.role.is_some() {
            bind_count += 1;
            query.push_str(&format!(", role = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(role) = data.role {
            q = q.bind(role);
        }

        let user = q.fetch_optional(pool).await?;

        Ok(user)
    }

    /// Deletes a user and, through the foreign key, all of their tasks
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(email: &str, password: &str, confirmation: &str) -> Registration {
        Registration {
            email: email.to_string(),
            password: password.to_string(),
            password_confirmation: confirmation.to_string(),
            role: None,
        }
    }

    #[test]
    fn test_role_wire_values() {
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(Role::Regular.as_str(), "user");
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::Regular);
        assert!("superuser".parse::<Role>().is_err());

        assert_eq!(serde_json::to_string(&Role::Regular).unwrap(), "\"user\"");
        assert_eq!(Role::default(), Role::Regular);
    }

    #[test]
    fn test_valid_registration_defaults_to_regular_role() {
        let form = registration("user@example.com", "pass123", "pass123");
        assert_eq!(form.check().unwrap(), Role::Regular);
    }

    #[test]
    fn test_registration_rejects_malformed_email() {
        let form = registration("incorrect_format_email", "pass123", "pass123");
        let errors = form.check().unwrap_err();

        assert_eq!(errors.reasons_for("email"), vec!["is incorrect format"]);
    }

    #[test]
    fn test_registration_requires_password() {
        let form = registration("user@example.com", "", "");
        let errors = form.check().unwrap_err();

        assert_eq!(errors.reasons_for("password"), vec![BLANK]);
    }

    #[test]
    fn test_registration_rejects_short_password() {
        let form = registration("user@example.com", "pass1", "pass1");
        let errors = form.check().unwrap_err();

        assert_eq!(
            errors.reasons_for("password"),
            vec!["is too short (minimum is 6 characters)"]
        );
    }

    #[test]
    fn test_registration_requires_matching_confirmation() {
        let form = registration("user@example.com", "pass123", "pass124");
        let errors = form.check().unwrap_err();

        assert!(errors.has_field("password_confirmation"));
        assert!(!errors.has_field("password"));
    }

    #[test]
    fn test_registration_rejects_unknown_role() {
        let mut form = registration("user@example.com", "pass123", "pass123");
        form.role = Some("root".to_string());

        let errors = form.check().unwrap_err();
        assert_eq!(errors.reasons_for("role"), vec![NOT_INCLUDED]);
    }

    #[test]
    fn test_user_changes_only_check_supplied_fields() {
        let changes = UserChanges {
            email: Some("new@example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(changes.check().unwrap(), None);

        let changes = UserChanges {
            password: Some("321pass".to_string()),
            ..Default::default()
        };
        let errors = changes.check().unwrap_err();
        assert!(errors.has_field("password_confirmation"));
    }

    #[test]
    fn test_display_is_email() {
        let user = User {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Regular,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(user.to_string(), "user@example.com");
        assert!(!serde_json::to_string(&user).unwrap().contains("password_hash"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  User@Example.COM "), "user@example.com");
    }
}
