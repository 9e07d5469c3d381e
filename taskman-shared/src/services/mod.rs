//! Account and task operations.
//!
//! Services own the business rules: validation, password handling,
//! authorization and the task state machine. They take the acting user as an
//! argument and reach storage only through a [`Store`](crate::store::Store).
//!
//! Denied access and illegal transitions are not errors. They surface as
//! `None` or `false` so callers cannot tell a forbidden task from a missing one.

use thiserror::Error;

use crate::auth::password::PasswordError;
use crate::store::StoreError;
use crate::validation::ValidationErrors;

pub mod accounts;
pub mod tasks;

pub use accounts::AccountService;
pub use tasks::TaskService;

/// Reason recorded when a unique field collides with an existing record.
pub const TAKEN: &str = "has already been taken";

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors returned by services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// One or more fields were rejected; nothing was written.
    #[error("validation failed: {0}")]
    ValidationFailed(ValidationErrors),

    /// Unknown email or wrong password.
    #[error("invalid email or password")]
    AuthenticationFailed,

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        Self::ValidationFailed(errors)
    }
}

/// Uniqueness conflicts are reported like any other invalid field.
impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { field } => {
                Self::ValidationFailed(ValidationErrors::single(field, TAKEN))
            }
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_becomes_validation_error() {
        let err = ServiceError::from(StoreError::Conflict { field: "email" });

        match err {
            ServiceError::ValidationFailed(errors) => {
                assert_eq!(errors.reasons_for("email"), vec![TAKEN]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_database_error_stays_store_error() {
        let err = ServiceError::from(StoreError::Database(sqlx::Error::RowNotFound));

        assert!(matches!(err, ServiceError::Store(StoreError::Database(_))));
    }
}
