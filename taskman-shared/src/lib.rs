//! # Taskman Shared Library
//!
//! Domain types, persistence, and business rules used by the Taskman API server.
//!
//! ## Module Organization
//!
//! - `models`: Users, tasks and attachments with their PostgreSQL queries
//! - `auth`: Password hashing, session tokens, request identity, authorization predicates
//! - `store`: Persistence trait with PostgreSQL and in-memory implementations
//! - `services`: Account and task operations built on a `Store`
//! - `db`: Connection pool and migrations
//! - `validation`: Field-level validation errors

pub mod auth;
pub mod db;
pub mod models;
pub mod services;
pub mod store;
pub mod validation;

/// Current version of the Taskman shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
