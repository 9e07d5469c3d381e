/// Database layer for Taskman
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: Embedded schema migrations
///
/// Row types and their queries live in [`crate::models`].

pub mod migrations;
pub mod pool;
