/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `sessions`: Sign-in, issuing bearer tokens
/// - `users`: Sign-up and account maintenance
/// - `tasks`: Task CRUD and lifecycle events

pub mod health;
pub mod sessions;
pub mod tasks;
pub mod users;
