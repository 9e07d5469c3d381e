//! # Taskman API Server Library
//!
//! HTTP boundary of the task tracker: configuration, router, bearer-token
//! authentication and JSON handlers over the `taskman-shared` services.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Response middleware
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
