//! # Task Board Shared Library
//!
//! Domain logic for the task board: tasks and their calendar mirror, the
//! store and calendar clients, and the controller the HTTP API drives.
//!
//! ## Module Organization
//!
//! - `models`: Task rows and the UTC day window
//! - `store`: Task store trait with PostgreSQL and in-memory backends
//! - `calendar`: Calendar events client (Google Calendar v3) and a mock
//! - `sync`: Keeps task rows and calendar events aligned
//! - `dashboard`: Per-day task list, change subscription, action dispatch
//! - `validation`: Task form validation
//! - `linkify`: Safe description-to-link tokenizer
//! - `auth`: Access token validation and session resolution
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod calendar;
pub mod dashboard;
pub mod db;
pub mod linkify;
pub mod models;
pub mod store;
pub mod sync;
pub mod validation;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
