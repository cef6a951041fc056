/// Middleware for the API server
///
/// Session resolution lives in `taskboard_shared::auth::middleware`; this
/// module holds response-side middleware.

pub mod security;
