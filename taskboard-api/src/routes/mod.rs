/// API route handlers
///
/// - `health`: Health check endpoint
/// - `session`: The caller's resolved session
/// - `tasks`: Day list and task actions
/// - `stream`: Live day list over SSE

pub mod health;
pub mod session;
pub mod stream;
pub mod tasks;
