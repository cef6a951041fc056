/// Authentication and session handling
///
/// # Modules
///
/// - [`jwt`]: Identity provider access token validation
/// - [`session`]: The per-request [`session::Session`] context
/// - [`middleware`]: Axum middleware resolving a session from headers
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::jwt::validate_token;
/// use taskboard_shared::auth::session::Session;
///
/// # fn example(token: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let claims = validate_token(token, "a-shared-secret-of-at-least-32-bytes!", "authenticated")?;
/// let session = Session::resolve(claims, None, chrono_tz::UTC, "google")?;
/// println!("user {}", session.user_id);
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod session;
