/// Session middleware for Axum
///
/// Validates the identity provider's bearer token, reads the optional
/// calendar token and time zone headers, and inserts the resolved
/// [`Session`] into the request extensions.
///
/// # Headers
///
/// - `Authorization: Bearer <access token>` (required)
/// - `X-Provider-Token: <calendar token>` (optional)
/// - `X-Time-Zone: <IANA name>` (optional, defaults to the configured zone)
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{middleware, routing::get, Extension, Router};
/// use taskboard_shared::auth::middleware::{session_middleware, SessionConfig};
/// use taskboard_shared::auth::session::Session;
///
/// async fn handler(Extension(session): Extension<Session>) -> String {
///     format!("Hello, user {}!", session.user_id)
/// }
///
/// let config = Arc::new(SessionConfig::new("a-shared-secret-of-at-least-32-bytes!"));
/// let app: Router = Router::new()
///     .route("/protected", get(handler))
///     .layer(middleware::from_fn_with_state(config, session_middleware));
/// ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono_tz::Tz;
use serde_json::json;

use super::jwt::{validate_token, JwtError};
use super::session::{parse_time_zone, Session, SessionError};

pub const PROVIDER_TOKEN_HEADER: &str = "x-provider-token";
pub const TIME_ZONE_HEADER: &str = "x-time-zone";

/// Settings the session middleware needs
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub jwt_secret: String,
    pub audience: String,
    /// Provider whose sign-ins must carry a calendar token
    pub calendar_provider: String,
    pub default_time_zone: Tz,
}

impl SessionConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            audience: "authenticated".to_string(),
            calendar_provider: "google".to_string(),
            default_time_zone: chrono_tz::UTC,
        }
    }
}

/// Error type for the session middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Invalid authorization header format
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),

    /// Token is valid but the session cannot be used
    SessionInvalid(SessionError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AuthError::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing credentials".to_string(),
            ),
            AuthError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AuthError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            AuthError::SessionInvalid(err @ SessionError::InvalidTimeZone(_)) => {
                (StatusCode::BAD_REQUEST, "bad_request", err.to_string())
            }
            AuthError::SessionInvalid(err) => {
                (StatusCode::UNAUTHORIZED, "session_invalid", err.to_string())
            }
        };

        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}

/// Resolves a [`Session`] from request headers
///
/// Exposed separately from the middleware so other transports can reuse it.
pub fn session_from_headers(
    config: &SessionConfig,
    headers: &HeaderMap,
) -> Result<Session, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_token(token, &config.jwt_secret, &config.audience).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidAudience { .. } => AuthError::InvalidToken("Invalid audience".to_string()),
        _ => AuthError::InvalidToken(format!("Invalid token: {}", e)),
    })?;

    let provider_token = headers
        .get(PROVIDER_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let time_zone = match headers.get(TIME_ZONE_HEADER).and_then(|v| v.to_str().ok()) {
        Some(name) if !name.trim().is_empty() => {
            parse_time_zone(name).map_err(AuthError::SessionInvalid)?
        }
        _ => config.default_time_zone,
    };

    Session::resolve(claims, provider_token, time_zone, &config.calendar_provider).map_err(|e| {
        tracing::info!(error = %e, "Rejecting session");
        AuthError::SessionInvalid(e)
    })
}

/// Session middleware
///
/// Returns 401 when the token is missing, invalid, or expired, and 401
/// `session_invalid` when the user must sign in again.
pub async fn session_middleware(
    State(config): State<Arc<SessionConfig>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let session = session_from_headers(&config, req.headers())?;
    tracing::debug!(user_id = %session.user_id, "Session resolved");

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}
