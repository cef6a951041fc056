/// Error handling for the API server
///
/// Every handler returns `ApiResult<T>`. Library errors from
/// `taskboard-shared` convert into [`ApiError`] with `?`, and failed board
/// actions carry the notification the client should show.
///
/// # Response Body
///
/// ```json
/// {
///   "error": "calendar_error",
///   "message": "Invalid Credentials",
///   "notification": { "title": "Error", "description": "Invalid Credentials", "is_error": true }
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use taskboard_shared::dashboard::{ActionFailure, DialogError, Notification, SubmitError};
use taskboard_shared::store::StoreError;
use taskboard_shared::sync::SyncError;
use taskboard_shared::validation::{FieldError, FieldErrors};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Not found (404)
    NotFound(String),

    /// Unprocessable entity (422), one entry per failing field
    ValidationError(Vec<FieldError>),

    /// The calendar provider rejected the request (502)
    Calendar {
        message: String,
        notification: Option<Notification>,
    },

    /// The task store rejected the request (500)
    Store {
        error: StoreError,
        notification: Option<Notification>,
    },
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "validation_error", "calendar_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// What the board shows for this failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Calendar { message, .. } => write!(f, "Calendar error: {}", message),
            ApiError::Store { error, .. } => write!(f, "Store error: {}", error),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details, notification) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                serde_json::to_value(errors).ok(),
                None,
            ),
            ApiError::Calendar {
                message,
                notification,
            } => (StatusCode::BAD_GATEWAY, "calendar_error", message, None, notification),
            ApiError::Store {
                error,
                notification,
            } => {
                tracing::error!(
                    message = %error.message,
                    details = ?error.details,
                    code = ?error.code,
                    "Store error"
                );
                let details = serde_json::json!({
                    "details": error.details,
                    "code": error.code,
                });
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_error",
                    error.message,
                    Some(details),
                    notification,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
            notification,
        });

        (status, body).into_response()
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::ValidationError(errors.0)
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        ApiError::Store {
            error,
            notification: None,
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::Calendar(e) => ApiError::Calendar {
                message: e.to_string(),
                notification: None,
            },
            SyncError::Store(e) => e.into(),
            SyncError::NotFound(id) => ApiError::NotFound(format!("Task {} not found", id)),
        }
    }
}

/// Keeps the board notification alongside the mapped error
impl From<ActionFailure> for ApiError {
    fn from(failure: ActionFailure) -> Self {
        let notification = Some(failure.notification);
        match ApiError::from(failure.error) {
            ApiError::Calendar { message, .. } => ApiError::Calendar {
                message,
                notification,
            },
            ApiError::Store { error, .. } => ApiError::Store {
                error,
                notification,
            },
            other => other,
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(error: SubmitError) -> Self {
        match error {
            SubmitError::Dialog(DialogError::Invalid(errors)) => errors.into(),
            SubmitError::Dialog(DialogError::NotOpen) => {
                ApiError::BadRequest("Task form is not open".to_string())
            }
            SubmitError::Action(failure) => failure.into(),
        }
    }
}
