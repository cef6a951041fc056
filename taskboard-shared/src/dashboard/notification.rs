//! Transient outcome notifications

use serde::{Deserialize, Serialize};

use crate::calendar::CalendarError;
use crate::store::StoreError;
use crate::sync::SyncError;

/// A short-lived message shown after an action or a failed load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_error: bool,
}

impl Notification {
    fn success(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: Some(description.to_string()),
            is_error: false,
        }
    }

    fn error(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            title: title.into(),
            description,
            is_error: true,
        }
    }

    pub fn created() -> Self {
        Self::success("Task created", "Task has been created")
    }

    pub fn updated() -> Self {
        Self::success("Task updated", "Task has been updated")
    }

    pub fn deleted() -> Self {
        Self::success("Task deleted", "Task has been deleted")
    }

    /// Delete went through but the calendar event could not be removed
    pub fn deleted_with_calendar_error(error: &CalendarError) -> Self {
        Self {
            title: "Task deleted".to_string(),
            description: Some(format!(
                "Task has been deleted, but its calendar event could not be removed: {error}"
            )),
            is_error: true,
        }
    }

    pub fn completed() -> Self {
        Self::success("Task completed", "Task has been marked as completed")
    }

    /// Calendar failures read "Error" with the provider's message
    pub fn from_calendar_error(error: &CalendarError) -> Self {
        Self::error("Error", Some(error.to_string()))
    }

    /// Store failures use the store message as title and details as body
    pub fn from_store_error(error: &StoreError) -> Self {
        Self::error(error.message.clone(), error.details.clone())
    }

    pub fn from_sync_error(error: &SyncError) -> Self {
        match error {
            SyncError::Calendar(e) => Self::from_calendar_error(e),
            SyncError::Store(e) => Self::from_store_error(e),
            SyncError::NotFound(_) => Self::error("Error", Some("Task not found".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_error_text() {
        let n = Notification::from_calendar_error(&CalendarError::Api {
            status: 401,
            message: "Invalid Credentials".to_string(),
        });
        assert_eq!(n.title, "Error");
        assert_eq!(n.description.as_deref(), Some("Invalid Credentials"));
        assert!(n.is_error);
    }

    #[test]
    fn test_store_error_text() {
        let n = Notification::from_store_error(
            &StoreError::new("permission denied").with_details("row level security"),
        );
        assert_eq!(n.title, "permission denied");
        assert_eq!(n.description.as_deref(), Some("row level security"));
    }
}
