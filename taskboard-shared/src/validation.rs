//! Task form validation
//!
//! Turns raw form input into [`TaskFields`] or a list of field-level
//! errors. Nothing here touches the network; an invalid form never reaches
//! the calendar or the store.
//!
//! # Rules
//!
//! - `title`: at least 2 characters
//! - `description`: 10 to 100 characters
//! - `reminder_time`: required
//! - `time_zone`: optional IANA name
//!
//! # Example
//!
//! ```
//! use taskboard_shared::validation::TaskForm;
//!
//! let form = TaskForm {
//!     title: "R".to_string(),
//!     description: "short".to_string(),
//!     ..Default::default()
//! };
//! let errors = form.validate().unwrap_err();
//! assert_eq!(errors.len(), 3);
//! ```

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Task, TaskFields};

/// Matches the presentation layer's textarea limit
pub const DESCRIPTION_MAX_CHARS: usize = 100;

pub const TITLE_TOO_SHORT: &str = "Task title must be at least 2 characters.";
pub const DESCRIPTION_TOO_SHORT: &str = "Task description must be at least 10 characters.";
pub const DESCRIPTION_TOO_LONG: &str = "Task description must be at most 100 characters.";
pub const REMINDER_REQUIRED: &str = "Reminder time is required.";
pub const UNKNOWN_TIME_ZONE: &str = "Unknown time zone.";

/// Raw task form input, as submitted by the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TaskForm {
    #[validate(length(min = 2, message = "Task title must be at least 2 characters."))]
    #[serde(default)]
    pub title: String,

    #[validate(length(min = 10, message = "Task description must be at least 10 characters."))]
    #[serde(default)]
    pub description: String,

    #[validate(required(message = "Reminder time is required."))]
    #[serde(default)]
    pub reminder_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub completed: bool,

    /// Overrides the session time zone for the mirrored event
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All field errors of a rejected form, ordered by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("invalid task form: {}", summary(.0))]
pub struct FieldErrors(pub Vec<FieldError>);

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl FieldErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages reported for one field
    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = Vec::new();
        for (field, list) in errors.field_errors() {
            for error in list.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                out.push(FieldError {
                    field: field.to_string(),
                    message,
                });
            }
        }
        out.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
        FieldErrors(out)
    }
}

impl TaskForm {
    /// Prefills a form from an existing task (used for duplicate)
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            reminder_time: Some(task.reminder_time),
            completed: task.completed,
            time_zone: None,
        }
    }

    /// Validates the form
    ///
    /// # Errors
    ///
    /// Returns every failing field at once, not just the first.
    pub fn validate(&self) -> Result<TaskFields, FieldErrors> {
        let mut errors = match Validate::validate(self) {
            Ok(()) => FieldErrors::default(),
            Err(e) => FieldErrors::from(e),
        };

        if self.description.chars().count() > DESCRIPTION_MAX_CHARS {
            errors.0.push(FieldError {
                field: "description".to_string(),
                message: DESCRIPTION_TOO_LONG.to_string(),
            });
        }

        if let Err(tz_error) = self.parsed_time_zone() {
            errors.0.push(tz_error);
        }

        match self.reminder_time {
            Some(reminder_time) if errors.is_empty() => Ok(TaskFields {
                title: self.title.clone(),
                description: self.description.clone(),
                reminder_time,
                completed: self.completed,
            }),
            _ => Err(errors),
        }
    }

    /// The requested time zone, if one was given and is a known IANA name
    pub fn time_zone(&self) -> Option<Tz> {
        self.parsed_time_zone().ok().flatten()
    }

    fn parsed_time_zone(&self) -> Result<Option<Tz>, FieldError> {
        match self.time_zone.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(name) => name.parse::<Tz>().map(Some).map_err(|_| FieldError {
                field: "time_zone".to_string(),
                message: UNKNOWN_TIME_ZONE.to_string(),
            }),
        }
    }
}
