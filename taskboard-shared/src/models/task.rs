//! Task model
//!
//! A task is a user-owned reminder that may be mirrored to an external
//! calendar as a one-hour event. The row carries the id of that event in
//! `event_id`.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE tasks (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     user_id UUID NOT NULL,
//!     title TEXT NOT NULL,
//!     description TEXT NOT NULL,
//!     reminder_time TIMESTAMPTZ NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     completed BOOLEAN NOT NULL DEFAULT FALSE,
//!     event_id TEXT
//! );
//! ```
//!
//! Every write fires a `task_changes` notification (see `migrations/`).

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::linkify::{linkify, Segment};

/// Columns selected by every task query
pub const TASK_COLUMNS: &str =
    "id, user_id, title, description, reminder_time, created_at, completed, event_id";

/// A stored task row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID, assigned by the store
    pub id: Uuid,

    /// Owner of the task
    pub user_id: Uuid,

    /// Short title (at least 2 characters)
    pub title: String,

    /// Free text description, may contain bare URLs
    pub description: String,

    /// When the task is due
    pub reminder_time: DateTime<Utc>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// Whether the task has been marked as done
    pub completed: bool,

    /// Id of the mirrored calendar event, if any
    pub event_id: Option<String>,
}

impl Task {
    /// The user-editable fields of this task
    pub fn fields(&self) -> TaskFields {
        TaskFields {
            title: self.title.clone(),
            description: self.description.clone(),
            reminder_time: self.reminder_time,
            completed: self.completed,
        }
    }

    /// Returns the event id when it is present and non-empty
    pub fn linked_event_id(&self) -> Option<&str> {
        self.event_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Splits the description into text and link segments for rendering
    pub fn description_segments(&self) -> Vec<Segment> {
        linkify(&self.description)
    }
}

/// Validated, user-editable task fields
///
/// Produced by [`crate::validation::TaskForm::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub reminder_time: DateTime<Utc>,
    #[serde(default)]
    pub completed: bool,
}

/// Input for inserting a new task row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Owner (taken from the session, never from the client)
    pub user_id: Uuid,

    /// Field values
    pub fields: TaskFields,

    /// Mirrored calendar event id
    pub event_id: Option<String>,
}

/// Input for updating an existing task row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskChanges {
    /// New field values
    pub fields: TaskFields,

    /// Event id to store alongside (possibly unchanged)
    pub event_id: Option<String>,
}

/// The UTC day a dashboard shows
///
/// `start` and `end` are the displayed bounds, `00:00:00` and `23:59:59` UTC
/// of the selected date. Membership is half-open up to the next midnight so
/// sub-second reminder times late in the day still belong to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Builds the window for a calendar date
    pub fn for_date(date: NaiveDate) -> Self {
        let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
        let end = start + Duration::days(1) - Duration::seconds(1);
        Self { date, start, end }
    }

    /// Window for the current UTC date
    pub fn today() -> Self {
        Self::for_date(Utc::now().date_naive())
    }

    /// First instant of the following day
    pub fn next_start(&self) -> DateTime<Utc> {
        self.start + Duration::days(1)
    }

    /// Checks whether a reminder time falls inside the window
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.next_start()
    }
}
