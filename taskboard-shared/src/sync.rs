//! Task/event synchronization
//!
//! [`SyncCoordinator`] keeps a task row and its mirrored calendar event in
//! step across create, update, complete and delete.
//!
//! # Ordering
//!
//! The calendar call is always awaited before the store call starts. The
//! two are not transactional:
//!
//! - a store failure after a successful event create leaves the event behind
//! - a failed calendar update aborts before the row is touched
//! - a failed calendar delete still deletes the row under
//!   [`DeletePolicy::Proceed`]
//!
//! Without a calendar token in the session every calendar call is skipped.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskboard_shared::auth::session::Session;
//! use taskboard_shared::calendar::mock::MockCalendar;
//! use taskboard_shared::models::TaskFields;
//! use taskboard_shared::store::memory::MemoryTaskStore;
//! use taskboard_shared::sync::{DeletePolicy, SyncCoordinator};
//! use uuid::Uuid;
//!
//! # async fn example() -> Result<(), taskboard_shared::sync::SyncError> {
//! let sync = SyncCoordinator::new(
//!     Arc::new(MemoryTaskStore::new()),
//!     Arc::new(MockCalendar::new()),
//!     DeletePolicy::Proceed,
//! );
//! let session = Session::new(Uuid::new_v4()).with_provider_token("ya29.token");
//! let task = sync
//!     .create(&session, TaskFields {
//!         title: "Read".to_string(),
//!         description: "Read ten pages".to_string(),
//!         reminder_time: "2024-01-01T10:00:00Z".parse().unwrap(),
//!         completed: false,
//!     })
//!     .await?;
//! assert!(task.event_id.is_some());
//! # Ok(())
//! # }
//! ```

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::session::Session;
use crate::calendar::{CalendarApi, CalendarError, EventRequest};
use crate::models::{NewTask, Task, TaskChanges, TaskFields};
use crate::store::{StoreError, TaskStore};

/// What to do with the row when the calendar delete fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Delete the row anyway and report the calendar failure
    #[default]
    Proceed,

    /// Keep the row and fail the delete
    Block,
}

impl FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proceed" => Ok(DeletePolicy::Proceed),
            "block" => Ok(DeletePolicy::Block),
            other => Err(format!("unknown delete policy '{other}' (expected proceed or block)")),
        }
    }
}

/// Errors from sync operations
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Task not found: {0}")]
    NotFound(Uuid),
}

/// Outcome of a delete
#[derive(Debug, Default)]
pub struct DeleteReport {
    /// Whether a calendar delete was issued
    pub calendar_attempted: bool,

    /// Calendar failure that did not stop the row delete
    pub calendar_error: Option<CalendarError>,
}

/// Coordinates calendar and store calls for task writes
#[derive(Clone)]
pub struct SyncCoordinator {
    store: Arc<dyn TaskStore>,
    calendar: Arc<dyn CalendarApi>,
    delete_policy: DeletePolicy,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn TaskStore>,
        calendar: Arc<dyn CalendarApi>,
        delete_policy: DeletePolicy,
    ) -> Self {
        Self {
            store,
            calendar,
            delete_policy,
        }
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    /// Creates a task, mirroring it to the calendar when a token is present
    ///
    /// # Errors
    ///
    /// A calendar error aborts before the insert. A store error after a
    /// successful event create leaves the event in place.
    pub async fn create(&self, session: &Session, fields: TaskFields) -> Result<Task, SyncError> {
        let event_id = match session.calendar_token() {
            Some(token) => {
                let request = EventRequest::from_fields(&fields, session.time_zone);
                let event = self.calendar.create_event(token, &request).await?;
                Some(event.id)
            }
            None => None,
        };

        let task = self
            .store
            .insert(NewTask {
                user_id: session.user_id,
                fields,
                event_id: event_id.clone(),
            })
            .await
            .map_err(|e| {
                if let Some(event_id) = &event_id {
                    tracing::warn!(
                        event_id = %event_id,
                        error = %e,
                        "Task insert failed after calendar event was created"
                    );
                }
                e
            })?;

        tracing::info!(
            task_id = %task.id,
            user_id = %session.user_id,
            event_id = ?task.event_id,
            "Task created"
        );
        Ok(task)
    }

    /// Updates a task and its event
    ///
    /// The event is updated only when both a token and `existing_event_id`
    /// are present; the row keeps `existing_event_id` either way.
    pub async fn update(
        &self,
        session: &Session,
        task_id: Uuid,
        existing_event_id: Option<&str>,
        fields: TaskFields,
    ) -> Result<Task, SyncError> {
        let existing_event_id = existing_event_id.filter(|id| !id.is_empty());

        let event_id = match (session.calendar_token(), existing_event_id) {
            (Some(token), Some(event_id)) => {
                let request = EventRequest::from_fields(&fields, session.time_zone);
                let event = self.calendar.update_event(token, event_id, &request).await?;
                Some(if event.id.is_empty() {
                    event_id.to_string()
                } else {
                    event.id
                })
            }
            _ => existing_event_id.map(str::to_string),
        };

        let task = self
            .store
            .update(task_id, session.user_id, TaskChanges { fields, event_id })
            .await?
            .ok_or(SyncError::NotFound(task_id))?;

        tracing::info!(task_id = %task.id, event_id = ?task.event_id, "Task updated");
        Ok(task)
    }

    /// Marks a task as completed without touching the calendar
    pub async fn complete(&self, session: &Session, task_id: Uuid) -> Result<Task, SyncError> {
        let task = self
            .store
            .mark_completed(task_id, session.user_id)
            .await?
            .ok_or(SyncError::NotFound(task_id))?;

        tracing::info!(task_id = %task.id, "Task completed");
        Ok(task)
    }

    /// Deletes the event (when there is one and a token) and then the row
    ///
    /// # Errors
    ///
    /// Under [`DeletePolicy::Block`] a calendar failure is returned and the
    /// row is kept. Under [`DeletePolicy::Proceed`] it is reported in the
    /// [`DeleteReport`] instead.
    pub async fn delete(
        &self,
        session: &Session,
        task_id: Uuid,
        event_id: Option<&str>,
    ) -> Result<DeleteReport, SyncError> {
        let mut report = DeleteReport::default();

        if let (Some(token), Some(event_id)) =
            (session.calendar_token(), event_id.filter(|id| !id.is_empty()))
        {
            report.calendar_attempted = true;
            if let Err(e) = self.calendar.delete_event(token, event_id).await {
                match self.delete_policy {
                    DeletePolicy::Block => {
                        tracing::warn!(
                            task_id = %task_id,
                            event_id = %event_id,
                            error = %e,
                            "Calendar delete failed, keeping task"
                        );
                        return Err(e.into());
                    }
                    DeletePolicy::Proceed => {
                        tracing::warn!(
                            task_id = %task_id,
                            event_id = %event_id,
                            error = %e,
                            "Calendar delete failed, deleting task anyway"
                        );
                        report.calendar_error = Some(e);
                    }
                }
            }
        }

        if !self.store.delete(task_id, session.user_id).await? {
            return Err(SyncError::NotFound(task_id));
        }

        tracing::info!(task_id = %task_id, "Task deleted");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_policy_parsing() {
        assert_eq!("proceed".parse::<DeletePolicy>().unwrap(), DeletePolicy::Proceed);
        assert_eq!(" BLOCK ".parse::<DeletePolicy>().unwrap(), DeletePolicy::Block);
        assert!("maybe".parse::<DeletePolicy>().is_err());
        assert_eq!(DeletePolicy::default(), DeletePolicy::Proceed);
    }
}
