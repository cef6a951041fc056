/// Task store clients
///
/// The [`TaskStore`] trait covers the row operations the sync coordinator
/// and the dashboard need, plus a table-wide change feed.
///
/// # Implementations
///
/// - [`postgres::PgTaskStore`]: PostgreSQL via sqlx, changes via `LISTEN/NOTIFY`
/// - [`memory::MemoryTaskStore`]: in-process store for tests and local runs
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::store::{memory::MemoryTaskStore, TaskStore};
/// use taskboard_shared::models::DayWindow;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), taskboard_shared::store::StoreError> {
/// let store = MemoryTaskStore::new();
/// let tasks = store.list_for_day(Uuid::new_v4(), &DayWindow::today()).await?;
/// assert!(tasks.is_empty());
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{DayWindow, NewTask, Task, TaskChanges};

/// Capacity of the change broadcast channel
pub const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Postgres notification channel fed by the `tasks` trigger
pub const CHANGE_CHANNEL: &str = "task_changes";

/// Structured store failure
///
/// Mirrors what the hosted database reports: a human message, optional
/// details, and an optional error code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
    pub details: Option<String>,
    pub code: Option<String>,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
            code: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                let details = db_err
                    .try_downcast_ref::<sqlx::postgres::PgDatabaseError>()
                    .and_then(|pg| pg.detail())
                    .map(str::to_string);
                StoreError {
                    message: db_err.message().to_string(),
                    details,
                    code: db_err.code().map(|c| c.into_owned()),
                }
            }
            sqlx::Error::PoolTimedOut => {
                StoreError::new("Database unavailable").with_details("connection pool timed out")
            }
            other => StoreError::new("Database error").with_details(other.to_string()),
        }
    }
}

/// Kind of row change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row-change notification
///
/// Wire shape: `{"type":"insert","id":"...","user_id":"..."}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskChange {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

/// Row operations on the `tasks` table
///
/// Every query is scoped by `user_id`; a row owned by someone else behaves
/// as if it did not exist.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Tasks owned by `user_id` with `reminder_time` inside `window`,
    /// ordered by `reminder_time` ascending
    async fn list_for_day(&self, user_id: Uuid, window: &DayWindow)
        -> Result<Vec<Task>, StoreError>;

    /// Looks up a single task
    async fn find(&self, id: Uuid, user_id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Inserts a row; the store assigns `id` and `created_at`
    async fn insert(&self, task: NewTask) -> Result<Task, StoreError>;

    /// Overwrites the editable fields and `event_id`
    async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        changes: TaskChanges,
    ) -> Result<Option<Task>, StoreError>;

    /// Sets `completed = true`, leaving every other column alone
    async fn mark_completed(&self, id: Uuid, user_id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Deletes a row, returning whether one was removed
    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;

    /// Subscribes to table-wide row changes
    fn subscribe(&self) -> broadcast::Receiver<TaskChange>;

    /// Checks that the backing store is reachable
    async fn health_check(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_payload_parsing() {
        let id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let payload = format!(r#"{{"type":"update","id":"{id}","user_id":"{user_id}"}}"#);

        let change: TaskChange = serde_json::from_str(&payload).unwrap();
        assert_eq!(change.kind, ChangeKind::Update);
        assert_eq!(change.id, id);
        assert_eq!(change.user_id, Some(user_id));
    }

    #[test]
    fn test_store_error_builders() {
        let err = StoreError::new("duplicate key")
            .with_details("Key (id) already exists.")
            .with_code("23505");
        assert_eq!(err.to_string(), "duplicate key");
        assert_eq!(err.details.as_deref(), Some("Key (id) already exists."));
        assert_eq!(err.code.as_deref(), Some("23505"));
    }

    #[test]
    fn test_store_error_from_sqlx() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.message, "Database error");
        assert!(err.details.is_some());
        assert!(err.code.is_none());
    }
}
