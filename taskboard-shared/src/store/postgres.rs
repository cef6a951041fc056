/// PostgreSQL task store
///
/// Runtime-checked queries against the `tasks` table. Row changes are
/// published by the `notify_task_change` trigger on the `task_changes`
/// channel; [`PgTaskStore::spawn_listener`] forwards them to subscribers.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskboard_shared::store::postgres::PgTaskStore;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let store = PgTaskStore::new(pool);
/// let shutdown = CancellationToken::new();
/// let _listener = store.spawn_listener(shutdown.clone()).await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{StoreError, TaskChange, TaskStore, CHANGE_CHANNEL, CHANGE_CHANNEL_CAPACITY};
use crate::db::pool;
use crate::models::{DayWindow, NewTask, Task, TaskChanges};

/// Task store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgTaskStore {
    pool: PgPool,
    changes: broadcast::Sender<TaskChange>,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { pool, changes }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Starts forwarding `task_changes` notifications to subscribers
    ///
    /// The listener runs until `shutdown` is cancelled. Payloads that do not
    /// parse are logged and dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the listening connection cannot be established.
    pub async fn spawn_listener(
        &self,
        shutdown: CancellationToken,
    ) -> Result<JoinHandle<()>, StoreError> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;
        tracing::info!(channel = CHANGE_CHANNEL, "Listening for task changes");

        let changes = self.changes.clone();
        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("Task change listener shutting down");
                        break;
                    }
                    received = listener.recv() => match received {
                        Ok(notification) => {
                            match serde_json::from_str::<TaskChange>(notification.payload()) {
                                Ok(change) => {
                                    tracing::debug!(
                                        task_id = %change.id,
                                        kind = ?change.kind,
                                        "Task change received"
                                    );
                                    // No receivers is not an error
                                    let _ = changes.send(change);
                                }
                                Err(e) => {
                                    tracing::warn!(
                                        error = %e,
                                        payload = notification.payload(),
                                        "Ignoring malformed task change payload"
                                    );
                                }
                            }
                        }
                        Err(e) => {
                            // PgListener reconnects on the next recv
                            tracing::warn!(error = %e, "Task change listener error");
                            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                        }
                    },
                }
            }
        }))
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn list_for_day(
        &self,
        user_id: Uuid,
        window: &DayWindow,
    ) -> Result<Vec<Task>, StoreError> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, reminder_time, created_at, completed, event_id
            FROM tasks
            WHERE user_id = $1
              AND reminder_time >= $2
              AND reminder_time < $3
            ORDER BY reminder_time ASC
            "#,
        )
        .bind(user_id)
        .bind(window.start)
        .bind(window.next_start())
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    async fn find(&self, id: Uuid, user_id: Uuid) -> Result<Option<Task>, StoreError> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, reminder_time, created_at, completed, event_id
            FROM tasks
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (user_id, title, description, reminder_time, completed, event_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, title, description, reminder_time, created_at, completed, event_id
            "#,
        )
        .bind(task.user_id)
        .bind(task.fields.title)
        .bind(task.fields.description)
        .bind(task.fields.reminder_time)
        .bind(task.fields.completed)
        .bind(task.event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(task)
    }

    async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        changes: TaskChanges,
    ) -> Result<Option<Task>, StoreError> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = $3,
                description = $4,
                reminder_time = $5,
                completed = $6,
                event_id = $7
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, reminder_time, created_at, completed, event_id
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(changes.fields.title)
        .bind(changes.fields.description)
        .bind(changes.fields.reminder_time)
        .bind(changes.fields.completed)
        .bind(changes.event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn mark_completed(&self, id: Uuid, user_id: Uuid) -> Result<Option<Task>, StoreError> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET completed = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, reminder_time, created_at, completed, event_id
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    fn subscribe(&self) -> broadcast::Receiver<TaskChange> {
        self.changes.subscribe()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        pool::health_check(&self.pool).await?;
        Ok(())
    }
}
