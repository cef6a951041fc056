/// In-memory task store
///
/// Behaves like the PostgreSQL store, including change notifications on
/// every write, without a database. Failures can be injected with
/// [`MemoryTaskStore::fail_next`].

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use super::{ChangeKind, StoreError, TaskChange, TaskStore, CHANGE_CHANNEL_CAPACITY};
use crate::models::{DayWindow, NewTask, Task, TaskChanges};

/// Operation recorded by [`MemoryTaskStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    List { user_id: Uuid },
    Find { id: Uuid },
    Insert { event_id: Option<String> },
    Update { id: Uuid, event_id: Option<String> },
    MarkCompleted { id: Uuid },
    Delete { id: Uuid },
}

pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
    changes: broadcast::Sender<TaskChange>,
    failures: Mutex<VecDeque<StoreError>>,
    list_failures: Mutex<VecDeque<StoreError>>,
    ops: Mutex<Vec<StoreOp>>,
}

impl Default for MemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            tasks: RwLock::new(HashMap::new()),
            changes,
            failures: Mutex::new(VecDeque::new()),
            list_failures: Mutex::new(VecDeque::new()),
            ops: Mutex::new(Vec::new()),
        }
    }

    /// Makes the next store operation fail with `error`
    pub fn fail_next(&self, error: StoreError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back(error);
        }
    }

    /// Makes the next day listing fail with `error`, leaving writes alone
    pub fn fail_next_list(&self, error: StoreError) {
        if let Ok(mut failures) = self.list_failures.lock() {
            failures.push_back(error);
        }
    }

    /// Operations issued so far, oldest first
    pub fn operations(&self) -> Vec<StoreOp> {
        self.ops.lock().map(|ops| ops.clone()).unwrap_or_default()
    }

    /// Snapshot of every stored row
    pub async fn all(&self) -> Vec<Task> {
        self.tasks.read().await.values().cloned().collect()
    }

    /// Emits a change as if another writer had touched the table
    pub fn notify(&self, change: TaskChange) {
        let _ = self.changes.send(change);
    }

    fn record(&self, op: StoreOp) -> Result<(), StoreError> {
        if let Ok(mut ops) = self.ops.lock() {
            ops.push(op);
        }
        let injected = self.failures.lock().ok().and_then(|mut f| f.pop_front());
        match injected {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn publish(&self, kind: ChangeKind, task: &Task) {
        self.notify(TaskChange {
            kind,
            id: task.id,
            user_id: Some(task.user_id),
        });
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn list_for_day(
        &self,
        user_id: Uuid,
        window: &DayWindow,
    ) -> Result<Vec<Task>, StoreError> {
        self.record(StoreOp::List { user_id })?;
        if let Some(error) = self.list_failures.lock().ok().and_then(|mut f| f.pop_front()) {
            return Err(error);
        }

        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.user_id == user_id && window.contains(t.reminder_time))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| (t.reminder_time, t.created_at));
        Ok(tasks)
    }

    async fn find(&self, id: Uuid, user_id: Uuid) -> Result<Option<Task>, StoreError> {
        self.record(StoreOp::Find { id })?;

        Ok(self
            .tasks
            .read()
            .await
            .get(&id)
            .filter(|t| t.user_id == user_id)
            .cloned())
    }

    async fn insert(&self, new: NewTask) -> Result<Task, StoreError> {
        self.record(StoreOp::Insert {
            event_id: new.event_id.clone(),
        })?;

        let task = Task {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            title: new.fields.title,
            description: new.fields.description,
            reminder_time: new.fields.reminder_time,
            created_at: Utc::now(),
            completed: new.fields.completed,
            event_id: new.event_id,
        };
        self.tasks.write().await.insert(task.id, task.clone());
        self.publish(ChangeKind::Insert, &task);
        Ok(task)
    }

    async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        changes: TaskChanges,
    ) -> Result<Option<Task>, StoreError> {
        self.record(StoreOp::Update {
            id,
            event_id: changes.event_id.clone(),
        })?;

        let updated = {
            let mut tasks = self.tasks.write().await;
            match tasks.get_mut(&id).filter(|t| t.user_id == user_id) {
                Some(task) => {
                    task.title = changes.fields.title;
                    task.description = changes.fields.description;
                    task.reminder_time = changes.fields.reminder_time;
                    task.completed = changes.fields.completed;
                    task.event_id = changes.event_id;
                    Some(task.clone())
                }
                None => None,
            }
        };
        if let Some(task) = &updated {
            self.publish(ChangeKind::Update, task);
        }
        Ok(updated)
    }

    async fn mark_completed(&self, id: Uuid, user_id: Uuid) -> Result<Option<Task>, StoreError> {
        self.record(StoreOp::MarkCompleted { id })?;

        let updated = {
            let mut tasks = self.tasks.write().await;
            match tasks.get_mut(&id).filter(|t| t.user_id == user_id) {
                Some(task) => {
                    task.completed = true;
                    Some(task.clone())
                }
                None => None,
            }
        };
        if let Some(task) = &updated {
            self.publish(ChangeKind::Update, task);
        }
        Ok(updated)
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        self.record(StoreOp::Delete { id })?;

        let removed = {
            let mut tasks = self.tasks.write().await;
            if tasks.get(&id).is_some_and(|t| t.user_id == user_id) {
                tasks.remove(&id)
            } else {
                None
            }
        };
        if let Some(task) = &removed {
            self.publish(ChangeKind::Delete, task);
        }
        Ok(removed.is_some())
    }

    fn subscribe(&self) -> broadcast::Receiver<TaskChange> {
        self.changes.subscribe()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
