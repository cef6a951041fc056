//! Dashboard controller
//!
//! Holds the task list for one user and one selected day, keeps it fresh
//! from the store's change feed, and turns user actions into sync
//! coordinator calls plus a notification.
//!
//! # Lifecycle
//!
//! 1. [`DashboardController::mount`] subscribes to table-wide changes, loads
//!    the list, and spawns a loop that reloads on every change.
//! 2. [`DashboardController::dispatch`] runs an action and reloads.
//! 3. Dropping the returned [`Subscription`] stops the loop.
//!
//! The change loop and the post-action reload are not coordinated; whichever
//! load completes last wins.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskboard_shared::auth::session::Session;
//! use taskboard_shared::calendar::mock::MockCalendar;
//! use taskboard_shared::dashboard::{DashboardController, TaskAction};
//! use taskboard_shared::store::memory::MemoryTaskStore;
//! use taskboard_shared::sync::{DeletePolicy, SyncCoordinator};
//! use uuid::Uuid;
//!
//! # async fn example() {
//! let sync = SyncCoordinator::new(
//!     Arc::new(MemoryTaskStore::new()),
//!     Arc::new(MockCalendar::new()),
//!     DeletePolicy::Proceed,
//! );
//! let dashboard = DashboardController::new(sync, Session::new(Uuid::new_v4()));
//! let _subscription = dashboard.mount().await;
//! println!("{} tasks today", dashboard.snapshot().tasks.len());
//! # }
//! ```

pub mod dialog;
pub mod notification;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::{broadcast::error::RecvError, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub use dialog::{DialogError, DialogMode, DialogState, Submission, TaskDialog};
pub use notification::Notification;

use crate::auth::session::Session;
use crate::models::{DayWindow, Task, TaskFields};
use crate::store::StoreError;
use crate::sync::{SyncCoordinator, SyncError};

/// A user action on the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    Create {
        fields: TaskFields,
    },
    Edit {
        task_id: Uuid,
        event_id: Option<String>,
        fields: TaskFields,
    },
    /// Create from another task's (possibly edited) values
    Duplicate {
        fields: TaskFields,
    },
    Complete {
        task_id: Uuid,
    },
    Delete {
        task_id: Uuid,
        event_id: Option<String>,
    },
}

/// A failed action and the notification it produced
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ActionFailure {
    pub notification: Notification,
    #[source]
    pub error: SyncError,
}

/// Errors from [`DashboardController::submit_dialog`]
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Dialog(#[from] DialogError),

    #[error(transparent)]
    Action(#[from] ActionFailure),
}

/// What the presentation layer renders
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub date: NaiveDate,
    pub tasks: Vec<Task>,
    /// Pending notifications, oldest first
    pub notifications: Vec<Notification>,
    /// Whether at least one load succeeded
    pub loaded: bool,
}

impl DashboardView {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            tasks: Vec::new(),
            notifications: Vec::new(),
            loaded: false,
        }
    }
}

/// Stops the change loop when dropped
pub struct Subscription {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Cancels the loop and waits for it to exit
    pub async fn unmount(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Per-user dashboard state and action dispatch
#[derive(Clone)]
pub struct DashboardController {
    sync: SyncCoordinator,
    session: Session,
    view: Arc<watch::Sender<DashboardView>>,
}

impl DashboardController {
    /// Controller showing today's (UTC) tasks
    pub fn new(sync: SyncCoordinator, session: Session) -> Self {
        Self::for_date(sync, session, Utc::now().date_naive())
    }

    pub fn for_date(sync: SyncCoordinator, session: Session, date: NaiveDate) -> Self {
        let (view, _) = watch::channel(DashboardView::new(date));
        Self {
            sync,
            session,
            view: Arc::new(view),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current view
    pub fn snapshot(&self) -> DashboardView {
        self.view.borrow().clone()
    }

    /// Receives every view change
    pub fn watch(&self) -> watch::Receiver<DashboardView> {
        self.view.subscribe()
    }

    /// Removes and returns pending notifications
    pub fn take_notifications(&self) -> Vec<Notification> {
        let mut taken = Vec::new();
        self.view.send_if_modified(|view| {
            taken = std::mem::take(&mut view.notifications);
            !taken.is_empty()
        });
        taken
    }

    fn notify(&self, notification: Notification) {
        self.view
            .send_modify(|view| view.notifications.push(notification));
    }

    /// Switches the selected day and loads it
    pub async fn select_date(&self, date: NaiveDate) -> Result<Vec<Task>, StoreError> {
        self.view.send_modify(|view| {
            if view.date != date {
                view.date = date;
                view.tasks.clear();
                view.loaded = false;
            }
        });
        self.load().await
    }

    /// Loads the selected day's tasks
    ///
    /// On failure a notification is queued and the current list is kept.
    pub async fn load(&self) -> Result<Vec<Task>, StoreError> {
        let date = self.view.borrow().date;
        let window = DayWindow::for_date(date);

        match self
            .sync
            .store()
            .list_for_day(self.session.user_id, &window)
            .await
        {
            Ok(tasks) => {
                self.view.send_modify(|view| {
                    // A newer select_date wins over this result
                    if view.date == date {
                        view.tasks = tasks.clone();
                        view.loaded = true;
                    }
                });
                tracing::debug!(
                    user_id = %self.session.user_id,
                    date = %date,
                    count = tasks.len(),
                    "Dashboard loaded"
                );
                Ok(tasks)
            }
            Err(e) => {
                tracing::warn!(user_id = %self.session.user_id, error = %e, "Dashboard load failed");
                self.notify(Notification::from_store_error(&e));
                Err(e)
            }
        }
    }

    /// Loads once and keeps reloading on every store change until the
    /// returned [`Subscription`] is dropped
    pub async fn mount(&self) -> Subscription {
        // Subscribe before the first load so no change slips in between
        let mut changes = self.sync.store().subscribe();
        let _ = self.load().await;

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let this = self.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    received = changes.recv() => match received {
                        Ok(change) => {
                            tracing::debug!(task_id = %change.id, kind = ?change.kind, "Reloading after change");
                            let _ = this.load().await;
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Change feed lagged, reloading");
                            let _ = this.load().await;
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            tracing::debug!(user_id = %this.session.user_id, "Dashboard unmounted");
        });

        Subscription {
            token,
            handle: Some(handle),
        }
    }

    /// Runs an action with the controller's session
    pub async fn dispatch(&self, action: TaskAction) -> Result<Notification, ActionFailure> {
        let session = self.session.clone();
        self.dispatch_as(&session, action).await
    }

    /// Validates and dispatches a dialog, then closes it
    ///
    /// A validation failure leaves the dialog open and issues no calls. Any
    /// other outcome closes it.
    pub async fn submit_dialog(&self, dialog: &mut TaskDialog) -> Result<Notification, SubmitError> {
        let submission = dialog.submit()?;
        let session = match submission.time_zone {
            Some(tz) => self.session.clone().with_time_zone(tz),
            None => self.session.clone(),
        };

        let result = self.dispatch_as(&session, submission.action).await;
        dialog.finish();
        Ok(result?)
    }

    async fn dispatch_as(
        &self,
        session: &Session,
        action: TaskAction,
    ) -> Result<Notification, ActionFailure> {
        let outcome = self.run(session, action).await;

        match outcome {
            Ok(notification) => {
                self.notify(notification.clone());
                let _ = self.load().await;
                Ok(notification)
            }
            Err(error) => {
                tracing::warn!(user_id = %session.user_id, error = %error, "Task action failed");
                let notification = Notification::from_sync_error(&error);
                self.notify(notification.clone());
                Err(ActionFailure {
                    notification,
                    error,
                })
            }
        }
    }

    async fn run(&self, session: &Session, action: TaskAction) -> Result<Notification, SyncError> {
        match action {
            TaskAction::Create { fields } | TaskAction::Duplicate { fields } => {
                self.sync.create(session, fields).await?;
                Ok(Notification::created())
            }
            TaskAction::Edit {
                task_id,
                event_id,
                fields,
            } => {
                self.sync
                    .update(session, task_id, event_id.as_deref(), fields)
                    .await?;
                Ok(Notification::updated())
            }
            TaskAction::Complete { task_id } => {
                self.sync.complete(session, task_id).await?;
                Ok(Notification::completed())
            }
            TaskAction::Delete { task_id, event_id } => {
                let report = self.sync.delete(session, task_id, event_id.as_deref()).await?;
                Ok(match &report.calendar_error {
                    Some(e) => Notification::deleted_with_calendar_error(e),
                    None => Notification::deleted(),
                })
            }
        }
    }
}
