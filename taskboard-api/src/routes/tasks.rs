/// Task endpoints
///
/// Each request builds a [`DashboardController`] for the caller's session
/// and the requested day, runs one action through it, and answers with the
/// resulting notification and the reloaded day list.
///
/// # Endpoints
///
/// ```text
/// GET    /v1/tasks?date=YYYY-MM-DD
/// POST   /v1/tasks                      body: TaskForm
/// PUT    /v1/tasks/:id                  body: TaskForm
/// POST   /v1/tasks/:id/duplicate        body: optional field overrides
/// POST   /v1/tasks/:id/complete
/// DELETE /v1/tasks/:id
/// ```
///
/// Write endpoints also accept `?date=` to pick which day is returned.
///
/// # Example Response
///
/// ```json
/// {
///   "notification": { "title": "Task created", "description": "Task has been created", "is_error": false },
///   "date": "2024-01-01",
///   "tasks": [
///     {
///       "id": "550e8400-e29b-41d4-a716-446655440000",
///       "title": "Standup",
///       "description": "Notes at https://notes.example.com",
///       "reminder_time": "2024-01-01T10:00:00Z",
///       "completed": false,
///       "event_id": "abc123",
///       "description_segments": [
///         { "kind": "text", "text": "Notes at " },
///         { "kind": "link", "href": "https://notes.example.com", "text": "https://notes.example.com" }
///       ]
///     }
///   ]
/// }
/// ```

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use taskboard_shared::auth::session::Session;
use taskboard_shared::dashboard::{DashboardController, Notification, TaskAction, TaskDialog};
use taskboard_shared::linkify::Segment;
use taskboard_shared::models::Task;
use taskboard_shared::validation::TaskForm;
use uuid::Uuid;

/// `?date=YYYY-MM-DD`, defaulting to today (UTC)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

impl DateQuery {
    pub fn resolve(&self) -> ApiResult<NaiveDate> {
        match self.date.as_deref().map(str::trim) {
            None | Some("") => Ok(Utc::now().date_naive()),
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                ApiError::BadRequest(format!("Invalid date '{}', expected YYYY-MM-DD", raw))
            }),
        }
    }
}

/// A task with its description split into text and link segments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    #[serde(flatten)]
    pub task: Task,
    pub description_segments: Vec<Segment>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        let description_segments = task.description_segments();
        Self {
            task,
            description_segments,
        }
    }
}

/// Day list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub date: NaiveDate,
    pub tasks: Vec<TaskResponse>,
}

impl TaskListResponse {
    pub fn new(date: NaiveDate, tasks: Vec<Task>) -> Self {
        Self {
            date,
            tasks: tasks.into_iter().map(TaskResponse::from).collect(),
        }
    }
}

/// Result of a task action
///
/// `notifications` carries anything raised while reloading the day after
/// the action. `tasks` is left out when the day has not loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub notification: Notification,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<Notification>,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<TaskResponse>>,
}

impl ActionResponse {
    fn new(notification: Notification, dashboard: &DashboardController) -> Self {
        let mut notifications = dashboard.take_notifications();
        if let Some(own) = notifications.iter().position(|n| *n == notification) {
            notifications.remove(own);
        }

        let view = dashboard.snapshot();
        let tasks = view
            .loaded
            .then(|| view.tasks.into_iter().map(TaskResponse::from).collect());

        Self {
            notification,
            notifications,
            date: view.date,
            tasks,
        }
    }
}

/// Field overrides applied to a duplicated task
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DuplicateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub reminder_time: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
    pub time_zone: Option<String>,
}

impl DuplicateRequest {
    fn apply(self, form: &mut TaskForm) {
        if let Some(title) = self.title {
            form.title = title;
        }
        if let Some(description) = self.description {
            form.description = description;
        }
        if let Some(reminder_time) = self.reminder_time {
            form.reminder_time = Some(reminder_time);
        }
        if let Some(completed) = self.completed {
            form.completed = completed;
        }
        if self.time_zone.is_some() {
            form.time_zone = self.time_zone;
        }
    }
}

fn controller(state: &AppState, session: Session, date: NaiveDate) -> DashboardController {
    DashboardController::for_date(state.sync.clone(), session, date)
}

async fn find_task(state: &AppState, session: &Session, id: Uuid) -> ApiResult<Task> {
    state
        .store
        .find(id, session.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", id)))
}

/// Lists the selected day's tasks, earliest reminder first
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<TaskListResponse>> {
    let date = query.resolve()?;
    let user_id = session.user_id;

    let tasks = controller(&state, session, date).load().await?;
    tracing::debug!(user_id = %user_id, date = %date, count = tasks.len(), "Listed tasks");

    Ok(Json(TaskListResponse::new(date, tasks)))
}

/// Creates a task from a form
pub async fn create_task(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<DateQuery>,
    Json(form): Json<TaskForm>,
) -> ApiResult<(StatusCode, Json<ActionResponse>)> {
    let date = query.resolve()?;
    tracing::info!(user_id = %session.user_id, "Creating task");

    let mut dialog = TaskDialog::new();
    dialog.open_create();
    dialog.edit_form(|f| *f = form);

    let dashboard = controller(&state, session, date);
    let notification = dashboard.submit_dialog(&mut dialog).await?;

    Ok((StatusCode::CREATED, Json(ActionResponse::new(notification, &dashboard))))
}

/// Replaces a task's fields
pub async fn update_task(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
    Query(query): Query<DateQuery>,
    Json(form): Json<TaskForm>,
) -> ApiResult<Json<ActionResponse>> {
    let date = query.resolve()?;
    let task = find_task(&state, &session, id).await?;
    tracing::info!(user_id = %session.user_id, task_id = %id, "Updating task");

    let mut dialog = TaskDialog::new();
    dialog.open_edit(&task);
    dialog.edit_form(|f| *f = form);

    let dashboard = controller(&state, session, date);
    let notification = dashboard.submit_dialog(&mut dialog).await?;

    Ok(Json(ActionResponse::new(notification, &dashboard)))
}

/// Creates a new task from an existing one's values
///
/// The body is optional; given fields replace the source task's values.
pub async fn duplicate_task(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
    Query(query): Query<DateQuery>,
    overrides: Option<Json<DuplicateRequest>>,
) -> ApiResult<(StatusCode, Json<ActionResponse>)> {
    let date = query.resolve()?;
    let source = find_task(&state, &session, id).await?;
    tracing::info!(user_id = %session.user_id, source_id = %id, "Duplicating task");

    let mut dialog = TaskDialog::new();
    dialog.open_duplicate(&source);
    if let Some(Json(overrides)) = overrides {
        dialog.edit_form(|f| overrides.apply(f));
    }

    let dashboard = controller(&state, session, date);
    let notification = dashboard.submit_dialog(&mut dialog).await?;

    Ok((StatusCode::CREATED, Json(ActionResponse::new(notification, &dashboard))))
}

/// Marks a task as completed; the calendar event is left alone
pub async fn complete_task(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<ActionResponse>> {
    let date = query.resolve()?;
    tracing::info!(user_id = %session.user_id, task_id = %id, "Completing task");

    let dashboard = controller(&state, session, date);
    let notification = dashboard.dispatch(TaskAction::Complete { task_id: id }).await?;

    Ok(Json(ActionResponse::new(notification, &dashboard)))
}

/// Deletes a task and its calendar event
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<ActionResponse>> {
    let date = query.resolve()?;
    let task = find_task(&state, &session, id).await?;
    tracing::info!(user_id = %session.user_id, task_id = %id, "Deleting task");

    let dashboard = controller(&state, session, date);
    let notification = dashboard
        .dispatch(TaskAction::Delete {
            task_id: id,
            event_id: task.linked_event_id().map(str::to_string),
        })
        .await?;

    Ok(Json(ActionResponse::new(notification, &dashboard)))
}
