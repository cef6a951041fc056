/// Live day list (SSE)
///
/// Mounts a dashboard for the caller and re-sends the selected day's list
/// every time any task changes. Closing the connection drops the
/// subscription and stops the reload loop; server shutdown ends the stream.
///
/// # Endpoint
///
/// `GET /v1/tasks/stream?date=YYYY-MM-DD`
///
/// # SSE Event Format
///
/// ```text
/// event: tasks
/// data: {"date":"2024-01-01","tasks":[...],"notifications":[]}
/// ```
///
/// A failed reload keeps the previous list and carries the failure in
/// `notifications`.
///
/// # Example
///
/// ```bash
/// curl -N -H "Authorization: Bearer <token>" \
///   "http://localhost:8080/v1/tasks/stream?date=2024-01-01"
/// ```

use crate::app::AppState;
use crate::error::ApiResult;
use crate::routes::tasks::{DateQuery, TaskResponse};
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use chrono::NaiveDate;
use futures::future;
use futures::stream::{Stream, StreamExt as _};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use taskboard_shared::auth::session::Session;
use taskboard_shared::dashboard::{DashboardController, Notification, Subscription};
use taskboard_shared::models::Task;
use tokio_stream::wrappers::WatchStream;

/// Payload of every `tasks` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayListEvent {
    pub date: NaiveDate,
    pub tasks: Vec<TaskResponse>,
    pub notifications: Vec<Notification>,
}

pub async fn stream_tasks(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let date = query.resolve()?;
    tracing::info!(user_id = %session.user_id, date = %date, "Streaming tasks");

    let dashboard = DashboardController::for_date(state.sync.clone(), session, date);
    let subscription = dashboard.mount().await;
    let views = WatchStream::new(dashboard.watch());
    let mut live = LiveDay {
        dashboard,
        _subscription: subscription,
        sent: None,
    };

    let stream = views
        .filter_map(move |_| future::ready(live.next_event().map(Ok::<_, Infallible>)))
        .take_until(state.shutdown.clone().cancelled_owned());

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(25))))
}

/// A mounted dashboard owned by one open stream
struct LiveDay {
    dashboard: DashboardController,
    // Dropped with the stream, which ends the reload loop
    _subscription: Subscription,
    sent: Option<(NaiveDate, Vec<Task>)>,
}

impl LiveDay {
    /// Builds the next event from the current view, or `None` when nothing
    /// new would be sent
    ///
    /// Notifications are taken before reading the view so each goes out
    /// exactly once, including ones queued after the wakeup.
    fn next_event(&mut self) -> Option<Event> {
        let notifications = self.dashboard.take_notifications();
        let view = self.dashboard.snapshot();
        let day = (view.date, view.tasks);

        if notifications.is_empty() && self.sent.as_ref() == Some(&day) {
            return None;
        }

        let event = DayListEvent {
            date: day.0,
            tasks: day.1.iter().cloned().map(TaskResponse::from).collect(),
            notifications,
        };
        self.sent = Some(day);
        Some(to_event(event))
    }
}

fn to_event(payload: DayListEvent) -> Event {
    Event::default()
        .event("tasks")
        .json_data(payload)
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to serialize day list");
            Event::default().event("error").data("serialization failed")
        })
}
