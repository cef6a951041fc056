//! Dashboard controller tests: loading, live reloads, dispatch and dialogs

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use taskboard_shared::auth::session::Session;
use taskboard_shared::calendar::mock::{CalendarCall, MockCalendar};
use taskboard_shared::calendar::CalendarError;
use taskboard_shared::dashboard::{
    DashboardController, DashboardView, DialogError, DialogState, SubmitError, TaskAction,
    TaskDialog,
};
use taskboard_shared::models::{NewTask, TaskFields};
use taskboard_shared::store::memory::MemoryTaskStore;
use taskboard_shared::store::{ChangeKind, StoreError, TaskChange, TaskStore};
use taskboard_shared::sync::{DeletePolicy, SyncCoordinator};
use tokio::sync::watch;
use uuid::Uuid;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn fields(reminder: &str) -> TaskFields {
    TaskFields {
        title: "Read".to_string(),
        description: "Read ten pages".to_string(),
        reminder_time: reminder.parse().unwrap(),
        completed: false,
    }
}

struct Board {
    store: Arc<MemoryTaskStore>,
    calendar: Arc<MockCalendar>,
    dashboard: DashboardController,
}

fn board(session: Session) -> Board {
    let store = Arc::new(MemoryTaskStore::new());
    let calendar = Arc::new(MockCalendar::new());
    let sync = SyncCoordinator::new(store.clone(), calendar.clone(), DeletePolicy::Proceed);
    Board {
        store,
        calendar,
        dashboard: DashboardController::for_date(sync, session, day()),
    }
}

async fn wait_for(
    rx: &mut watch::Receiver<DashboardView>,
    predicate: impl Fn(&DashboardView) -> bool,
) -> DashboardView {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let view = rx.borrow_and_update().clone();
            if predicate(&view) {
                return view;
            }
            rx.changed().await.expect("view sender dropped");
        }
    })
    .await
    .expect("timed out waiting for dashboard view")
}

// =============================================================================
// Load
// =============================================================================

#[tokio::test]
async fn test_load_lists_the_selected_day_in_order() {
    let session = Session::new(Uuid::new_v4());
    let b = board(session.clone());

    for at in [
        "2024-01-01T23:59:59Z",
        "2024-01-01T00:00:00Z",
        "2024-01-02T00:00:00Z",
        "2024-01-01T12:00:00Z",
    ] {
        b.store
            .insert(NewTask {
                user_id: session.user_id,
                fields: fields(at),
                event_id: None,
            })
            .await
            .unwrap();
    }

    let tasks = b.dashboard.load().await.unwrap();
    let times: Vec<String> = tasks.iter().map(|t| t.reminder_time.to_rfc3339()).collect();
    assert_eq!(
        times,
        vec![
            "2024-01-01T00:00:00+00:00",
            "2024-01-01T12:00:00+00:00",
            "2024-01-01T23:59:59+00:00",
        ]
    );
    assert!(b.dashboard.snapshot().loaded);
}

#[tokio::test]
async fn test_failed_load_keeps_list_and_notifies() {
    let session = Session::new(Uuid::new_v4());
    let b = board(session.clone());
    b.store
        .insert(NewTask {
            user_id: session.user_id,
            fields: fields("2024-01-01T10:00:00Z"),
            event_id: None,
        })
        .await
        .unwrap();
    b.dashboard.load().await.unwrap();

    b.store
        .fail_next(StoreError::new("connection reset").with_details("retry later"));
    assert!(b.dashboard.load().await.is_err());

    let view = b.dashboard.snapshot();
    assert_eq!(view.tasks.len(), 1);
    let notifications = b.dashboard.take_notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "connection reset");
    assert_eq!(notifications[0].description.as_deref(), Some("retry later"));
    assert!(b.dashboard.take_notifications().is_empty());
}

#[tokio::test]
async fn test_select_date_switches_window() {
    let session = Session::new(Uuid::new_v4());
    let b = board(session.clone());
    b.store
        .insert(NewTask {
            user_id: session.user_id,
            fields: fields("2024-01-02T08:00:00Z"),
            event_id: None,
        })
        .await
        .unwrap();

    assert!(b.dashboard.load().await.unwrap().is_empty());
    let tasks = b
        .dashboard
        .select_date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
}

// =============================================================================
// Change subscription
// =============================================================================

#[tokio::test]
async fn test_mount_reloads_on_foreign_changes() {
    let session = Session::new(Uuid::new_v4());
    let b = board(session.clone());
    let mut rx = b.dashboard.watch();
    let subscription = b.dashboard.mount().await;
    assert!(subscription.is_active());

    // Another writer inserts a row for this user
    b.store
        .insert(NewTask {
            user_id: session.user_id,
            fields: fields("2024-01-01T09:00:00Z"),
            event_id: None,
        })
        .await
        .unwrap();

    let view = wait_for(&mut rx, |v| v.tasks.len() == 1).await;
    assert_eq!(view.tasks[0].title, "Read");

    subscription.unmount().await;
}

#[tokio::test]
async fn test_dropping_subscription_stops_reloads() {
    let session = Session::new(Uuid::new_v4());
    let b = board(session.clone());
    let subscription = b.dashboard.mount().await;
    drop(subscription);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let before = b.store.operations().len();
    b.store.notify(TaskChange {
        kind: ChangeKind::Update,
        id: Uuid::new_v4(),
        user_id: None,
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(b.store.operations().len(), before);
}

// =============================================================================
// Dispatch
// =============================================================================

#[tokio::test]
async fn test_dispatch_create_notifies_and_reloads() {
    let session = Session::new(Uuid::new_v4()).with_provider_token("ya29.token");
    let b = board(session);

    let notification = b
        .dashboard
        .dispatch(TaskAction::Create {
            fields: fields("2024-01-01T10:00:00Z"),
        })
        .await
        .unwrap();

    assert_eq!(notification.title, "Task created");
    assert_eq!(notification.description.as_deref(), Some("Task has been created"));
    let view = b.dashboard.snapshot();
    assert_eq!(view.tasks.len(), 1);
    assert_eq!(view.tasks[0].event_id.as_deref(), Some("evt-1"));
}

#[tokio::test]
async fn test_dispatch_complete_and_delete() {
    let session = Session::new(Uuid::new_v4()).with_provider_token("ya29.token");
    let b = board(session);
    b.dashboard
        .dispatch(TaskAction::Create {
            fields: fields("2024-01-01T10:00:00Z"),
        })
        .await
        .unwrap();
    let task = b.dashboard.snapshot().tasks[0].clone();

    let completed = b
        .dashboard
        .dispatch(TaskAction::Complete { task_id: task.id })
        .await
        .unwrap();
    assert_eq!(completed.description.as_deref(), Some("Task has been marked as completed"));
    assert!(b.dashboard.snapshot().tasks[0].completed);

    let deleted = b
        .dashboard
        .dispatch(TaskAction::Delete {
            task_id: task.id,
            event_id: task.event_id.clone(),
        })
        .await
        .unwrap();
    assert_eq!(deleted.title, "Task deleted");
    assert!(b.dashboard.snapshot().tasks.is_empty());
}

#[tokio::test]
async fn test_calendar_failure_becomes_error_notification() {
    let session = Session::new(Uuid::new_v4()).with_provider_token("expired");
    let b = board(session);
    b.calendar.fail_next(CalendarError::Api {
        status: 401,
        message: "Invalid Credentials".to_string(),
    });

    let failure = b
        .dashboard
        .dispatch(TaskAction::Create {
            fields: fields("2024-01-01T10:00:00Z"),
        })
        .await
        .unwrap_err();

    assert_eq!(failure.notification.title, "Error");
    assert_eq!(failure.notification.description.as_deref(), Some("Invalid Credentials"));
    assert!(b.store.all().await.is_empty());
}

#[tokio::test]
async fn test_delete_with_calendar_failure_still_removes_task() {
    let session = Session::new(Uuid::new_v4()).with_provider_token("ya29.token");
    let b = board(session);
    b.dashboard
        .dispatch(TaskAction::Create {
            fields: fields("2024-01-01T10:00:00Z"),
        })
        .await
        .unwrap();
    let task = b.dashboard.snapshot().tasks[0].clone();
    b.calendar.fail_next(CalendarError::Api {
        status: 500,
        message: "Backend Error".to_string(),
    });

    let notification = b
        .dashboard
        .dispatch(TaskAction::Delete {
            task_id: task.id,
            event_id: task.event_id,
        })
        .await
        .unwrap();

    assert_eq!(notification.title, "Task deleted");
    assert!(notification.is_error);
    assert!(notification.description.unwrap().contains("Backend Error"));
    assert!(b.dashboard.snapshot().tasks.is_empty());
}

// =============================================================================
// Dialogs
// =============================================================================

#[tokio::test]
async fn test_invalid_dialog_stays_open_without_calls() {
    let session = Session::new(Uuid::new_v4()).with_provider_token("ya29.token");
    let b = board(session);
    let mut dialog = TaskDialog::new();
    dialog.open_create();
    dialog.edit_form(|form| {
        form.title = "R".to_string();
        form.description = "Read ten pages".to_string();
        form.reminder_time = Some(Utc::now());
    });

    let err = b.dashboard.submit_dialog(&mut dialog).await.unwrap_err();

    assert!(matches!(err, SubmitError::Dialog(DialogError::Invalid(_))));
    assert!(matches!(dialog.state(), DialogState::Open { .. }));
    assert!(b.calendar.calls().is_empty());
    assert!(b.store.operations().is_empty());
}

#[tokio::test]
async fn test_failed_submit_still_closes_dialog() {
    let session = Session::new(Uuid::new_v4()).with_provider_token("ya29.token");
    let b = board(session);
    b.calendar.fail_next(CalendarError::Transport("connection refused".to_string()));

    let mut dialog = TaskDialog::new();
    dialog.open_create();
    dialog.edit_form(|form| {
        form.title = "Read".to_string();
        form.description = "Read ten pages".to_string();
        form.reminder_time = Some("2024-01-01T10:00:00Z".parse().unwrap());
    });

    let err = b.dashboard.submit_dialog(&mut dialog).await.unwrap_err();
    assert!(matches!(err, SubmitError::Action(_)));
    assert!(dialog.is_closed());
}

#[tokio::test]
async fn test_duplicate_dialog_creates_a_new_task_and_event() {
    let session = Session::new(Uuid::new_v4()).with_provider_token("ya29.token");
    let b = board(session);
    b.dashboard
        .dispatch(TaskAction::Create {
            fields: fields("2024-01-01T10:00:00Z"),
        })
        .await
        .unwrap();
    let source = b.dashboard.snapshot().tasks[0].clone();

    let mut dialog = TaskDialog::new();
    dialog.open_duplicate(&source);
    dialog.edit_form(|form| form.time_zone = Some("Europe/Berlin".to_string()));
    let notification = b.dashboard.submit_dialog(&mut dialog).await.unwrap();

    assert_eq!(notification.title, "Task created");
    assert!(dialog.is_closed());

    let tasks = b.dashboard.snapshot().tasks;
    assert_eq!(tasks.len(), 2);
    assert_ne!(tasks[0].id, tasks[1].id);
    assert_ne!(tasks[0].event_id, tasks[1].event_id);

    let CalendarCall::Create { event, .. } = &b.calendar.calls()[1] else {
        panic!("expected second create call");
    };
    assert_eq!(event.start.time_zone, "Europe/Berlin");
}

#[tokio::test]
async fn test_edit_dialog_updates_linked_event() {
    let session = Session::new(Uuid::new_v4()).with_provider_token("ya29.token");
    let b = board(session);
    b.dashboard
        .dispatch(TaskAction::Create {
            fields: fields("2024-01-01T10:00:00Z"),
        })
        .await
        .unwrap();
    let task = b.dashboard.snapshot().tasks[0].clone();

    let mut dialog = TaskDialog::new();
    dialog.open_edit(&task);
    dialog.edit_form(|form| {
        form.reminder_time = Some("2024-01-01T14:00:00Z".parse().unwrap());
        form.completed = true;
    });
    let notification = b.dashboard.submit_dialog(&mut dialog).await.unwrap();

    assert_eq!(notification.title, "Task updated");
    let updated = &b.dashboard.snapshot().tasks[0];
    assert!(updated.completed);
    assert_eq!(updated.event_id, task.event_id);
    assert!(matches!(
        &b.calendar.calls()[1],
        CalendarCall::Update { event_id, .. } if event_id == "evt-1"
    ));
}
