/// Database models for the task board
///
/// # Models
///
/// - `task`: Tasks, their editable fields, and the UTC day window used to
///   list them
///
/// Queries against these models live in [`crate::store`].

pub mod task;

pub use task::{DayWindow, NewTask, Task, TaskChanges, TaskFields};
