//! Task dialog state machine
//!
//! ```text
//! Closed -> Open -> Submitting -> Closed
//!             |  \
//!             |   (validation fails: stays Open with errors)
//!             +-> Closed (cancel)
//! ```

use chrono_tz::Tz;
use uuid::Uuid;

use super::TaskAction;
use crate::models::Task;
use crate::validation::{FieldErrors, TaskForm};

/// What submitting the dialog will do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogMode {
    Create,
    Edit {
        task_id: Uuid,
        event_id: Option<String>,
    },
    /// Create prefilled from another task
    Duplicate { source_id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DialogState {
    #[default]
    Closed,
    Open {
        mode: DialogMode,
        form: TaskForm,
        errors: FieldErrors,
    },
    Submitting {
        mode: DialogMode,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DialogError {
    #[error("dialog is not open")]
    NotOpen,

    #[error(transparent)]
    Invalid(#[from] FieldErrors),
}

/// A validated dialog ready to dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub action: TaskAction,
    pub time_zone: Option<Tz>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskDialog {
    state: DialogState,
}

impl TaskDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DialogState {
        &self.state
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, DialogState::Closed)
    }

    pub fn open_create(&mut self) {
        self.open(DialogMode::Create, TaskForm::default());
    }

    pub fn open_edit(&mut self, task: &Task) {
        self.open(
            DialogMode::Edit {
                task_id: task.id,
                event_id: task.event_id.clone(),
            },
            TaskForm::from_task(task),
        );
    }

    /// Opens a create dialog prefilled with `task`'s values
    pub fn open_duplicate(&mut self, task: &Task) {
        self.open(
            DialogMode::Duplicate { source_id: task.id },
            TaskForm::from_task(task),
        );
    }

    fn open(&mut self, mode: DialogMode, form: TaskForm) {
        if matches!(self.state, DialogState::Submitting { .. }) {
            return;
        }
        self.state = DialogState::Open {
            mode,
            form,
            errors: FieldErrors::default(),
        };
    }

    /// Current form values, while open
    pub fn form(&self) -> Option<&TaskForm> {
        match &self.state {
            DialogState::Open { form, .. } => Some(form),
            _ => None,
        }
    }

    /// Replaces the form values, while open
    pub fn edit_form(&mut self, update: impl FnOnce(&mut TaskForm)) {
        if let DialogState::Open { form, .. } = &mut self.state {
            update(form);
        }
    }

    /// Validates and moves to `Submitting`
    ///
    /// On validation failure the dialog stays `Open` with the errors set.
    pub fn submit(&mut self) -> Result<Submission, DialogError> {
        let DialogState::Open { mode, form, errors } = &mut self.state else {
            return Err(DialogError::NotOpen);
        };

        let fields = match form.validate() {
            Ok(fields) => fields,
            Err(e) => {
                *errors = e.clone();
                return Err(DialogError::Invalid(e));
            }
        };

        let time_zone = form.time_zone();
        let mode = mode.clone();
        let action = match &mode {
            DialogMode::Create => TaskAction::Create { fields },
            DialogMode::Duplicate { .. } => TaskAction::Duplicate { fields },
            DialogMode::Edit { task_id, event_id } => TaskAction::Edit {
                task_id: *task_id,
                event_id: event_id.clone(),
                fields,
            },
        };

        self.state = DialogState::Submitting { mode };
        Ok(Submission { action, time_zone })
    }

    /// Returns to `Closed` once the dispatched action finished
    pub fn finish(&mut self) {
        self.state = DialogState::Closed;
    }

    /// Cancels an open dialog
    pub fn cancel(&mut self) {
        if matches!(self.state, DialogState::Open { .. }) {
            self.state = DialogState::Closed;
        }
    }
}
