//! Enumerations for TUI state management.

/// Application state for the terminal user interface.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AppState {
    TaskList,
    AddTask,
    ConfirmDelete,
    History,
    Help,
}

/// Fields of the register form, in tab order.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum FormField {
    Code,
    Name,
    Assignee,
}

impl FormField {
    pub fn next(self) -> Self {
        match self {
            FormField::Code => FormField::Name,
            FormField::Name => FormField::Assignee,
            FormField::Assignee => FormField::Code,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            FormField::Code => FormField::Assignee,
            FormField::Name => FormField::Code,
            FormField::Assignee => FormField::Name,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FormField::Code => "Task code",
            FormField::Name => "Task name",
            FormField::Assignee => "Assignee user code",
        }
    }
}
