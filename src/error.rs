//! Error types for storage and business rules.

use std::path::PathBuf;

use thiserror::Error;

use crate::fields::Status;

/// Failure while reading or writing one of the CSV files.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io { path: path.into(), source }
    }
}

/// Errors reported to the user by the task service.
///
/// Every variant except `Storage` is a rule violation the user can correct
/// and retry.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("task code {0} is already in use")]
    DuplicateCode(u32),

    #[error("no user with code {0}; enter an existing user code")]
    UnknownUser(u32),

    #[error("no task with code {0}; enter an existing task code")]
    UnknownTask(u32),

    #[error("cannot change status from {from} to {to}; only one step ahead of the current status is allowed")]
    InvalidTransition { from: Status, to: Status },

    #[error("task {0} is done and its status can no longer change")]
    TerminalState(u32),

    #[error("email address or password is incorrect")]
    InvalidCredentials,

    #[error("task {0} is not done yet and cannot be deleted")]
    NotFinished(u32),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl AppError {
    /// Whether the user can fix the input and try again.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AppError::Storage(_))
    }
}
