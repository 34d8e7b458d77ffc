//! Entity data structures: users, tasks and audit log entries.
//!
//! Tasks hold a resolved snapshot of their assignee taken when the task was
//! read. Log entries are immutable facts and do not follow later changes to
//! the task or user they mention.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::Status;

/// A user who can log in and be assigned tasks.
///
/// Users are seed data: nothing in this tool creates, edits or removes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub code: u32,
    pub name: String,
    pub email: String,
    /// Stored as plaintext for compatibility with existing user files.
    #[serde(skip_serializing, default)]
    pub password: String,
}

/// A unit of work with a lifecycle status and an assignee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub code: u32,
    pub name: String,
    pub status: Status,
    /// The assignee code as stored, kept even when it no longer resolves.
    pub assignee_code: u32,
    /// Assignee resolved at read time; `None` when the user is unknown.
    pub assignee: Option<User>,
}

impl Task {
    /// A freshly registered task. New tasks always start as `NotStarted`.
    pub fn new(code: u32, name: impl Into<String>, assignee: User) -> Self {
        Task {
            code,
            name: name.into(),
            status: Status::NotStarted,
            assignee_code: assignee.code,
            assignee: Some(assignee),
        }
    }

    /// Whether `user` is the assignee of this task.
    pub fn is_assigned_to(&self, user: &User) -> bool {
        self.assignee.as_ref().is_some_and(|a| a.code == user.code)
    }
}

/// Audit record of a task creation or status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub task_code: u32,
    /// Code of the user who made the change.
    pub changed_by: u32,
    /// Status after the event; `NotStarted` for creation.
    pub status: Status,
    pub date: NaiveDate,
}

/// The logged-in user for one run of the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
}

impl Session {
    pub fn new(user: User) -> Self {
        Session { user }
    }
}
