//! Enumerations and field types for task management.
//!
//! This module defines the task lifecycle status and the rules for moving a
//! task from one status to the next.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task lifecycle status.
///
/// Stored on disk as its integer code. A task only ever moves forward one
/// step at a time and never leaves `Done`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    NotStarted,
    InProgress,
    Done,
}

impl Status {
    /// All statuses in lifecycle order.
    pub const ALL: [Status; 3] = [Status::NotStarted, Status::InProgress, Status::Done];

    /// Integer code used in the CSV files.
    pub fn code(self) -> u8 {
        match self {
            Status::NotStarted => 0,
            Status::InProgress => 1,
            Status::Done => 2,
        }
    }

    /// Parse the integer code used in the CSV files.
    pub fn from_code(code: u8) -> Option<Status> {
        match code {
            0 => Some(Status::NotStarted),
            1 => Some(Status::InProgress),
            2 => Some(Status::Done),
            _ => None,
        }
    }

    /// The only status this one may move to, if any.
    pub fn next(self) -> Option<Status> {
        match self {
            Status::NotStarted => Some(Status::InProgress),
            Status::InProgress => Some(Status::Done),
            Status::Done => None,
        }
    }

    /// Whether `target` is exactly one step ahead of `self`.
    pub fn can_advance_to(self, target: Status) -> bool {
        self.next() == Some(target)
    }

    pub fn is_terminal(self) -> bool {
        self == Status::Done
    }

    /// Human-readable label for listings.
    pub fn label(self) -> &'static str {
        match self {
            Status::NotStarted => "Not started",
            Status::InProgress => "In progress",
            Status::Done => "Done",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
