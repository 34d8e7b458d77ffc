//! Repositories for users, tasks and audit logs.
//!
//! The traits are what the task service depends on. The `Csv*` types back
//! them with a `RecordStore` per file. Lookups are linear scans over a fresh
//! read of the file.

use chrono::NaiveDate;
use tracing::debug;

use crate::db::{parse_field, Record, RecordStore, RowEdit};
use crate::error::StoreError;
use crate::fields::Status;
use crate::task::{LogEntry, Task, User};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Read access to users.
pub trait UserRepository {
    fn find_all(&self) -> Result<Vec<User>, StoreError>;

    fn find_by_code(&self, code: u32) -> Result<Option<User>, StoreError> {
        Ok(self.find_all()?.into_iter().find(|u| u.code == code))
    }

    /// Exact, case-sensitive match on both email and password.
    fn find_by_credentials(&self, email: &str, password: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .find_all()?
            .into_iter()
            .find(|u| u.email == email && u.password == password))
    }
}

/// Storage for tasks. Callers enforce uniqueness before `save`.
pub trait TaskRepository {
    fn find_all(&self) -> Result<Vec<Task>, StoreError>;

    fn find_by_code(&self, code: u32) -> Result<Option<Task>, StoreError> {
        Ok(self.find_all()?.into_iter().find(|t| t.code == code))
    }

    fn save(&self, task: &Task) -> Result<(), StoreError>;

    /// Replace the stored task with the same code. Returns `false` if none matched.
    fn update(&self, task: &Task) -> Result<bool, StoreError>;

    /// Remove the task with `code`. Returns `false` if none matched.
    fn delete(&self, code: u32) -> Result<bool, StoreError>;
}

/// Append-only audit log storage.
pub trait LogRepository {
    fn save(&self, entry: &LogEntry) -> Result<(), StoreError>;

    fn find_by_task_code(&self, task_code: u32) -> Result<Vec<LogEntry>, StoreError>;

    /// Remove every entry for `task_code`, returning how many were removed.
    fn delete_by_task_code(&self, task_code: u32) -> Result<usize, StoreError>;
}

impl Record for User {
    const ARITY: usize = 4;
    const HEADER: &'static str = "Code,Name,Email,Password";

    fn from_fields(fields: &[String]) -> Option<Self> {
        let [code, name, email, password] = fields else {
            return None;
        };
        Some(User {
            code: parse_field(code)?,
            name: name.clone(),
            email: email.clone(),
            password: password.clone(),
        })
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.code.to_string(),
            self.name.clone(),
            self.email.clone(),
            self.password.clone(),
        ]
    }
}

/// A task as stored: the assignee is only a code.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TaskRow {
    code: u32,
    name: String,
    status: Status,
    assignee_code: u32,
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        TaskRow {
            code: task.code,
            name: task.name.clone(),
            status: task.status,
            assignee_code: task.assignee_code,
        }
    }
}

impl Record for TaskRow {
    const ARITY: usize = 4;
    const HEADER: &'static str = "Code,Name,Status,Rep_User_Code";

    fn from_fields(fields: &[String]) -> Option<Self> {
        let [code, name, status, assignee_code] = fields else {
            return None;
        };
        Some(TaskRow {
            code: parse_field(code)?,
            name: name.clone(),
            status: Status::from_code(parse_field(status)?)?,
            assignee_code: parse_field(assignee_code)?,
        })
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.code.to_string(),
            self.name.clone(),
            self.status.code().to_string(),
            self.assignee_code.to_string(),
        ]
    }
}

impl Record for LogEntry {
    const ARITY: usize = 4;
    const HEADER: &'static str = "Task_Code,Change_User_Code,Status,Change_Date";

    fn from_fields(fields: &[String]) -> Option<Self> {
        let [task_code, changed_by, status, date] = fields else {
            return None;
        };
        Some(LogEntry {
            task_code: parse_field(task_code)?,
            changed_by: parse_field(changed_by)?,
            status: Status::from_code(parse_field(status)?)?,
            date: NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).ok()?,
        })
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.task_code.to_string(),
            self.changed_by.to_string(),
            self.status.code().to_string(),
            self.date.format(DATE_FORMAT).to_string(),
        ]
    }
}

/// Users backed by `users.csv`.
#[derive(Debug, Clone)]
pub struct CsvUserRepository {
    store: RecordStore<User>,
}

impl CsvUserRepository {
    pub fn new(store: RecordStore<User>) -> Self {
        CsvUserRepository { store }
    }

    pub fn store(&self) -> &RecordStore<User> {
        &self.store
    }
}

impl UserRepository for CsvUserRepository {
    fn find_all(&self) -> Result<Vec<User>, StoreError> {
        self.store.read_all()
    }
}

/// Tasks backed by `tasks.csv`, resolving assignees through a user repository.
#[derive(Debug, Clone)]
pub struct CsvTaskRepository<U = CsvUserRepository> {
    store: RecordStore<TaskRow>,
    users: U,
}

impl<U: UserRepository> CsvTaskRepository<U> {
    pub fn new(path: impl Into<std::path::PathBuf>, users: U) -> Self {
        CsvTaskRepository { store: RecordStore::new(path), users }
    }

    /// Create the header-only task file if missing.
    pub fn create_if_not_exists(&self) -> Result<bool, StoreError> {
        self.store.create_if_not_exists()
    }

    fn resolve(&self, row: TaskRow) -> Result<Task, StoreError> {
        let assignee = self.users.find_by_code(row.assignee_code)?;
        if assignee.is_none() {
            debug!(task = row.code, assignee = row.assignee_code, "assignee not found");
        }
        Ok(Task {
            code: row.code,
            name: row.name,
            status: row.status,
            assignee_code: row.assignee_code,
            assignee,
        })
    }
}

impl<U: UserRepository> TaskRepository for CsvTaskRepository<U> {
    fn find_all(&self) -> Result<Vec<Task>, StoreError> {
        self.store
            .read_all()?
            .into_iter()
            .map(|row| self.resolve(row))
            .collect()
    }

    fn save(&self, task: &Task) -> Result<(), StoreError> {
        self.store.append(&TaskRow::from(task))
    }

    fn update(&self, task: &Task) -> Result<bool, StoreError> {
        let mut replaced = false;
        let changed = self.store.edit_rows(|row| {
            if replaced || row.code != task.code {
                return RowEdit::Keep;
            }
            replaced = true;
            RowEdit::Replace(TaskRow::from(task))
        })?;
        Ok(changed > 0)
    }

    fn delete(&self, code: u32) -> Result<bool, StoreError> {
        let removed = self
            .store
            .edit_rows(|row| if row.code == code { RowEdit::Remove } else { RowEdit::Keep })?;
        Ok(removed > 0)
    }
}

/// Audit log backed by `logs.csv`.
#[derive(Debug, Clone)]
pub struct CsvLogRepository {
    store: RecordStore<LogEntry>,
}

impl CsvLogRepository {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        CsvLogRepository { store: RecordStore::new(path) }
    }

    pub fn create_if_not_exists(&self) -> Result<bool, StoreError> {
        self.store.create_if_not_exists()
    }
}

impl LogRepository for CsvLogRepository {
    fn save(&self, entry: &LogEntry) -> Result<(), StoreError> {
        self.store.append(entry)
    }

    fn find_by_task_code(&self, task_code: u32) -> Result<Vec<LogEntry>, StoreError> {
        Ok(self
            .store
            .read_all()?
            .into_iter()
            .filter(|e| e.task_code == task_code)
            .collect())
    }

    fn delete_by_task_code(&self, task_code: u32) -> Result<usize, StoreError> {
        self.store
            .edit_rows(|e| if e.task_code == task_code { RowEdit::Remove } else { RowEdit::Keep })
    }
}
