//! Task service: login, listing, registration and the status state machine.
//!
//! Every mutation is paired with exactly one audit log entry. The two writes
//! are not atomic: if the log append fails after the task write succeeded,
//! the task change stays and the error is reported.

use std::fmt;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::db::RecordStore;
use crate::error::AppError;
use crate::fields::Status;
use crate::repository::{
    CsvLogRepository, CsvTaskRepository, CsvUserRepository, LogRepository, TaskRepository,
    UserRepository,
};
use crate::task::{LogEntry, Session, Task, User};

/// Who a listed task is assigned to, relative to the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum AssigneeLabel {
    You,
    Other(String),
    Unknown,
}

impl fmt::Display for AssigneeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssigneeLabel::You => f.write_str("assigned to you"),
            AssigneeLabel::Other(name) => write!(f, "assigned to {name}"),
            AssigneeLabel::Unknown => f.write_str("assigned to an unknown user"),
        }
    }
}

/// One row of the task listing as seen by the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskLine {
    pub code: u32,
    pub name: String,
    pub status: Status,
    pub assignee: AssigneeLabel,
}

impl TaskLine {
    pub fn for_viewer(task: &Task, viewer: &User) -> Self {
        let assignee = match &task.assignee {
            _ if task.is_assigned_to(viewer) => AssigneeLabel::You,
            Some(user) => AssigneeLabel::Other(user.name.clone()),
            None => AssigneeLabel::Unknown,
        };
        TaskLine {
            code: task.code,
            name: task.name.clone(),
            status: task.status,
            assignee,
        }
    }
}

impl fmt::Display for TaskLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>5}  {}, {}, status: {}",
            self.code, self.name, self.assignee, self.status
        )
    }
}

/// Business rules over the task, log and user repositories.
pub struct TaskService<T = CsvTaskRepository, L = CsvLogRepository, U = CsvUserRepository> {
    tasks: T,
    logs: L,
    users: U,
    clock: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl TaskService {
    /// CSV-backed service over the files named in `config`.
    pub fn open(config: &StoreConfig) -> Self {
        let users = CsvUserRepository::new(RecordStore::new(&config.users));
        let tasks = CsvTaskRepository::new(&config.tasks, users.clone());
        let logs = CsvLogRepository::new(&config.logs);
        TaskService::new(tasks, logs, users)
    }
}

impl<T: TaskRepository, L: LogRepository, U: UserRepository> TaskService<T, L, U> {
    pub fn new(tasks: T, logs: L, users: U) -> Self {
        TaskService { tasks, logs, users, clock: local_today }
    }

    /// Replace the source of "today" used for log dates.
    pub fn with_clock(mut self, clock: fn() -> NaiveDate) -> Self {
        self.clock = clock;
        self
    }

    pub fn users(&self) -> &U {
        &self.users
    }

    /// Start a session for the user with these credentials.
    pub fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
        match self.users.find_by_credentials(email, password)? {
            Some(user) => {
                info!(user = user.code, "logged in");
                Ok(Session::new(user))
            }
            None => {
                warn!(email, "login rejected");
                Err(AppError::InvalidCredentials)
            }
        }
    }

    /// Every task, labelled for the session user.
    pub fn list_all(&self, session: &Session) -> Result<Vec<TaskLine>, AppError> {
        Ok(self
            .tasks
            .find_all()?
            .iter()
            .map(|t| TaskLine::for_viewer(t, &session.user))
            .collect())
    }

    /// Register a new task assigned to `assignee_code`.
    ///
    /// The task always starts as `NotStarted`. Nothing is written when the
    /// code is taken or the assignee does not exist.
    pub fn register(
        &self,
        code: u32,
        name: &str,
        assignee_code: u32,
        session: &Session,
    ) -> Result<Task, AppError> {
        if self.tasks.find_by_code(code)?.is_some() {
            return Err(AppError::DuplicateCode(code));
        }
        let assignee = self
            .users
            .find_by_code(assignee_code)?
            .ok_or(AppError::UnknownUser(assignee_code))?;

        let task = Task::new(code, name, assignee);
        self.tasks.save(&task)?;
        self.record(code, task.status, session)?;
        info!(task = code, assignee = assignee_code, by = session.user.code, "task registered");
        Ok(task)
    }

    /// Move a task exactly one step forward in its lifecycle.
    pub fn change_status(
        &self,
        code: u32,
        new_status: Status,
        session: &Session,
    ) -> Result<Task, AppError> {
        let mut task = self
            .tasks
            .find_by_code(code)?
            .ok_or(AppError::UnknownTask(code))?;

        if task.status.is_terminal() {
            return Err(AppError::TerminalState(code));
        }
        if !task.status.can_advance_to(new_status) {
            return Err(AppError::InvalidTransition { from: task.status, to: new_status });
        }

        let from = task.status;
        task.status = new_status;
        if !self.tasks.update(&task)? {
            // Removed between the lookup and the rewrite.
            return Err(AppError::UnknownTask(code));
        }
        self.record(code, new_status, session)?;
        info!(task = code, from = from.code(), to = new_status.code(), by = session.user.code, "status changed");
        Ok(task)
    }

    /// Delete a finished task together with its audit history.
    pub fn delete(&self, code: u32) -> Result<Task, AppError> {
        let task = self
            .tasks
            .find_by_code(code)?
            .ok_or(AppError::UnknownTask(code))?;
        if !task.status.is_terminal() {
            return Err(AppError::NotFinished(code));
        }
        self.tasks.delete(code)?;
        let removed = self.logs.delete_by_task_code(code)?;
        info!(task = code, logs = removed, "task deleted");
        Ok(task)
    }

    /// Audit entries for one task, oldest first.
    pub fn history(&self, code: u32) -> Result<Vec<LogEntry>, AppError> {
        let entries = self.logs.find_by_task_code(code)?;
        if entries.is_empty() && self.tasks.find_by_code(code)?.is_none() {
            return Err(AppError::UnknownTask(code));
        }
        Ok(entries)
    }

    fn record(&self, task_code: u32, status: Status, session: &Session) -> Result<(), AppError> {
        let entry = LogEntry {
            task_code,
            changed_by: session.user.code,
            status,
            date: (self.clock)(),
        };
        self.logs.save(&entry)?;
        Ok(())
    }
}

/// Render a listing as text, one task per line.
pub fn render_lines(lines: &[TaskLine]) -> String {
    if lines.is_empty() {
        return "No tasks registered.".to_string();
    }
    lines.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    fn fixed_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    struct Fixture {
        dir: TempDir,
        config: StoreConfig,
        service: TaskService,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let config = StoreConfig::in_dir(dir.path());
            fs::write(
                &config.users,
                "Code,Name,Email,Password\n1,Alice,a@x.com,pw\n2,Bob,b@x.com,pw2",
            )
            .unwrap();
            let service = TaskService::open(&config).with_clock(fixed_day);
            Fixture { dir, config, service }
        }

        fn session(&self, code: u32) -> Session {
            Session::new(self.service.users().find_by_code(code).unwrap().unwrap())
        }

        fn log_lines(&self) -> Vec<String> {
            read_rows(&self.config.logs)
        }

        fn task_rows(&self) -> Vec<String> {
            read_rows(&self.config.tasks)
        }
    }

    fn read_rows(path: &Path) -> Vec<String> {
        match fs::read_to_string(path) {
            Ok(raw) => raw.lines().skip(1).filter(|l| !l.is_empty()).map(String::from).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn test_login_matches_email_and_password() {
        let fx = Fixture::new();
        let session = fx.service.login("a@x.com", "pw").unwrap();
        assert_eq!(session.user.name, "Alice");
        assert!(matches!(fx.service.login("a@x.com", "pw2"), Err(AppError::InvalidCredentials)));
        assert!(matches!(fx.service.login("nobody@x.com", "pw"), Err(AppError::InvalidCredentials)));
    }

    #[test]
    fn test_register_scenario_creates_task_and_log() {
        let fx = Fixture::new();
        let alice = fx.session(1);
        let task = fx.service.register(100, "Design", 1, &alice).unwrap();
        assert_eq!(task.status, Status::NotStarted);

        let stored = fx.service.tasks.find_by_code(100).unwrap().unwrap();
        assert_eq!(stored.status, Status::NotStarted);
        assert_eq!(stored.assignee.unwrap().name, "Alice");
        assert_eq!(fx.log_lines(), vec!["100,1,0,2024-05-01"]);
        assert!(fx.dir.path().join("tasks.csv").exists());
    }

    #[test]
    fn test_register_duplicate_code_writes_nothing() {
        let fx = Fixture::new();
        let alice = fx.session(1);
        fx.service.register(100, "Design", 1, &alice).unwrap();
        let tasks_before = fx.task_rows();
        let logs_before = fx.log_lines();

        let err = fx.service.register(100, "Other", 2, &alice).unwrap_err();
        assert!(matches!(err, AppError::DuplicateCode(100)));
        assert_eq!(fx.task_rows(), tasks_before);
        assert_eq!(fx.log_lines(), logs_before);
    }

    #[test]
    fn test_register_unknown_user_writes_nothing() {
        let fx = Fixture::new();
        let err = fx.service.register(5, "Ghost", 99, &fx.session(1)).unwrap_err();
        assert!(matches!(err, AppError::UnknownUser(99)));
        assert!(fx.task_rows().is_empty());
        assert!(fx.log_lines().is_empty());
    }

    #[test]
    fn test_status_walks_forward_one_step_at_a_time() {
        let fx = Fixture::new();
        let bob = fx.session(2);
        fx.service.register(100, "Design", 1, &fx.session(1)).unwrap();

        let err = fx.service.change_status(100, Status::Done, &bob).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidTransition { from: Status::NotStarted, to: Status::Done }
        ));
        let err = fx.service.change_status(100, Status::NotStarted, &bob).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
        assert_eq!(fx.log_lines().len(), 1);

        let task = fx.service.change_status(100, Status::InProgress, &bob).unwrap();
        assert_eq!(task.status, Status::InProgress);
        let task = fx.service.change_status(100, Status::Done, &bob).unwrap();
        assert_eq!(task.status, Status::Done);

        assert_eq!(
            fx.log_lines(),
            vec!["100,1,0,2024-05-01", "100,2,1,2024-05-01", "100,2,2,2024-05-01"]
        );
    }

    #[test]
    fn test_done_task_rejects_every_status() {
        let fx = Fixture::new();
        let alice = fx.session(1);
        fx.service.register(100, "Design", 1, &alice).unwrap();
        fx.service.change_status(100, Status::InProgress, &alice).unwrap();
        fx.service.change_status(100, Status::Done, &alice).unwrap();
        let logs_before = fx.log_lines();

        for status in Status::ALL {
            let err = fx.service.change_status(100, status, &alice).unwrap_err();
            assert!(matches!(err, AppError::TerminalState(100)));
        }
        assert_eq!(fx.log_lines(), logs_before);
        assert_eq!(fx.service.tasks.find_by_code(100).unwrap().unwrap().status, Status::Done);
    }

    #[test]
    fn test_change_status_unknown_task() {
        let fx = Fixture::new();
        let err = fx.service.change_status(1, Status::InProgress, &fx.session(1)).unwrap_err();
        assert!(matches!(err, AppError::UnknownTask(1)));
    }

    #[test]
    fn test_list_labels_assignee_relative_to_viewer() {
        let fx = Fixture::new();
        let alice = fx.session(1);
        fx.service.register(1, "Mine", 1, &alice).unwrap();
        fx.service.register(2, "Bobs", 2, &alice).unwrap();
        let mut raw = fs::read_to_string(&fx.config.tasks).unwrap();
        raw.push_str("\n3,Lost,0,77");
        fs::write(&fx.config.tasks, raw).unwrap();

        let lines = fx.service.list_all(&alice).unwrap();
        let labels: Vec<AssigneeLabel> = lines.iter().map(|l| l.assignee.clone()).collect();
        assert_eq!(
            labels,
            vec![AssigneeLabel::You, AssigneeLabel::Other("Bob".into()), AssigneeLabel::Unknown]
        );
        let text = render_lines(&lines);
        assert!(text.contains("Mine, assigned to you, status: Not started"));
        assert!(text.contains("Bobs, assigned to Bob"));
        assert!(text.contains("Lost, assigned to an unknown user"));
    }

    #[test]
    fn test_delete_requires_done_and_removes_history() {
        let fx = Fixture::new();
        let alice = fx.session(1);
        fx.service.register(1, "Keep", 1, &alice).unwrap();
        fx.service.register(2, "Drop", 1, &alice).unwrap();

        assert!(matches!(fx.service.delete(2), Err(AppError::NotFinished(2))));
        fx.service.change_status(2, Status::InProgress, &alice).unwrap();
        fx.service.change_status(2, Status::Done, &alice).unwrap();

        let deleted = fx.service.delete(2).unwrap();
        assert_eq!(deleted.name, "Drop");
        assert_eq!(fx.task_rows(), vec!["1,Keep,0,1"]);
        assert_eq!(fx.log_lines(), vec!["1,1,0,2024-05-01"]);
        assert!(matches!(fx.service.delete(2), Err(AppError::UnknownTask(2))));
    }

    #[test]
    fn test_history_lists_entries_in_order() {
        let fx = Fixture::new();
        let alice = fx.session(1);
        fx.service.register(3, "Hist", 2, &alice).unwrap();
        fx.service.change_status(3, Status::InProgress, &fx.session(2)).unwrap();

        let history = fx.service.history(3).unwrap();
        let steps: Vec<(u32, Status)> = history.iter().map(|e| (e.changed_by, e.status)).collect();
        assert_eq!(steps, vec![(1, Status::NotStarted), (2, Status::InProgress)]);
        assert!(matches!(fx.service.history(4), Err(AppError::UnknownTask(4))));
    }

    #[test]
    fn test_render_empty_listing() {
        assert_eq!(render_lines(&[]), "No tasks registered.");
    }
}
