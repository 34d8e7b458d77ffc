//! Line-based interactive menu.
//!
//! Prompts for a login, then loops over the main menu until the user logs
//! out or input ends. Input is validated here before anything reaches the
//! task service; rule violations from the service are shown and the prompt
//! repeats. A blank answer at the first prompt of a form returns to the menu.

use std::io::{self, BufRead, Write};

use crate::cmd::{parse_code, validate_task_name};
use crate::fields::Status;
use crate::service::{render_lines, TaskService};
use crate::task::Session;

/// Outcome of one step that may be cut short by end of input.
enum Flow {
    Continue,
    Quit,
}

pub struct Menu<'a, R, W> {
    service: &'a TaskService,
    input: R,
    out: W,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    pub fn new(service: &'a TaskService, input: R, out: W) -> Self {
        Menu { service, input, out }
    }

    /// Run the whole login + menu session.
    pub fn run(&mut self) -> io::Result<()> {
        writeln!(self.out, "Welcome to taskapp!")?;
        let Some(session) = self.login()? else {
            return Ok(());
        };

        loop {
            writeln!(self.out, "Choose an option from 1-3.")?;
            writeln!(self.out, "1. List tasks, 2. Register task, 3. Log out")?;
            let Some(choice) = self.prompt("Choice: ")? else {
                return Ok(());
            };
            writeln!(self.out)?;

            let flow = match choice.trim() {
                "1" => self.list(&session)?,
                "2" => self.register(&session)?,
                "3" => {
                    writeln!(self.out, "Logged out.")?;
                    return Ok(());
                }
                _ => {
                    writeln!(self.out, "Invalid choice. Enter 1, 2 or 3.")?;
                    Flow::Continue
                }
            };
            if let Flow::Quit = flow {
                return Ok(());
            }
            writeln!(self.out)?;
        }
    }

    /// Print the prompt and read one line; `None` at end of input.
    fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.out, "{label}")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.out)?;
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn login(&mut self) -> io::Result<Option<Session>> {
        loop {
            let Some(email) = self.prompt("Email: ")? else {
                return Ok(None);
            };
            let Some(password) = self.prompt("Password: ")? else {
                return Ok(None);
            };
            match self.service.login(&email, &password) {
                Ok(session) => {
                    writeln!(self.out, "Welcome, {}.", session.user.name)?;
                    writeln!(self.out)?;
                    return Ok(Some(session));
                }
                Err(e) if e.is_recoverable() => writeln!(self.out, "{e}")?,
                Err(e) => {
                    writeln!(self.out, "Error: {e}")?;
                    return Ok(None);
                }
            }
            writeln!(self.out)?;
        }
    }

    fn list(&mut self, session: &Session) -> io::Result<Flow> {
        match self.service.list_all(session) {
            Ok(lines) => writeln!(self.out, "{}", render_lines(&lines))?,
            Err(e) => {
                writeln!(self.out, "Error: {e}")?;
                return Ok(Flow::Continue);
            }
        }
        writeln!(self.out)?;

        loop {
            writeln!(self.out, "Choose an option from 1-2.")?;
            writeln!(self.out, "1. Change task status, 2. Back to main menu")?;
            let Some(choice) = self.prompt("Choice: ")? else {
                return Ok(Flow::Quit);
            };
            match choice.trim() {
                "1" => return self.change_status(session),
                "2" => return Ok(Flow::Continue),
                _ => writeln!(self.out, "Invalid choice. Enter 1 or 2.")?,
            }
        }
    }

    fn register(&mut self, session: &Session) -> io::Result<Flow> {
        loop {
            let Some(code) = self.prompt("Task code (blank to cancel): ")? else {
                return Ok(Flow::Quit);
            };
            if code.trim().is_empty() {
                return Ok(Flow::Continue);
            }
            let Some(code) = parse_code(&code) else {
                writeln!(self.out, "Enter the code using digits 0-9.\n")?;
                continue;
            };

            let Some(name) = self.prompt("Task name: ")? else {
                return Ok(Flow::Quit);
            };
            if let Err(msg) = validate_task_name(&name) {
                writeln!(self.out, "{msg}.\n")?;
                continue;
            }

            let Some(assignee) = self.prompt("Assignee user code: ")? else {
                return Ok(Flow::Quit);
            };
            let Some(assignee) = parse_code(&assignee) else {
                writeln!(self.out, "Enter the user code using digits 0-9.\n")?;
                continue;
            };

            match self.service.register(code, &name, assignee, session) {
                Ok(task) => {
                    writeln!(self.out, "{} registered.", task.name)?;
                    return Ok(Flow::Continue);
                }
                Err(e) if e.is_recoverable() => writeln!(self.out, "{e}\n")?,
                Err(e) => {
                    writeln!(self.out, "Error: {e}")?;
                    return Ok(Flow::Continue);
                }
            }
        }
    }

    fn change_status(&mut self, session: &Session) -> io::Result<Flow> {
        loop {
            let Some(code) = self.prompt("Task code to update (blank to cancel): ")? else {
                return Ok(Flow::Quit);
            };
            if code.trim().is_empty() {
                return Ok(Flow::Continue);
            }
            let Some(code) = parse_code(&code) else {
                writeln!(self.out, "Enter the code using digits 0-9.\n")?;
                continue;
            };

            writeln!(self.out, "Choose the new status.")?;
            writeln!(self.out, "1. {}, 2. {}", Status::InProgress, Status::Done)?;
            let Some(choice) = self.prompt("Choice: ")? else {
                return Ok(Flow::Quit);
            };
            let status = match choice.trim() {
                "1" => Status::InProgress,
                "2" => Status::Done,
                _ => {
                    writeln!(self.out, "Choose status 1 or 2.\n")?;
                    continue;
                }
            };

            match self.service.change_status(code, status, session) {
                Ok(task) => {
                    writeln!(self.out, "Task {} is now {}.", task.code, task.status)?;
                    return Ok(Flow::Continue);
                }
                Err(e) if e.is_recoverable() => writeln!(self.out, "{e}\n")?,
                Err(e) => {
                    writeln!(self.out, "Error: {e}")?;
                    return Ok(Flow::Continue);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::repository::TaskRepository;
    use std::fs;
    use std::io::Cursor;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, StoreConfig) {
        let dir = tempdir().unwrap();
        let config = StoreConfig::in_dir(dir.path());
        fs::write(&config.users, "Code,Name,Email,Password\n1,Alice,a@x.com,pw\n2,Bob,b@x.com,pw2").unwrap();
        (dir, config)
    }

    fn run_script(config: &StoreConfig, script: &str) -> String {
        let service = TaskService::open(config);
        let mut out = Vec::new();
        Menu::new(&service, Cursor::new(script.as_bytes().to_vec()), &mut out)
            .run()
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_login_retries_until_valid() {
        let (_dir, config) = setup();
        let out = run_script(&config, "a@x.com\nwrong\na@x.com\npw\n3\n");
        assert!(out.contains("email address or password is incorrect"));
        assert!(out.contains("Welcome, Alice."));
        assert!(out.ends_with("Logged out.\n"));
    }

    #[test]
    fn test_register_validates_then_saves() {
        let (_dir, config) = setup();
        let script = "a@x.com\npw\n2\nabc\n100\nfar too long name\n100\nDesign\n9\n100\nDesign\n2\n3\n";
        let out = run_script(&config, script);
        assert!(out.contains("Enter the code using digits 0-9."));
        assert!(out.contains("at most 10 characters"));
        assert!(out.contains("no user with code 9"));
        assert!(out.contains("Design registered."));

        let service = TaskService::open(&config);
        let task = service.list_all(&service.login("a@x.com", "pw").unwrap()).unwrap();
        assert_eq!(task.len(), 1);
        assert_eq!(task[0].code, 100);
    }

    #[test]
    fn test_list_then_change_status() {
        let (_dir, config) = setup();
        let service = TaskService::open(&config);
        let alice = service.login("a@x.com", "pw").unwrap();
        service.register(5, "Build", 2, &alice).unwrap();

        let out = run_script(&config, "a@x.com\npw\n1\n1\n5\n2\n5\n1\n3\n");
        assert!(out.contains("Build, assigned to Bob, status: Not started"));
        assert!(out.contains("only one step ahead"));
        assert!(out.contains("Task 5 is now In progress."));

        let repo_task = crate::repository::CsvTaskRepository::new(
            &config.tasks,
            service.users().clone(),
        )
        .find_by_code(5)
        .unwrap()
        .unwrap();
        assert_eq!(repo_task.status, Status::InProgress);
    }

    #[test]
    fn test_invalid_main_choice_and_end_of_input() {
        let (_dir, config) = setup();
        let out = run_script(&config, "a@x.com\npw\n9\n");
        assert!(out.contains("Invalid choice. Enter 1, 2 or 3."));
        assert!(!out.contains("Logged out."));
    }

    #[test]
    fn test_blank_code_cancels_registration() {
        let (_dir, config) = setup();
        let out = run_script(&config, "a@x.com\npw\n2\n\n3\n");
        assert!(out.contains("Logged out."));
        assert!(!config.tasks.exists());
    }
}
