//! Command implementations for the CLI interface.
//!
//! Each handler drives one `TaskService` operation, prints the outcome and
//! exits with status 1 on failure.

use std::io::{self, BufRead, Write};

use clap::{CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::config::StoreConfig;
use crate::db::RecordStore;
use crate::error::AppError;
use crate::fields::Status;
use crate::menu::Menu;
use crate::repository::{CsvLogRepository, CsvTaskRepository, CsvUserRepository, UserRepository};
use crate::service::{render_lines, TaskService};
use crate::task::{Session, User};
use crate::tui::run::run_tui;

/// Longest task name the input layer accepts, in characters.
pub const MAX_TASK_NAME_LEN: usize = 10;

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive line-based menu (the default).
    Menu,

    /// Launch the task board interface.
    Ui,

    /// List all tasks.
    List {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Register a new task.
    Add {
        /// Unique numeric task code.
        #[arg(value_parser = code_arg)]
        code: u32,
        /// Task name, at most 10 characters.
        name: String,
        /// Code of the user the task is assigned to.
        #[arg(long, value_parser = code_arg)]
        assignee: u32,
    },

    /// Move a task to its next status.
    Status {
        /// Task code.
        #[arg(value_parser = code_arg)]
        code: u32,
        /// New status: in-progress | done.
        #[arg(value_enum)]
        status: Status,
    },

    /// Delete a done task and its history.
    Delete {
        /// Task code.
        #[arg(value_parser = code_arg)]
        code: u32,
    },

    /// Show the audit history of a task.
    History {
        /// Task code.
        #[arg(value_parser = code_arg)]
        code: u32,
    },

    /// List known users.
    Users,

    /// Create the data directory and header-only files.
    Init {
        /// Also add a demo user (admin@example.com / admin) when no users exist.
        #[arg(long)]
        seed: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Accept only non-empty, ASCII-digit codes.
pub fn parse_code(input: &str) -> Option<u32> {
    let input = input.trim();
    if input.is_empty() || !input.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    input.parse().ok()
}

/// Clap value parser applying the same rule as `parse_code`.
fn code_arg(input: &str) -> Result<u32, String> {
    parse_code(input).ok_or_else(|| format!("`{input}` is not a code made of digits 0-9"))
}

/// Check a task name against the input rules.
pub fn validate_task_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Task name must not be empty".to_string());
    }
    if name.chars().count() > MAX_TASK_NAME_LEN {
        return Err(format!("Task name must be at most {MAX_TASK_NAME_LEN} characters"));
    }
    Ok(())
}

fn fail(err: &AppError) -> ! {
    eprintln!("Error: {err}");
    std::process::exit(1);
}

/// Log in with the given credentials, prompting on stdin for any that are missing.
pub fn authenticate(service: &TaskService, email: Option<String>, password: Option<String>) -> Session {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let email = email.unwrap_or_else(|| ask(&mut input, "Email: "));
    let password = password.unwrap_or_else(|| ask(&mut input, "Password: "));
    service.login(&email, &password).unwrap_or_else(|e| fail(&e))
}

fn ask(input: &mut impl BufRead, label: &str) -> String {
    print!("{label}");
    let _ = io::stdout().flush();
    let mut line = String::new();
    if let Err(e) = input.read_line(&mut line) {
        eprintln!("Failed to read input: {e}");
        std::process::exit(1);
    }
    line.trim_end_matches(['\r', '\n']).to_string()
}

/// Run the interactive menu on stdin/stdout.
pub fn cmd_menu(service: &TaskService) {
    let stdin = io::stdin();
    let mut menu = Menu::new(service, stdin.lock(), io::stdout());
    if let Err(e) = menu.run() {
        eprintln!("Menu error: {e}");
        std::process::exit(1);
    }
}

pub fn cmd_ui(service: &TaskService, session: &Session) {
    if let Err(e) = run_tui(service, session) {
        eprintln!("UI error: {e}");
        std::process::exit(1);
    }
}

/// Print every task, labelled for the logged-in user.
pub fn cmd_list(service: &TaskService, session: &Session, json: bool) {
    let lines = service.list_all(session).unwrap_or_else(|e| fail(&e));
    if json {
        match serde_json::to_string_pretty(&lines) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("Failed to encode tasks: {e}");
                std::process::exit(1);
            }
        }
    } else {
        println!("{}", render_lines(&lines));
    }
}

pub fn cmd_add(service: &TaskService, session: &Session, code: u32, name: String, assignee: u32) {
    if let Err(msg) = validate_task_name(&name) {
        eprintln!("Error: {msg}");
        std::process::exit(1);
    }
    let task = service
        .register(code, &name, assignee, session)
        .unwrap_or_else(|e| fail(&e));
    println!("{} registered.", task.name);
}

pub fn cmd_status(service: &TaskService, session: &Session, code: u32, status: Status) {
    let task = service
        .change_status(code, status, session)
        .unwrap_or_else(|e| fail(&e));
    println!("Task {} is now {}.", task.code, task.status);
}

pub fn cmd_delete(service: &TaskService, code: u32) {
    let task = service.delete(code).unwrap_or_else(|e| fail(&e));
    println!("Deleted task {} ({}).", task.code, task.name);
}

pub fn cmd_history(service: &TaskService, code: u32) {
    let entries = service.history(code).unwrap_or_else(|e| fail(&e));
    if entries.is_empty() {
        println!("No history for task {code}.");
        return;
    }
    println!("{:<12} {:<8} {}", "Date", "User", "Status");
    for entry in entries {
        println!("{:<12} {:<8} {}", entry.date, entry.changed_by, entry.status);
    }
}

pub fn cmd_users(service: &TaskService) {
    let users = service.users().find_all().unwrap_or_else(|e| fail(&AppError::from(e)));
    if users.is_empty() {
        println!("No users found.");
        return;
    }
    println!("{:<6} {:<20} {}", "Code", "Name", "Email");
    for u in users {
        println!("{:<6} {:<20} {}", u.code, u.name, u.email);
    }
}

/// Create any missing data files, optionally with a demo user.
pub fn cmd_init(config: &StoreConfig, seed: bool) {
    let users = CsvUserRepository::new(RecordStore::new(&config.users));
    let tasks = CsvTaskRepository::new(&config.tasks, users.clone());
    let logs = CsvLogRepository::new(&config.logs);

    let result = (|| -> Result<(), AppError> {
        for (path, created) in [
            (&config.users, users.store().create_if_not_exists()?),
            (&config.tasks, tasks.create_if_not_exists()?),
            (&config.logs, logs.create_if_not_exists()?),
        ] {
            if created {
                println!("Created {}", path.display());
            }
        }
        if seed && users.find_all()?.is_empty() {
            users.store().append(&demo_user())?;
            println!("Added demo user admin@example.com");
        }
        Ok(())
    })();

    if let Err(e) = result {
        fail(&e);
    }
}

fn demo_user() -> User {
    User {
        code: 1,
        name: "Admin".to_string(),
        email: "admin@example.com".to_string(),
        password: "admin".to_string(),
    }
}

/// Print a shell completion script to stdout.
pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_code_accepts_digits_only() {
        assert_eq!(parse_code("42"), Some(42));
        assert_eq!(parse_code(" 7 "), Some(7));
        assert_eq!(parse_code(""), None);
        assert_eq!(parse_code("-1"), None);
        assert_eq!(parse_code("1a"), None);
        assert_eq!(parse_code("１"), None);
        assert_eq!(parse_code("99999999999"), None);
    }

    #[test]
    fn test_validate_task_name_counts_chars() {
        assert!(validate_task_name("Design").is_ok());
        assert!(validate_task_name("ちょうど十文字のタスク名").is_err());
        assert!(validate_task_name("十文字のタスク名です").is_ok());
        assert!(validate_task_name("   ").is_err());
        assert!(validate_task_name("eleven char").is_err());
    }

    #[test]
    fn test_init_creates_files_and_seeds_once() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::in_dir(&dir.path().join("data"));
        cmd_init(&config, true);
        cmd_init(&config, true);

        assert_eq!(std::fs::read_to_string(&config.tasks).unwrap(), "Code,Name,Status,Rep_User_Code");
        let service = TaskService::open(&config);
        assert_eq!(service.users().find_all().unwrap(), vec![demo_user()]);
        assert!(service.login("admin@example.com", "admin").is_ok());
    }
}
