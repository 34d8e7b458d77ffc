//! # taskapp - console task manager
//!
//! Users log in, list tasks, register tasks and move them through a fixed
//! lifecycle: Not started → In progress → Done. Each step is exactly one
//! status forward, and a done task never changes again. Every registration
//! and status change appends one row to an audit log.
//!
//! ## Storage
//!
//! Three comma-delimited files, each with a header row:
//!
//! - `users.csv`: `code,name,email,password` (seed data, read-only here)
//! - `tasks.csv`: `code,name,status,assigneeCode` (status is 0, 1 or 2)
//! - `logs.csv`: `taskCode,changedBy,status,date` (date as `YYYY-MM-DD`)
//!
//! Files are read in full on every lookup and rewritten in full on update.
//! There is no locking, so do not run two instances against the same files.
//!
//! ## Commands
//!
//! - `taskapp` / `taskapp menu` - interactive line menu
//! - `taskapp ui` - full-screen task board
//! - `taskapp list`, `add`, `status`, `delete`, `history`, `users`
//! - `taskapp init --seed` - create empty data files with a demo user
//!
//! Set `RUST_LOG=debug` (or pass `-v`) to see storage and service logs on stderr.

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod cmd;
pub mod config;
pub mod db;
pub mod error;
pub mod fields;
pub mod menu;
pub mod repository;
pub mod service;
pub mod task;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod input;
    pub mod run;
    pub mod utils;
}

use cli::Cli;
use cmd::*;
use service::TaskService;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.store_config();
    tracing::debug!(?config, "resolved data files");

    // Commands that need no service or login.
    match &cli.command {
        Some(Commands::Init { seed }) => {
            cmd_init(&config, *seed);
            return;
        }
        Some(Commands::Completions { shell }) => {
            cmd_completions(*shell);
            return;
        }
        _ => {}
    }

    let service = TaskService::open(&config);

    match cli.command {
        None | Some(Commands::Menu) => cmd_menu(&service),
        Some(Commands::Users) => cmd_users(&service),
        Some(Commands::History { code }) => cmd_history(&service, code),
        Some(command) => {
            let session = authenticate(&service, cli.email, cli.password);
            match command {
                Commands::Ui => cmd_ui(&service, &session),
                Commands::List { json } => cmd_list(&service, &session, json),
                Commands::Add { code, name, assignee } => cmd_add(&service, &session, code, name, assignee),
                Commands::Status { code, status } => cmd_status(&service, &session, code, status),
                // Deletion is limited to logged-in users even though it records no actor.
                Commands::Delete { code } => cmd_delete(&service, code),
                Commands::Menu
                | Commands::Users
                | Commands::History { .. }
                | Commands::Init { .. }
                | Commands::Completions { .. } => unreachable!("handled above"),
            }
        }
    }
}
