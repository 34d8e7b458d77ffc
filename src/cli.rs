use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;
use crate::config::{StoreConfig, DEFAULT_DATA_DIR};

/// Console task manager backed by flat CSV files.
/// Storage defaults to ./data/{users,tasks,logs}.csv.
#[derive(Parser)]
#[command(name = "taskapp", version, about = "Task management with a status lifecycle and audit log")]
pub struct Cli {
    /// Directory holding users.csv, tasks.csv and logs.csv.
    #[arg(long, global = true, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Override the users file.
    #[arg(long, global = true)]
    pub users_file: Option<PathBuf>,

    /// Override the tasks file.
    #[arg(long, global = true)]
    pub tasks_file: Option<PathBuf>,

    /// Override the logs file.
    #[arg(long, global = true)]
    pub logs_file: Option<PathBuf>,

    /// Login email for non-interactive commands. Prompted for when omitted.
    #[arg(long, global = true)]
    pub email: Option<String>,

    /// Login password for non-interactive commands. Prompted for when omitted.
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Log debug output to stderr (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Defaults to the interactive menu.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::resolve(
            &self.data_dir,
            self.users_file.clone(),
            self.tasks_file.clone(),
            self.logs_file.clone(),
        )
    }
}
