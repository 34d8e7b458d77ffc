//! Locations of the three data files.

use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const USERS_FILE: &str = "users.csv";
pub const TASKS_FILE: &str = "tasks.csv";
pub const LOGS_FILE: &str = "logs.csv";

/// Paths of the user, task and log files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub users: PathBuf,
    pub tasks: PathBuf,
    pub logs: PathBuf,
}

impl StoreConfig {
    /// Default file names inside `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        StoreConfig {
            users: data_dir.join(USERS_FILE),
            tasks: data_dir.join(TASKS_FILE),
            logs: data_dir.join(LOGS_FILE),
        }
    }

    /// Apply per-file overrides on top of the defaults for `data_dir`.
    pub fn resolve(
        data_dir: &Path,
        users: Option<PathBuf>,
        tasks: Option<PathBuf>,
        logs: Option<PathBuf>,
    ) -> Self {
        let defaults = StoreConfig::in_dir(data_dir);
        StoreConfig {
            users: users.unwrap_or(defaults.users),
            tasks: tasks.unwrap_or(defaults.tasks),
            logs: logs.unwrap_or(defaults.logs),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::in_dir(Path::new(DEFAULT_DATA_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_only_given_files() {
        let config = StoreConfig::resolve(Path::new("d"), None, Some(PathBuf::from("/tmp/t.csv")), None);
        assert_eq!(config.users, Path::new("d").join("users.csv"));
        assert_eq!(config.tasks, PathBuf::from("/tmp/t.csv"));
        assert_eq!(config.logs, Path::new("d").join("logs.csv"));
    }

    #[test]
    fn test_default_uses_relative_data_dir() {
        assert_eq!(StoreConfig::default().tasks, Path::new("data").join("tasks.csv"));
    }
}
