use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::model::ledger::Month;

pub const CAPTURE_FILE: &str = "tasks.md";
pub const INBOX_FILE: &str = "inbox.md";
pub const CONFIG_FILE: &str = "daybook.toml";
pub const PROJECT_SUMMARY_FILE: &str = "PROJECT.md";
pub const PROJECTS_DIR: &str = "projects";
pub const DAILY_DIR: &str = "daily";

/// Where every kind of file lives under the data directory
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DataLayout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn capture_path(&self) -> PathBuf {
        self.root.join(CAPTURE_FILE)
    }

    pub fn inbox_path(&self) -> PathBuf {
        self.root.join(INBOX_FILE)
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.root.join(PROJECTS_DIR)
    }

    pub fn project_dir(&self, key: &str) -> PathBuf {
        self.projects_dir().join(key)
    }

    pub fn project_summary_path(&self, key: &str) -> PathBuf {
        self.project_dir(key).join(PROJECT_SUMMARY_FILE)
    }

    pub fn tasks_dir(&self, key: &str) -> PathBuf {
        self.project_dir(key).join("tasks")
    }

    pub fn ledger_path(&self, key: &str, month: Month) -> PathBuf {
        self.tasks_dir(key).join(format!("{}.md", month))
    }

    pub fn daily_dir(&self) -> PathBuf {
        self.root.join(DAILY_DIR)
    }

    pub fn daily_path(&self, date: NaiveDate) -> PathBuf {
        self.root.join(daily_rel_path(date))
    }

    pub fn capture_archive_path(&self, month: Month) -> PathBuf {
        self.root.join(format!("tasks-archive-{}.md", month))
    }

    pub fn inbox_archive_path(&self, month: Month) -> PathBuf {
        self.root.join(format!("inbox-archive-{}.md", month))
    }

    pub fn project_exists(&self, key: &str) -> bool {
        self.project_dir(key).is_dir()
    }

    /// Keys of every project directory, sorted
    pub fn project_keys(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.projects_dir()) else {
            return Vec::new();
        };
        let mut keys: Vec<String> = entries
            .flatten()
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(|s| s.to_string()))
            .filter(|name| !name.starts_with('.'))
            .collect();
        keys.sort();
        keys
    }

    /// Ledger files of a project, oldest month first
    pub fn ledger_months(&self, key: &str) -> Vec<(Month, PathBuf)> {
        let Ok(entries) = fs::read_dir(self.tasks_dir(key)) else {
            return Vec::new();
        };
        let mut months: Vec<(Month, PathBuf)> = entries
            .flatten()
            .filter_map(|e| {
                let path = e.path();
                let stem = path.file_stem()?.to_str()?;
                if path.extension()?.to_str()? != "md" {
                    return None;
                }
                let month: Month = stem.parse().ok()?;
                Some((month, path))
            })
            .collect();
        months.sort_by_key(|(m, _)| *m);
        months
    }
}

/// `daily/YYYY-MM-DD.md`, relative to the data directory
pub fn daily_rel_path(date: NaiveDate) -> String {
    format!("{}/{}.md", DAILY_DIR, date.format("%Y-%m-%d"))
}
