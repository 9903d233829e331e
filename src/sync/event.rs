use std::fmt;

use chrono::NaiveDate;

use crate::io::layout::{CAPTURE_FILE, DAILY_DIR, INBOX_FILE, PROJECTS_DIR};
use crate::model::ledger::Month;
use crate::ops::ledger_ops::is_valid_project_key;

/// What kind of file a write touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// `tasks.md`
    Capture,
    /// `inbox.md`
    Inbox,
    /// `daily/YYYY-MM-DD.md`
    Daily { date: NaiveDate },
    /// `projects/<key>/tasks/YYYY-MM.md`
    Ledger { project: String, month: Month },
    /// Anything else; no propagation
    Other { path: String },
}

impl ChangeEvent {
    /// Classify a path relative to the data directory
    pub fn classify(rel: &str) -> ChangeEvent {
        let normalized = rel.trim().replace('\\', "/");
        let normalized = normalized.trim_start_matches("./").trim_start_matches('/');
        let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();

        match parts.as_slice() {
            [name] if *name == CAPTURE_FILE => ChangeEvent::Capture,
            [name] if *name == INBOX_FILE => ChangeEvent::Inbox,
            [dir, file] if *dir == DAILY_DIR => match daily_date(file) {
                Some(date) => ChangeEvent::Daily { date },
                None => ChangeEvent::other(normalized),
            },
            [dir, project, "tasks", file] if *dir == PROJECTS_DIR && is_valid_project_key(project) => {
                match file.strip_suffix(".md").and_then(|m| m.parse::<Month>().ok()) {
                    Some(month) => ChangeEvent::Ledger {
                        project: project.to_string(),
                        month,
                    },
                    None => ChangeEvent::other(normalized),
                }
            }
            _ => ChangeEvent::other(normalized),
        }
    }

    fn other(path: &str) -> ChangeEvent {
        ChangeEvent::Other {
            path: path.to_string(),
        }
    }
}

fn daily_date(file: &str) -> Option<NaiveDate> {
    let stem = file.strip_suffix(".md")?;
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeEvent::Capture => write!(f, "capture"),
            ChangeEvent::Inbox => write!(f, "inbox"),
            ChangeEvent::Daily { date } => write!(f, "daily {date}"),
            ChangeEvent::Ledger { project, month } => write!(f, "ledger {project}/{month}"),
            ChangeEvent::Other { path } => write!(f, "other {path}"),
        }
    }
}
