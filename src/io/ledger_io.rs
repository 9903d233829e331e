use std::fs;
use std::path::{Path, PathBuf};

use crate::io::atomic::atomic_write;
use crate::io::layout::DataLayout;
use crate::model::ledger::{Ledger, Month};
use crate::model::project::ProjectSummary;
use crate::parse::project_parser::{parse_project_summary, title_case_key};
use crate::parse::{empty_ledger, parse_ledger, serialize_ledger};

/// Error type for ledger reads, writes and task lookups
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid project key '{0}': use lowercase letters, digits and hyphens")]
    InvalidProjectKey(String),
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("project already exists: {0}")]
    ProjectExists(String),
    #[error("task already exists in {project}: {title}")]
    DuplicateTask { project: String, title: String },
    #[error("task not found in {project}: {title}")]
    TaskNotFound { project: String, title: String },
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A ledger together with where it came from
#[derive(Debug, Clone)]
pub struct LoadedLedger {
    pub month: Month,
    pub path: PathBuf,
    pub ledger: Ledger,
}

/// Read and parse one ledger file
pub fn load_ledger(path: &Path) -> Result<Ledger, LedgerError> {
    let text = fs::read_to_string(path).map_err(|e| LedgerError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let ledger = parse_ledger(&text);
    for issue in &ledger.issues {
        tracing::debug!(path = %path.display(), %issue, "ledger parse issue");
    }
    Ok(ledger)
}

/// Serialize and atomically write a ledger
pub fn save_ledger(path: &Path, ledger: &Ledger) -> Result<(), LedgerError> {
    atomic_write(path, serialize_ledger(ledger).as_bytes()).map_err(|e| LedgerError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

/// All ledgers of a project, oldest month first
pub fn load_project_ledgers(layout: &DataLayout, key: &str) -> Result<Vec<LoadedLedger>, LedgerError> {
    layout
        .ledger_months(key)
        .into_iter()
        .map(|(month, path)| {
            let ledger = load_ledger(&path)?;
            Ok(LoadedLedger {
                month,
                path,
                ledger,
            })
        })
        .collect()
}

/// Load a project's ledger for a month, or a fresh one if the file is missing
pub fn load_or_new_ledger(
    layout: &DataLayout,
    key: &str,
    month: Month,
) -> Result<LoadedLedger, LedgerError> {
    let path = layout.ledger_path(key, month);
    let ledger = if path.exists() {
        load_ledger(&path)?
    } else {
        empty_ledger(&project_display_name(layout, key), month)
    };
    Ok(LoadedLedger {
        month,
        path,
        ledger,
    })
}

/// Read PROJECT.md if present
pub fn load_project_summary(layout: &DataLayout, key: &str) -> Option<ProjectSummary> {
    let text = fs::read_to_string(layout.project_summary_path(key)).ok()?;
    Some(parse_project_summary(key, &text))
}

/// `# ` heading of PROJECT.md, else the title-cased key
pub fn project_display_name(layout: &DataLayout, key: &str) -> String {
    load_project_summary(layout, key)
        .map(|s| s.name)
        .unwrap_or_else(|| title_case_key(key))
}
