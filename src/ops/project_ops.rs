use std::path::PathBuf;

use chrono::NaiveDate;

use crate::io::atomic::atomic_write;
use crate::io::layout::DataLayout;
use crate::io::ledger_io::LedgerError;
use crate::model::ledger::Month;
use crate::model::project::TargetDate;
use crate::ops::ledger_ops::{ensure_ledger, validate_project_key};
use crate::parse::project_parser::{render_project_summary, title_case_key};

/// Input for a new project
#[derive(Debug, Clone)]
pub struct NewProject {
    pub key: String,
    pub name: Option<String>,
    pub goal: Option<String>,
    pub target: TargetDate,
}

#[derive(Debug, Clone)]
pub struct CreatedProject {
    pub key: String,
    pub summary_path: PathBuf,
    pub ledger_path: PathBuf,
}

/// Create `projects/<key>/` with a PROJECT.md and an empty ledger for `today`'s month
pub fn create_project(
    layout: &DataLayout,
    project: &NewProject,
    today: NaiveDate,
) -> Result<CreatedProject, LedgerError> {
    validate_project_key(&project.key)?;
    if layout.project_dir(&project.key).exists() {
        return Err(LedgerError::ProjectExists(project.key.clone()));
    }

    let name = project
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(|n| n.to_string())
        .unwrap_or_else(|| title_case_key(&project.key));
    let summary_path = layout.project_summary_path(&project.key);
    let text = render_project_summary(&name, project.goal.as_deref(), &project.target);
    atomic_write(&summary_path, text.as_bytes()).map_err(|e| LedgerError::Write {
        path: summary_path.clone(),
        source: e,
    })?;

    let ledger_path = ensure_ledger(layout, &project.key, Month::of(today))?;
    tracing::info!(key = %project.key, name = %name, "project created");
    Ok(CreatedProject {
        key: project.key.clone(),
        summary_path,
        ledger_path,
    })
}

/// Parse a `targetDate` argument: a date or `ongoing` (the default)
pub fn parse_target_date(value: Option<&str>) -> Option<TargetDate> {
    match value.map(str::trim) {
        None | Some("") => Some(TargetDate::Ongoing),
        Some(v) if v.eq_ignore_ascii_case("ongoing") => Some(TargetDate::Ongoing),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .ok()
            .map(TargetDate::Date),
    }
}
