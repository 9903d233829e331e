use std::path::PathBuf;

use chrono::NaiveDate;

use crate::io::layout::DataLayout;
use crate::io::ledger_io::{
    LedgerError, load_or_new_ledger, load_project_ledgers, save_ledger,
};
use crate::model::ledger::{Ledger, Month, SectionKind};
use crate::model::task::{Status, Task};

/// Placeholder body of a new task block
pub const NOTES_PLACEHOLDER: &str = "**Notes:**";

// ---------------------------------------------------------------------------
// Project keys
// ---------------------------------------------------------------------------

/// `^[a-z0-9-]+$`
pub fn is_valid_project_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

pub fn validate_project_key(key: &str) -> Result<(), LedgerError> {
    if is_valid_project_key(key) {
        Ok(())
    } else {
        Err(LedgerError::InvalidProjectKey(key.to_string()))
    }
}

/// Turn a typed project name into a key (`Launch Site` -> `launch-site`)
pub fn normalize_project_key(raw: &str) -> Option<String> {
    let key = slug::slugify(raw.trim());
    if is_valid_project_key(&key) {
        Some(key)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Task construction and lookup
// ---------------------------------------------------------------------------

/// A new todo task with the standard placeholder body
pub fn new_task(title: &str, due: Option<NaiveDate>, today: NaiveDate) -> Task {
    let mut task = Task::new(title.trim(), today);
    task.due = due;
    task.notes = NOTES_PLACEHOLDER.to_string();
    task
}

/// Where a task lives
#[derive(Debug, Clone)]
pub struct TaskLocation {
    pub month: Month,
    pub path: PathBuf,
    pub section: SectionKind,
    pub task: Task,
}

/// Locate a task by title across every month of a project
pub fn find_task(
    layout: &DataLayout,
    project: &str,
    title: &str,
) -> Result<Option<TaskLocation>, LedgerError> {
    validate_project_key(project)?;
    for loaded in load_project_ledgers(layout, project)? {
        if let Some((section, task)) = loaded.ledger.find_task(title) {
            return Ok(Some(TaskLocation {
                month: loaded.month,
                path: loaded.path.clone(),
                section,
                task: task.clone(),
            }));
        }
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// Insertion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted { month: Month, path: PathBuf },
    /// The project already has a task with this title (in `month`)
    AlreadyExists { month: Month },
}

/// Insert a task into a project's ledger for `month`, unless the title
/// already exists in any month of that project. Creates the ledger (and the
/// project's tasks directory) on first use.
pub fn insert_task(
    layout: &DataLayout,
    project: &str,
    task: Task,
    month: Month,
) -> Result<InsertOutcome, LedgerError> {
    validate_project_key(project)?;
    if let Some(existing) = find_task(layout, project, &task.title)? {
        tracing::debug!(project, title = %task.title, "task already exists, not inserting");
        return Ok(InsertOutcome::AlreadyExists {
            month: existing.month,
        });
    }

    let mut loaded = load_or_new_ledger(layout, project, month)?;
    tracing::info!(project, month = %month, title = %task.title, "task added");
    loaded.ledger.insert_task(SectionKind::Active, task);
    save_ledger(&loaded.path, &loaded.ledger)?;
    Ok(InsertOutcome::Inserted {
        month,
        path: loaded.path,
    })
}

/// Insert, treating an existing title as an error
pub fn create_task(
    layout: &DataLayout,
    project: &str,
    task: Task,
    month: Month,
) -> Result<PathBuf, LedgerError> {
    let title = task.title.clone();
    match insert_task(layout, project, task, month)? {
        InsertOutcome::Inserted { path, .. } => Ok(path),
        InsertOutcome::AlreadyExists { .. } => Err(LedgerError::DuplicateTask {
            project: project.to_string(),
            title,
        }),
    }
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteOutcome {
    Completed { month: Month },
    AlreadyDone { month: Month },
}

/// Move a task from Active to Completed, setting `status: done` and
/// `completed: <date>`. Returns false if the task was already completed.
pub fn complete_in_ledger(ledger: &mut Ledger, title: &str, date: NaiveDate) -> Option<bool> {
    match ledger.find_task(title) {
        None => None,
        Some((SectionKind::Completed, _)) => Some(false),
        Some((SectionKind::Active, _)) => {
            let (_, mut task) = ledger.remove_task(title)?;
            task.status = Status::Done;
            task.completed = Some(date);
            task.mark_dirty();
            ledger.insert_task(SectionKind::Completed, task);
            Some(true)
        }
    }
}

/// Complete a task wherever it lives in the project
pub fn complete_task(
    layout: &DataLayout,
    project: &str,
    title: &str,
    date: NaiveDate,
) -> Result<CompleteOutcome, LedgerError> {
    validate_project_key(project)?;
    for mut loaded in load_project_ledgers(layout, project)? {
        match complete_in_ledger(&mut loaded.ledger, title, date) {
            None => continue,
            Some(false) => {
                return Ok(CompleteOutcome::AlreadyDone {
                    month: loaded.month,
                });
            }
            Some(true) => {
                save_ledger(&loaded.path, &loaded.ledger)?;
                tracing::info!(project, title, month = %loaded.month, "task completed");
                return Ok(CompleteOutcome::Completed {
                    month: loaded.month,
                });
            }
        }
    }
    Err(LedgerError::TaskNotFound {
        project: project.to_string(),
        title: title.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Due dates
// ---------------------------------------------------------------------------

/// Set a task's due date (either direction). Returns the previous due date.
pub fn reschedule_task(
    layout: &DataLayout,
    project: &str,
    title: &str,
    due: NaiveDate,
) -> Result<Option<NaiveDate>, LedgerError> {
    update_due(layout, project, title, |_| Some(due))?.ok_or_else(|| {
        LedgerError::TaskNotFound {
            project: project.to_string(),
            title: title.to_string(),
        }
    })
}

/// Move a task's due date to `date` only if that is later than the current
/// one (or there is none). Returns whether anything changed; a missing task
/// is not an error here.
pub fn bump_due(
    layout: &DataLayout,
    project: &str,
    title: &str,
    date: NaiveDate,
) -> Result<bool, LedgerError> {
    let mut changed = false;
    update_due(layout, project, title, |current| match current {
        Some(d) if d >= date => None,
        _ => {
            changed = true;
            Some(date)
        }
    })?;
    if changed {
        tracing::info!(project, title, due = %date, "due date moved later");
    }
    Ok(changed)
}

/// Apply `f` to a task's due date; `None` from `f` leaves the file untouched.
/// Outer `None` means the task was not found.
fn update_due(
    layout: &DataLayout,
    project: &str,
    title: &str,
    mut f: impl FnMut(Option<NaiveDate>) -> Option<NaiveDate>,
) -> Result<Option<Option<NaiveDate>>, LedgerError> {
    validate_project_key(project)?;
    for mut loaded in load_project_ledgers(layout, project)? {
        let Some(task) = loaded.ledger.find_task_mut(title) else {
            continue;
        };
        let previous = task.due;
        if let Some(new_due) = f(previous)
            && Some(new_due) != previous
        {
            task.due = Some(new_due);
            task.mark_dirty();
            save_ledger(&loaded.path, &loaded.ledger)?;
        }
        return Ok(Some(previous));
    }
    Ok(None)
}

/// Ensure a project's ledger for `month` exists on disk
pub fn ensure_ledger(layout: &DataLayout, project: &str, month: Month) -> Result<PathBuf, LedgerError> {
    let loaded = load_or_new_ledger(layout, project, month)?;
    if !loaded.path.exists() {
        save_ledger(&loaded.path, &loaded.ledger)?;
    }
    Ok(loaded.path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ledger_io::load_ledger;
    use std::fs;
    use tempfile::TempDir;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn month(s: &str) -> Month {
        s.parse().unwrap()
    }

    fn setup() -> (TempDir, DataLayout) {
        let tmp = TempDir::new().unwrap();
        let layout = DataLayout::new(tmp.path());
        (tmp, layout)
    }

    #[test]
    fn project_keys() {
        assert!(is_valid_project_key("launch-2"));
        assert!(!is_valid_project_key("Launch"));
        assert!(!is_valid_project_key("a_b"));
        assert!(!is_valid_project_key(""));
        assert_eq!(normalize_project_key("Launch Site").as_deref(), Some("launch-site"));
        assert_eq!(normalize_project_key("  ops "), Some("ops".to_string()));
        assert_eq!(normalize_project_key("!!!"), None);
    }

    #[test]
    fn insert_is_idempotent_across_months() {
        let (_tmp, layout) = setup();
        let today = day(2025, 5, 20);
        let task = new_task("Ship", Some(day(2025, 6, 1)), today);
        let first = insert_task(&layout, "launch", task.clone(), month("2025-06")).unwrap();
        assert!(matches!(first, InsertOutcome::Inserted { .. }));

        // Same title, different case, different month
        let again = new_task("SHIP", None, today);
        let second = insert_task(&layout, "launch", again, month("2025-05")).unwrap();
        assert_eq!(
            second,
            InsertOutcome::AlreadyExists {
                month: month("2025-06")
            }
        );
        assert!(!layout.ledger_path("launch", month("2025-05")).exists());

        let err = create_task(&layout, "launch", task, month("2025-06")).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateTask { .. }));
    }

    #[test]
    fn insert_rejects_bad_key() {
        let (_tmp, layout) = setup();
        let task = new_task("A", None, day(2025, 6, 1));
        let err = insert_task(&layout, "Bad Key", task, month("2025-06")).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidProjectKey(_)));
    }

    #[test]
    fn lookups_reject_keys_outside_projects() {
        let tmp = TempDir::new().unwrap();
        let layout = DataLayout::new(tmp.path().join("data"));
        fs::create_dir_all(tmp.path().join("data/projects")).unwrap();
        // A ledger-shaped file two levels above projects/
        let outside = tmp.path().join("outside/tasks");
        fs::create_dir_all(&outside).unwrap();
        let ledger = "# Outside - June 2025\n\n## Active Tasks\n\n---\n### Secret\ndue: 2025-06-01\nstatus: todo\n\n---\n## Completed Tasks\n\n---\n";
        fs::write(outside.join("2025-06.md"), ledger).unwrap();

        let key = "../../outside";
        let today = day(2025, 6, 1);
        assert!(matches!(find_task(&layout, key, "Secret"), Err(LedgerError::InvalidProjectKey(_))));
        assert!(matches!(complete_task(&layout, key, "Secret", today), Err(LedgerError::InvalidProjectKey(_))));
        assert!(matches!(reschedule_task(&layout, key, "Secret", today), Err(LedgerError::InvalidProjectKey(_))));
        assert!(matches!(bump_due(&layout, key, "Secret", today), Err(LedgerError::InvalidProjectKey(_))));
        assert_eq!(fs::read_to_string(outside.join("2025-06.md")).unwrap(), ledger);
    }

    #[test]
    fn complete_moves_and_stamps() {
        let (_tmp, layout) = setup();
        let today = day(2025, 5, 20);
        insert_task(&layout, "launch", new_task("Ship", Some(day(2025, 6, 1)), today), month("2025-06")).unwrap();

        let outcome = complete_task(&layout, "launch", "ship", day(2025, 6, 1)).unwrap();
        assert_eq!(outcome, CompleteOutcome::Completed { month: month("2025-06") });

        let ledger = load_ledger(&layout.ledger_path("launch", month("2025-06"))).unwrap();
        assert_eq!(ledger.active().count(), 0);
        let done: Vec<_> = ledger.completed().collect();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].status, Status::Done);
        assert_eq!(done[0].completed, Some(day(2025, 6, 1)));
        assert_eq!(done[0].notes, NOTES_PLACEHOLDER);

        // Second completion is a no-op
        let before = fs::read_to_string(layout.ledger_path("launch", month("2025-06"))).unwrap();
        let outcome = complete_task(&layout, "launch", "Ship", day(2025, 6, 2)).unwrap();
        assert!(matches!(outcome, CompleteOutcome::AlreadyDone { .. }));
        let after = fs::read_to_string(layout.ledger_path("launch", month("2025-06"))).unwrap();
        assert_eq!(before, after);

        let err = complete_task(&layout, "launch", "Nope", today).unwrap_err();
        assert!(matches!(err, LedgerError::TaskNotFound { .. }));
    }

    #[test]
    fn bump_only_moves_later() {
        let (_tmp, layout) = setup();
        let today = day(2025, 6, 1);
        insert_task(&layout, "ops", new_task("Patch", Some(day(2025, 6, 10)), today), month("2025-06")).unwrap();

        assert!(!bump_due(&layout, "ops", "Patch", day(2025, 6, 5)).unwrap());
        assert!(!bump_due(&layout, "ops", "Patch", day(2025, 6, 10)).unwrap());
        assert!(bump_due(&layout, "ops", "Patch", day(2025, 6, 12)).unwrap());
        assert!(!bump_due(&layout, "ops", "Missing", day(2025, 6, 12)).unwrap());

        let loc = find_task(&layout, "ops", "patch").unwrap().unwrap();
        assert_eq!(loc.task.due, Some(day(2025, 6, 12)));
    }

    #[test]
    fn bump_sets_missing_due() {
        let (_tmp, layout) = setup();
        let today = day(2025, 6, 1);
        insert_task(&layout, "ops", new_task("Someday", None, today), month("2025-06")).unwrap();
        assert!(bump_due(&layout, "ops", "Someday", today).unwrap());
    }

    #[test]
    fn reschedule_moves_either_way() {
        let (_tmp, layout) = setup();
        let today = day(2025, 6, 1);
        insert_task(&layout, "ops", new_task("Patch", Some(day(2025, 6, 10)), today), month("2025-06")).unwrap();

        let prev = reschedule_task(&layout, "ops", "Patch", day(2025, 6, 3)).unwrap();
        assert_eq!(prev, Some(day(2025, 6, 10)));
        let loc = find_task(&layout, "ops", "Patch").unwrap().unwrap();
        assert_eq!(loc.task.due, Some(day(2025, 6, 3)));

        let err = reschedule_task(&layout, "ops", "Missing", today).unwrap_err();
        assert!(matches!(err, LedgerError::TaskNotFound { .. }));
    }
}
