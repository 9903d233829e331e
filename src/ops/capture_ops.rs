use chrono::NaiveDate;

use crate::io::atomic::append_archive;
use crate::io::layout::DataLayout;
use crate::io::ledger_io::LedgerError;
use crate::model::capture::{CaptureEntry, Promotion};
use crate::model::ledger::Month;
use crate::ops::ledger_ops::{InsertOutcome, insert_task, new_task};
use crate::parse::capture_parser::{is_completed_line, promoted_line};

/// Initial tasks.md written by `ensure_capture_files`
pub const CAPTURE_TEMPLATE: &str = "<!-- Capture tasks here as: task name | due date | project. Due date and project are optional; tasks move into project files when you save. -->\n\n## Your Tasks\n";

/// A capture entry with the project it will be promoted into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub entry: CaptureEntry,
    pub project: String,
}

#[derive(Debug, Clone, Default)]
pub struct CaptureOutcome {
    /// The capture file text with promoted lines struck through
    pub content: String,
    pub promotions: Vec<Promotion>,
}

/// Promote resolved entries into their ledgers and rewrite their lines.
///
/// Each entry lands in the ledger for its due month (else `today`'s month).
/// An entry whose title already exists in the project is not inserted again
/// but its line is still marked promoted. An entry that fails to insert keeps
/// its original line so the next save retries it.
pub fn apply_promotions(
    layout: &DataLayout,
    content: &str,
    resolved: &[ResolvedEntry],
    today: NaiveDate,
) -> CaptureOutcome {
    let mut lines: Vec<String> = content.split('\n').map(|l| l.to_string()).collect();
    let mut promotions = Vec::new();

    for item in resolved {
        let entry = &item.entry;
        let month = Month::of(entry.due.unwrap_or(today));
        let task = new_task(&entry.title, entry.due, today);
        let inserted = match insert_task(layout, &item.project, task, month) {
            Ok(InsertOutcome::Inserted { .. }) => true,
            Ok(InsertOutcome::AlreadyExists { .. }) => false,
            Err(e) => {
                tracing::warn!(title = %entry.title, project = %item.project, error = %e, "could not promote capture entry");
                continue;
            }
        };
        if let Some(line) = lines.get_mut(entry.index) {
            *line = promoted_line(&entry.title, entry.due, &item.project);
        }
        promotions.push(Promotion {
            title: entry.title.clone(),
            project: item.project.clone(),
            due: entry.due,
            inserted,
        });
    }

    CaptureOutcome {
        content: lines.join("\n"),
        promotions,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutcome {
    pub content: String,
    pub archived: usize,
}

/// Once more than `threshold` completed lines pile up, move all but the last
/// `keep` of them to `tasks-archive-YYYY-MM.md`. Archived lines are removed
/// in place; everything else is untouched.
pub fn archive_completed(
    layout: &DataLayout,
    content: &str,
    threshold: usize,
    keep: usize,
    today: NaiveDate,
) -> Result<ArchiveOutcome, LedgerError> {
    let lines: Vec<&str> = content.split('\n').collect();
    let completed: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| is_completed_line(l))
        .map(|(i, _)| i)
        .collect();

    if completed.len() <= threshold {
        return Ok(ArchiveOutcome {
            content: content.to_string(),
            archived: 0,
        });
    }

    let cut = completed.len().saturating_sub(keep);
    let to_archive = &completed[..cut];
    let archived_text: Vec<&str> = to_archive.iter().map(|&i| lines[i]).collect();

    let month = Month::of(today);
    let path = layout.capture_archive_path(month);
    let header = format!("# Archived Tasks - {}", month.long_name());
    append_archive(&path, &header, &archived_text.join("\n")).map_err(|e| LedgerError::Write {
        path: path.clone(),
        source: e,
    })?;

    let kept: Vec<&str> = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| to_archive.binary_search(i).is_err())
        .map(|(_, l)| *l)
        .collect();
    tracing::info!(archived = to_archive.len(), path = %path.display(), "capture lines archived");

    Ok(ArchiveOutcome {
        content: kept.join("\n"),
        archived: to_archive.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ledger_io::load_ledger;
    use crate::parse::capture_parser::parse_capture_entries;
    use std::fs;
    use tempfile::TempDir;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn resolve_all(content: &str, project: &str) -> Vec<ResolvedEntry> {
        parse_capture_entries(content)
            .into_iter()
            .map(|entry| ResolvedEntry {
                project: entry.project.clone().unwrap_or_else(|| project.to_string()),
                entry,
            })
            .collect()
    }

    #[test]
    fn promotes_and_strikes_through() {
        let tmp = TempDir::new().unwrap();
        let layout = DataLayout::new(tmp.path());
        let content = "## Your Tasks\n- [ ] Ship landing page | 2025-06-01 | launch\n- [ ] Call the bank\n";
        let resolved = resolve_all(content, "others");
        let outcome = apply_promotions(&layout, content, &resolved, day(2025, 5, 20));

        assert_eq!(
            outcome.content,
            "## Your Tasks\n- [x] ~~Ship landing page | 2025-06-01 | launch~~ (added to launch)\n- [x] ~~Call the bank |  | others~~ (added to others)\n"
        );
        assert!(outcome.promotions.iter().all(|p| p.inserted));

        let launch = load_ledger(&layout.ledger_path("launch", "2025-06".parse().unwrap())).unwrap();
        let task = launch.active().next().unwrap();
        assert_eq!(task.title, "Ship landing page");
        assert_eq!(task.due, Some(day(2025, 6, 1)));
        assert_eq!(task.created, Some(day(2025, 5, 20)));

        // Undated entries land in today's month
        assert!(layout.ledger_path("others", "2025-05".parse().unwrap()).exists());
    }

    #[test]
    fn existing_title_is_struck_but_not_duplicated() {
        let tmp = TempDir::new().unwrap();
        let layout = DataLayout::new(tmp.path());
        let content = "- [ ] Ship | 2025-06-01 | launch";
        apply_promotions(&layout, content, &resolve_all(content, "others"), day(2025, 5, 20));
        let outcome = apply_promotions(&layout, content, &resolve_all(content, "others"), day(2025, 5, 21));

        assert_eq!(outcome.promotions.len(), 1);
        assert!(!outcome.promotions[0].inserted);
                let launch = load_ledger(&layout.ledger_path("launch", "2025-06".parse().unwrap())).unwrap();
        assert_eq!(launch.active().count(), 1);
    }

    #[test]
    fn archive_keeps_last_twenty() {
        let tmp = TempDir::new().unwrap();
        let layout = DataLayout::new(tmp.path());
        let mut lines = vec!["## Your Tasks".to_string()];
        for i in 0..51 {
            lines.push(format!("- [x] ~~Task {} | | ops~~ (added to ops)", i));
        }
        lines.push("- [ ] still pending".to_string());
        let content = lines.join("\n");

        let outcome = archive_completed(&layout, &content, 50, 20, day(2025, 6, 1)).unwrap();
        assert_eq!(outcome.archived, 31);
        let live: Vec<&str> = outcome.content.split('\n').collect();
        assert_eq!(live.len(), 1 + 20 + 1);
        assert_eq!(live[0], "## Your Tasks");
        assert!(live[1].contains("Task 31 "));
        assert_eq!(live[21], "- [ ] still pending");

        let archive = fs::read_to_string(layout.capture_archive_path("2025-06".parse().unwrap())).unwrap();
        assert!(archive.starts_with("# Archived Tasks - June 2025\n\n"));
        let archived: Vec<&str> = archive.lines().filter(|l| l.starts_with("- [x]")).collect();
        assert_eq!(archived.len(), 31);
        assert!(archived[0].contains("Task 0 "));
        assert!(archived[30].contains("Task 30 "));
    }

    #[test]
    fn archive_below_threshold_is_noop() {
        let tmp = TempDir::new().unwrap();
        let layout = DataLayout::new(tmp.path());
        let content = "- [x] ~~A | | ops~~ (added to ops)\n";
        let outcome = archive_completed(&layout, content, 50, 20, day(2025, 6, 1)).unwrap();
        assert_eq!(outcome.archived, 0);
        assert_eq!(outcome.content, content);
        assert!(!layout.capture_archive_path("2025-06".parse().unwrap()).exists());
    }
}
