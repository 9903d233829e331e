use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::io::atomic::atomic_write;
use crate::io::layout::DataLayout;
use crate::io::ledger_io::{LedgerError, load_project_ledgers};
use crate::model::daily::{DailyFile, DailySection, DueBuckets, DueTask};
use crate::model::task::titles_match;
use crate::ops::ledger_ops::{find_task, is_valid_project_key, normalize_project_key};
use crate::parse::daily_parser::parse_daily;

/// Line shown under `## Today` when nothing is due
pub const NOTHING_DUE: &str = "No tasks due today.";

/// Scan every project's Active sections for non-done tasks due on or before `date`
pub fn collect_due(layout: &DataLayout, date: NaiveDate) -> Result<DueBuckets, LedgerError> {
    let mut buckets = DueBuckets::default();
    for project in layout.project_keys() {
        for loaded in load_project_ledgers(layout, &project)? {
            for task in loaded.ledger.active() {
                if task.is_done() {
                    continue;
                }
                let Some(due) = task.due else { continue };
                let entry = DueTask {
                    title: task.title.clone(),
                    project: project.clone(),
                    due,
                };
                if due == date {
                    buckets.today.push(entry);
                } else if due < date {
                    buckets.overdue.push(entry);
                }
            }
        }
    }
    buckets.overdue.sort_by(|a, b| a.due.cmp(&b.due).then_with(|| a.project.cmp(&b.project)));
    Ok(buckets)
}

/// Render a daily file. `carried` lines go under `## Today` after the due
/// tasks; `notes` is the body to keep under `## Notes`.
pub fn render_daily(
    date: NaiveDate,
    buckets: &DueBuckets,
    carried: &[String],
    notes: Option<&[String]>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", date.format("%A, %B %-d, %Y")));

    if !buckets.overdue.is_empty() {
        out.push_str("## Overdue\n");
        for t in &buckets.overdue {
            out.push_str(&format!("- [ ] {} ({})\n", t.title, t.project));
        }
        out.push('\n');
    }

    out.push_str("## Today\n");
    if buckets.is_empty() && carried.is_empty() {
        out.push_str(NOTHING_DUE);
        out.push('\n');
    }
    for t in &buckets.today {
        out.push_str(&format!("- [ ] {} ({})\n", t.title, t.project));
    }
    for line in carried {
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');

    out.push_str("## Notes\n");
    if let Some(body) = notes {
        out.push_str(&body.join("\n"));
    }
    out
}

/// Checkbox lines above `## Notes` of an existing daily file that no ledger
/// has a task for (a tag naming a project that does not exist yet, say).
/// They are rendered back as typed so regeneration does not drop them.
pub fn unsynced_lines(
    layout: &DataLayout,
    daily: &DailyFile,
    buckets: &DueBuckets,
) -> Result<Vec<String>, LedgerError> {
    let mut lines = Vec::new();
    for entry in &daily.entries {
        if entry.section == DailySection::Notes {
            continue;
        }
        let listed = buckets
            .overdue
            .iter()
            .chain(&buckets.today)
            .any(|t| titles_match(&t.title, &entry.title));
        if listed || in_some_ledger(layout, &entry.title, entry.project.as_deref())? {
            continue;
        }
        let mark = if entry.checked { 'x' } else { ' ' };
        lines.push(match &entry.project {
            Some(tag) => format!("- [{}] {} ({})", mark, entry.title, tag),
            None => format!("- [{}] {}", mark, entry.title),
        });
    }
    Ok(lines)
}

fn in_some_ledger(layout: &DataLayout, title: &str, tag: Option<&str>) -> Result<bool, LedgerError> {
    let keys: Vec<String> = match tag {
        Some(tag) => normalize_project_key(tag)
            .filter(|k| layout.project_exists(k))
            .into_iter()
            .collect(),
        None => layout.project_keys(),
    };
    for key in keys.iter().filter(|k| is_valid_project_key(k)) {
        if find_task(layout, key, title)?.is_some() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Regenerate the daily file for `date`, keeping the Notes and unsynced
/// lines of an existing one
pub fn generate_daily(layout: &DataLayout, date: NaiveDate) -> Result<PathBuf, LedgerError> {
    let path = layout.daily_path(date);
    let existing = fs::read_to_string(&path).ok().map(|text| parse_daily(&text));
    let buckets = collect_due(layout, date)?;
    let carried = match &existing {
        Some(daily) => unsynced_lines(layout, daily, &buckets)?,
        None => Vec::new(),
    };
    let notes = existing.and_then(|daily| daily.notes);
    let content = render_daily(date, &buckets, &carried, notes.as_deref());
    atomic_write(&path, content.as_bytes()).map_err(|e| LedgerError::Write {
        path: path.clone(),
        source: e,
    })?;
    tracing::info!(
        date = %date,
        overdue = buckets.overdue.len(),
        today = buckets.today.len(),
        carried = carried.len(),
        "daily file generated"
    );
    Ok(path)
}

/// Generate the daily file only if it does not exist. Returns whether it was generated.
pub fn ensure_daily(layout: &DataLayout, date: NaiveDate) -> Result<bool, LedgerError> {
    if layout.daily_path(date).exists() {
        return Ok(false);
    }
    generate_daily(layout, date)?;
    Ok(true)
}

/// Regenerate the daily file for `date` only if it already exists
pub fn refresh_daily(layout: &DataLayout, date: NaiveDate) -> Result<bool, LedgerError> {
    if !layout.daily_path(date).exists() {
        return Ok(false);
    }
    generate_daily(layout, date)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ledger::Month;
    use crate::ops::ledger_ops::{complete_task, insert_task, new_task};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn add(layout: &DataLayout, project: &str, title: &str, due: Option<NaiveDate>) {
        let month = Month::of(due.unwrap_or(day(2025, 6, 1)));
        insert_task(layout, project, new_task(title, due, day(2025, 5, 1)), month).unwrap();
    }

    #[test]
    fn buckets_by_due_date() {
        let tmp = TempDir::new().unwrap();
        let layout = DataLayout::new(tmp.path());
        add(&layout, "launch", "Ship landing page", Some(day(2025, 6, 1)));
        add(&layout, "launch", "Old thing", Some(day(2025, 5, 28)));
        add(&layout, "ops", "Future", Some(day(2025, 6, 2)));
        add(&layout, "ops", "Undated", None);
        add(&layout, "ops", "Finished", Some(day(2025, 5, 30)));
        complete_task(&layout, "ops", "Finished", day(2025, 5, 30)).unwrap();

        let buckets = collect_due(&layout, day(2025, 6, 1)).unwrap();
        let today: Vec<_> = buckets.today.iter().map(|t| t.title.as_str()).collect();
        let overdue: Vec<_> = buckets.overdue.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(today, vec!["Ship landing page"]);
        assert_eq!(overdue, vec!["Old thing"]);
    }

    #[test]
    fn render_template() {
        let buckets = DueBuckets {
            overdue: vec![DueTask {
                title: "Old thing".into(),
                project: "ops".into(),
                due: day(2025, 5, 28),
            }],
            today: vec![DueTask {
                title: "Ship landing page".into(),
                project: "launch".into(),
                due: day(2025, 6, 1),
            }],
        };
        assert_eq!(
            render_daily(day(2025, 6, 1), &buckets, &[], None),
            "# Sunday, June 1, 2025

## Overdue
- [ ] Old thing (ops)

## Today
- [ ] Ship landing page (launch)

## Notes
"
        );
    }

    #[test]
    fn render_empty_day() {
        assert_eq!(
            render_daily(day(2025, 6, 3), &DueBuckets::default(), &[], None),
            "# Tuesday, June 3, 2025\n\n## Today\nNo tasks due today.\n\n## Notes\n"
        );
    }

    #[test]
    fn regeneration_keeps_notes() {
        let tmp = TempDir::new().unwrap();
        let layout = DataLayout::new(tmp.path());
        let date = day(2025, 6, 1);
        assert!(ensure_daily(&layout, date).unwrap());
        assert!(!ensure_daily(&layout, date).unwrap());

        let path = layout.daily_path(date);
        let mut text = fs::read_to_string(&path).unwrap();
        text.push_str("call the plumber\n");
        fs::write(&path, &text).unwrap();

        add(&layout, "launch", "Ship landing page", Some(date));
        assert!(refresh_daily(&layout, date).unwrap());
        let regenerated = fs::read_to_string(&path).unwrap();
        assert!(regenerated.contains("- [ ] Ship landing page (launch)"));
        assert!(regenerated.ends_with("## Notes\ncall the plumber\n"));
    }

    #[test]
    fn regeneration_keeps_lines_no_ledger_knows() {
        let tmp = TempDir::new().unwrap();
        let layout = DataLayout::new(tmp.path());
        let date = day(2025, 6, 1);
        add(&layout, "launch", "Ship landing page", Some(date));
        add(&layout, "launch", "Done already", Some(date));
        complete_task(&layout, "launch", "Done already", date).unwrap();

        let path = layout.daily_path(date);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            "## Today\n\
             - [ ] Ship landing page (launch)\n\
             - [ ] Call plumber (house)\n\
             - [x] Done already (launch)\n\
             - [x] Paid rent\n\n\
             ## Notes\n- [ ] Idea (house)\n",
        )
        .unwrap();

        add(&layout, "launch", "Other", Some(date));
        generate_daily(&layout, date).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "# Sunday, June 1, 2025

## Today
- [ ] Other (launch)
- [ ] Ship landing page (launch)
- [ ] Call plumber (house)
- [x] Paid rent

## Notes
- [ ] Idea (house)
"
        );
    }

    #[test]
    fn refresh_does_not_create() {
        let tmp = TempDir::new().unwrap();
        let layout = DataLayout::new(tmp.path());
        assert!(!refresh_daily(&layout, day(2025, 6, 1)).unwrap());
        assert!(!layout.daily_path(day(2025, 6, 1)).exists());
    }
}
