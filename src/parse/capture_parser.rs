use chrono::NaiveDate;

use crate::model::capture::{CaptureEntry, InboxSection};

/// Parse pending capture lines (`- [ ] title | date | project`) from tasks.md
pub fn parse_capture_entries(source: &str) -> Vec<CaptureEntry> {
    source
        .split('\n')
        .enumerate()
        .filter_map(|(idx, line)| parse_capture_line(idx, line))
        .collect()
}

fn parse_capture_line(index: usize, line: &str) -> Option<CaptureEntry> {
    let rest = line.strip_prefix("- [ ] ")?;
    let mut parts = rest.trim_end_matches('\r').split('|').map(str::trim);
    let title = parts.next()?.to_string();
    if title.is_empty() {
        return None;
    }
    let second = parts.next();
    let third: Vec<&str> = parts.collect();
    let third = if third.is_empty() {
        None
    } else {
        Some(third.join(" | "))
    };

    let (due, project) = match (second, third) {
        (None, _) => (None, None),
        // `title | x`: a date if it parses, otherwise a project
        (Some(x), None) => match parse_date(x) {
            Some(d) => (Some(d), None),
            None => (None, non_empty(x)),
        },
        (Some(x), Some(p)) => (parse_date(x), non_empty(&p)),
    };

    Some(CaptureEntry {
        index,
        title,
        due,
        project,
    })
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// The struck-through audit line a promoted entry is rewritten to
pub fn promoted_line(title: &str, due: Option<NaiveDate>, project: &str) -> String {
    let due = due.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
    format!(
        "- [x] ~~{} | {} | {}~~ (added to {})",
        title, due, project, project
    )
}

/// A capture line that has been promoted or otherwise completed
pub fn is_completed_line(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.trim_start().starts_with("- [x]") && line.contains("~~")
}

/// Find `## YYYY-MM-DD` sections in inbox.md.
///
/// A section runs from its heading to the next `## ` heading (or end of file).
pub fn parse_inbox_sections(source: &str) -> Vec<InboxSection> {
    let lines: Vec<&str> = source.split('\n').collect();
    let mut sections = Vec::new();
    let mut current: Option<(NaiveDate, usize)> = None;

    for (idx, line) in lines.iter().enumerate() {
        if let Some(name) = line.strip_prefix("## ") {
            if let Some((date, start)) = current.take() {
                sections.push(InboxSection {
                    date,
                    start,
                    end: idx,
                });
            }
            if let Some(date) = parse_date(name) {
                current = Some((date, idx));
            }
        }
    }
    if let Some((date, start)) = current {
        sections.push(InboxSection {
            date,
            start,
            end: lines.len(),
        });
    }
    sections
}

/// Heading line for an inbox date section
pub fn inbox_date_heading(date: NaiveDate) -> String {
    format!("## {}", date.format("%Y-%m-%d"))
}
