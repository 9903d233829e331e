use chrono::{Duration, NaiveDate};

use crate::io::atomic::append_archive;
use crate::io::layout::DataLayout;
use crate::io::ledger_io::LedgerError;
use crate::model::ledger::Month;
use crate::ops::capture_ops::ArchiveOutcome;
use crate::parse::capture_parser::{inbox_date_heading, parse_inbox_sections};

/// Initial inbox.md body (the date heading is appended)
pub const INBOX_PREAMBLE: &str = "<!-- Scratchpad for thoughts, ideas and notes. Entries are grouped by date when you save. -->";

/// Text of a new inbox.md
pub fn inbox_template(today: NaiveDate) -> String {
    format!("{}\n\n{}\n", INBOX_PREAMBLE, inbox_date_heading(today))
}

/// Insert a `## <today>` heading if the inbox has none.
///
/// The heading goes after the leading preamble block (the first blank line
/// past line one), or at the very top when there is no such block.
pub fn ensure_date_header(content: &str, today: NaiveDate) -> String {
    let heading = inbox_date_heading(today);
    if content.split('\n').any(|l| l.trim_end() == heading) {
        return content.to_string();
    }
    let mut lines: Vec<String> = content.split('\n').map(|l| l.to_string()).collect();
    let insert_at = lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, l)| l.trim().is_empty())
        .map(|(i, _)| i + 1)
        .unwrap_or(0);
    let insert_at = insert_at.min(lines.len());
    lines.insert(insert_at, String::new());
    lines.insert(insert_at, heading);
    tracing::debug!(date = %today, "inbox date heading added");
    lines.join("\n")
}

/// Move date sections older than `retention_days` to `inbox-archive-YYYY-MM.md`.
/// A retention reaching past the calendar range archives nothing.
pub fn archive_old_sections(
    layout: &DataLayout,
    content: &str,
    today: NaiveDate,
    retention_days: i64,
) -> Result<ArchiveOutcome, LedgerError> {
    let cutoff = Duration::try_days(retention_days).and_then(|age| today.checked_sub_signed(age));
    let lines: Vec<&str> = content.split('\n').collect();
    let old: Vec<_> = parse_inbox_sections(content)
        .into_iter()
        .filter(|s| cutoff.is_some_and(|cutoff| s.date < cutoff))
        .collect();

    if old.is_empty() {
        return Ok(ArchiveOutcome {
            content: content.to_string(),
            archived: 0,
        });
    }

    let mut archived_text = String::new();
    for section in &old {
        let body = lines[section.start..section.end].join("\n");
        archived_text.push_str(body.trim_end());
        archived_text.push_str("\n\n");
    }

    let month = Month::of(today);
    let path = layout.inbox_archive_path(month);
    let header = format!("# Archived Inbox - {}", month.long_name());
    append_archive(&path, &header, &archived_text).map_err(|e| LedgerError::Write {
        path: path.clone(),
        source: e,
    })?;

    let kept: Vec<&str> = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| !old.iter().any(|s| (s.start..s.end).contains(i)))
        .map(|(_, l)| *l)
        .collect();
    tracing::info!(sections = old.len(), path = %path.display(), "inbox sections archived");

    Ok(ArchiveOutcome {
        content: kept.join("\n"),
        archived: old.len(),
    })
}
