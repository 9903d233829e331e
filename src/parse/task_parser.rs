use chrono::NaiveDate;

use crate::model::ledger::{LedgerBlock, ParseIssue};
use crate::model::task::{Priority, Status, Task};
use crate::parse::span::SourceSpan;

/// Where the block parser is inside one `---`-delimited chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    /// Before the `### ` title line
    Leading,
    /// Reading `key: value` lines
    Header,
    /// Everything after the fields is notes
    Body,
}

/// Parse the lines of one chunk into a task block, or keep them raw.
///
/// `start_idx` is the 0-based file index of the chunk's first line. A chunk
/// is a task iff it has a `### ` line; text above that line is kept on the
/// task as `leading`. Chunks without one stay raw.
pub fn parse_block(lines: &[String], start_idx: usize) -> (LedgerBlock, Vec<ParseIssue>) {
    let mut issues = Vec::new();
    let mut state = BlockState::Leading;
    let mut task: Option<Task> = None;
    let mut body: Vec<String> = Vec::new();

    if !lines.iter().any(|l| task_heading(l).is_some()) {
        return (LedgerBlock::Raw(lines.to_vec()), issues);
    }

    for (offset, line) in lines.iter().enumerate() {
        let line_no = start_idx + offset + 1;
        match state {
            BlockState::Leading => match task_heading(line) {
                Some(title) if !title.is_empty() => {
                    let mut t = empty_task(title);
                    t.leading = trim_blank_edges(&lines[..offset]).to_vec();
                    task = Some(t);
                    state = BlockState::Header;
                }
                Some(_) => {
                    issues.push(ParseIssue::new(line_no, "task heading without a title"));
                    return (LedgerBlock::Raw(lines.to_vec()), issues);
                }
                None => {}
            },
            BlockState::Header => {
                let Some(t) = task.as_mut() else { break };
                if line.trim().is_empty() {
                    state = BlockState::Body;
                } else if let Some((key, value)) = field_line(line) {
                    apply_field(t, key, value, line_no, &mut issues);
                } else {
                    state = BlockState::Body;
                    body.push(line.clone());
                }
            }
            BlockState::Body => body.push(line.clone()),
        }
    }

    match task {
        Some(mut t) => {
            t.notes = trim_blank_edges(&body).join("\n");
            t.span = Some(SourceSpan::new(start_idx, start_idx + lines.len()));
            t.source_text = Some(lines.to_vec());
            t.dirty = false;
            (LedgerBlock::Task(t), issues)
        }
        None => (LedgerBlock::Raw(lines.to_vec()), issues),
    }
}

/// Title text of a `### ` line
pub fn task_heading(line: &str) -> Option<&str> {
    let trimmed = line.trim_end();
    if trimmed == "###" {
        return Some("");
    }
    trimmed.strip_prefix("### ").map(str::trim)
}

/// Split a `key: value` field line. Keys are lowercase identifiers.
pub fn field_line(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim_end();
    let valid = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase())
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if !valid || value.starts_with("//") {
        return None;
    }
    Some((key, value.trim()))
}

fn empty_task(title: &str) -> Task {
    Task {
        title: title.to_string(),
        due: None,
        priority: Priority::Medium,
        status: Status::Todo,
        tags: Vec::new(),
        created: None,
        completed: None,
        extra_fields: Vec::new(),
        notes: String::new(),
        leading: Vec::new(),
        span: None,
        source_text: None,
        dirty: false,
    }
}

fn apply_field(task: &mut Task, key: &str, value: &str, line_no: usize, issues: &mut Vec<ParseIssue>) {
    match key {
        "due" => task.due = parse_date_field(key, value, line_no, issues),
        "created" => task.created = parse_date_field(key, value, line_no, issues),
        "completed" => task.completed = parse_date_field(key, value, line_no, issues),
        "priority" => match Priority::parse(value) {
            Some(p) => task.priority = p,
            None if value.is_empty() => {}
            None => issues.push(ParseIssue::new(
                line_no,
                format!("unknown priority '{}', using medium", value),
            )),
        },
        "status" => match Status::parse(value) {
            Some(s) => task.status = s,
            None if value.is_empty() => {}
            None => issues.push(ParseIssue::new(
                line_no,
                format!("unknown status '{}', using todo", value),
            )),
        },
        "tags" => {
            task.tags.clear();
            for tag in parse_tag_list(value) {
                task.add_tag(&tag);
            }
        }
        _ => task.extra_fields.push((key.to_string(), value.to_string())),
    }
}

fn parse_date_field(
    key: &str,
    value: &str,
    line_no: usize,
    issues: &mut Vec<ParseIssue>,
) -> Option<NaiveDate> {
    if value.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(_) => {
            issues.push(ParseIssue::new(
                line_no,
                format!("invalid {} date '{}'", key, value),
            ));
            None
        }
    }
}

/// Parse `[a, b]` or `a, b` into tag names
pub fn parse_tag_list(value: &str) -> Vec<String> {
    let inner = value.trim();
    let inner = inner
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(inner);
    inner
        .split(',')
        .map(|t| t.trim().trim_start_matches('#').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn trim_blank_edges(lines: &[String]) -> &[String] {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(s), Some(e)) => &lines[s..=e],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(s: &str) -> Vec<String> {
        s.split('\n').map(|l| l.to_string()).collect()
    }

    fn parse_task(s: &str) -> (Task, Vec<ParseIssue>) {
        match parse_block(&lines(s), 0) {
            (LedgerBlock::Task(t), issues) => (t, issues),
            (LedgerBlock::Raw(raw), _) => panic!("expected task, got raw {:?}", raw),
        }
    }

    #[test]
    fn parses_all_known_fields() {
        let (task, issues) = parse_task(
            "### Ship landing page
due: 2025-06-01
priority: high
status: in-progress
tags: [web, launch]
created: 2025-05-20

Talk to design first.
",
        );
        assert!(issues.is_empty());
        assert_eq!(task.title, "Ship landing page");
        assert_eq!(task.due, NaiveDate::from_ymd_opt(2025, 6, 1));
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.status, Status::InProgress);
        assert_eq!(task.tags, vec!["web", "launch"]);
        assert_eq!(task.created, NaiveDate::from_ymd_opt(2025, 5, 20));
        assert_eq!(task.notes, "Talk to design first.");
        assert!(!task.dirty);
    }

    #[test]
    fn unknown_fields_are_kept_in_order() {
        let (task, _) = parse_task("### A\nestimate: 3h\nowner: sam\nstatus: todo");
        assert_eq!(
            task.extra_fields,
            vec![
                ("estimate".to_string(), "3h".to_string()),
                ("owner".to_string(), "sam".to_string())
            ]
        );
    }

    #[test]
    fn bad_values_are_reported_and_defaulted() {
        let (task, issues) = parse_task("### A\ndue: tomorrow\npriority: urgent\nstatus: maybe");
        assert_eq!(task.due, None);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.status, Status::Todo);
        assert_eq!(issues.len(), 3);
        assert_eq!(issues[0].line, 2);
    }

    #[test]
    fn empty_due_is_none_without_issue() {
        let (task, issues) = parse_task("### A\ndue:\nstatus: todo");
        assert_eq!(task.due, None);
        assert!(issues.is_empty());
    }

    #[test]
    fn notes_start_at_first_non_field_line() {
        let (task, _) = parse_task("### A\nstatus: todo\n**Notes:**\n- see https://x.test\n");
        assert_eq!(task.notes, "**Notes:**\n- see https://x.test");
    }

    #[test]
    fn field_lines_in_notes_stay_notes() {
        let (task, _) = parse_task("### A\nstatus: todo\n\nowner: later\n");
        assert!(task.extra_fields.is_empty());
        assert_eq!(task.notes, "owner: later");
    }

    #[test]
    fn blocks_without_heading_are_raw() {
        let (block, issues) = parse_block(&lines("\nsome prose\n"), 4);
        assert!(matches!(block, LedgerBlock::Raw(_)));
        assert!(issues.is_empty());
    }

    #[test]
    fn text_before_heading_still_makes_a_task() {
        let (task, issues) = parse_task("\n<!-- moved from May -->\n\n### Ship\ndue: 2025-06-01\nstatus: todo");
        assert!(issues.is_empty());
        assert_eq!(task.title, "Ship");
        assert_eq!(task.due, NaiveDate::from_ymd_opt(2025, 6, 1));
        assert_eq!(task.leading, vec!["<!-- moved from May -->"]);
    }

    #[test]
    fn empty_heading_is_an_issue() {
        let (block, issues) = parse_block(&lines("###\nstatus: todo"), 0);
        assert!(matches!(block, LedgerBlock::Raw(_)));
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn tag_lists() {
        assert_eq!(parse_tag_list("[a, b ,#c]"), vec!["a", "b", "c"]);
        assert_eq!(parse_tag_list("a, b"), vec!["a", "b"]);
        assert!(parse_tag_list("[]").is_empty());
    }

    #[test]
    fn field_line_shapes() {
        assert_eq!(field_line("due: 2025-01-01"), Some(("due", "2025-01-01")));
        assert_eq!(field_line("Note: hi"), None);
        assert_eq!(field_line("https://example.com"), None);
        assert_eq!(field_line("no colon here"), None);
    }
}
