use crate::model::daily::{DailyEntry, DailyFile, DailySection};

/// Parse a daily file into its checkbox entries and notes body.
///
/// Checkbox lines count wherever they are, including under `## Notes`; the
/// notes body is also kept verbatim for regeneration.
pub fn parse_daily(source: &str) -> DailyFile {
    let mut entries = Vec::new();
    let mut notes: Option<Vec<String>> = None;
    let mut section = DailySection::Top;

    for (idx, line) in source.split('\n').enumerate() {
        // Everything below `## Notes` belongs to the user
        if let Some(body) = notes.as_mut() {
            body.push(line.to_string());
        } else if let Some(name) = line.strip_prefix("## ") {
            section = DailySection::from_name(name);
            if section == DailySection::Notes {
                notes = Some(Vec::new());
            }
            continue;
        }
        if let Some((checked, title, project)) = parse_checkbox_line(line) {
            entries.push(DailyEntry {
                line: idx + 1,
                checked,
                title,
                project,
                section: section.clone(),
            });
        }
    }

    DailyFile { entries, notes }
}

/// Parse `- [ ] title (project)` / `- [x] title`. Returns (checked, title, project).
pub fn parse_checkbox_line(line: &str) -> Option<(bool, String, Option<String>)> {
    let rest = line.strip_prefix('-')?;
    let rest = strip_required_whitespace(rest)?;
    let rest = rest.strip_prefix('[')?;
    let (checked, rest) = match rest.chars().next()? {
        ']' => (false, rest),
        ' ' => (false, &rest[1..]),
        'x' | 'X' => (true, &rest[1..]),
        _ => return None,
    };
    let rest = rest.strip_prefix(']')?;
    let rest = strip_required_whitespace(rest)?.trim_end();
    if rest.is_empty() {
        return None;
    }

    if let Some(inner_end) = rest.strip_suffix(')')
        && let Some(open) = inner_end.rfind('(')
    {
        let project = inner_end[open + 1..].trim();
        let title = &inner_end[..open];
        let separated = title.ends_with(char::is_whitespace);
        let title = title.trim();
        if separated && !project.is_empty() && !project.contains(')') && !title.is_empty() {
            return Some((checked, title.to_string(), Some(project.to_string())));
        }
    }
    Some((checked, rest.trim().to_string(), None))
}

fn strip_required_whitespace(s: &str) -> Option<&str> {
    let trimmed = s.trim_start();
    if trimmed.len() == s.len() {
        None
    } else {
        Some(trimmed)
    }
}
