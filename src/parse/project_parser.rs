use chrono::NaiveDate;

use crate::model::project::{Milestone, ProjectSummary, TargetDate};
use crate::parse::daily_parser::parse_checkbox_line;

/// Parse a PROJECT.md. Missing pieces are simply absent.
pub fn parse_project_summary(key: &str, source: &str) -> ProjectSummary {
    let lines: Vec<&str> = source.split('\n').collect();
    let mut summary = ProjectSummary {
        key: key.to_string(),
        name: title_case_key(key),
        status: None,
        target_date: None,
        goal: None,
        milestones: Vec::new(),
    };

    let mut idx = 0;
    // Front matter: the first `---` ... `---` pair before any heading
    while idx < lines.len() && !lines[idx].starts_with('#') {
        if lines[idx].trim() == "---" {
            idx += 1;
            while idx < lines.len() && lines[idx].trim() != "---" {
                if let Some((k, v)) = lines[idx].split_once(':') {
                    let v = v.trim();
                    match k.trim() {
                        "status" if !v.is_empty() => summary.status = Some(v.to_string()),
                        "target-date" => summary.target_date = parse_target_date(v),
                        _ => {}
                    }
                }
                idx += 1;
            }
            idx += 1;
            break;
        }
        idx += 1;
    }

    let mut section = String::new();
    let mut goal_lines: Vec<&str> = Vec::new();
    let mut named = false;
    for line in lines.iter().skip(idx.min(lines.len())) {
        if let Some(name) = line.strip_prefix("## ") {
            section = name.trim().to_lowercase();
            continue;
        }
        if !named && let Some(name) = line.strip_prefix("# ") {
            let name = name.trim();
            if !name.is_empty() {
                summary.name = name.to_string();
            }
            named = true;
            continue;
        }
        match section.as_str() {
            "goal" => goal_lines.push(*line),
            "milestones" => {
                if let Some((done, text, _)) = parse_checkbox_line(line.trim_end()) {
                    summary.milestones.push(Milestone { done, text });
                }
            }
            _ => {}
        }
    }

    let goal = goal_lines.join("\n").trim().to_string();
    if !goal.is_empty() {
        summary.goal = Some(goal);
    }
    summary
}

fn parse_target_date(value: &str) -> Option<TargetDate> {
    if value.eq_ignore_ascii_case("ongoing") {
        return Some(TargetDate::Ongoing);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(TargetDate::Date)
}

/// `launch-site` -> `Launch Site`, the display name when PROJECT.md has none
pub fn title_case_key(key: &str) -> String {
    key.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of a new PROJECT.md
pub fn render_project_summary(name: &str, goal: Option<&str>, target: &TargetDate) -> String {
    let goal = goal
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .unwrap_or("Define what success looks like for this project");
    format!(
        "<!-- Overall progress for this project. Monthly task files live in tasks/. -->

---
type: project
status: active
target-date: {target}
---

# {name}

## Goal
{goal}

## Milestones
- [ ] First milestone

## Progress
Tasks: 0/0 complete (0%)

## Key Context
Important details about this project

## Notes
Running notes and updates
"
    )
}
