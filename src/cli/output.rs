use serde::Serialize;

use crate::ops::dashboard::{Dashboard, TaskView};
use crate::sync::SyncReport;

// ---------------------------------------------------------------------------
// JSON output
// ---------------------------------------------------------------------------

/// Pretty-print any serializable value
pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyJson {
    pub date: String,
    pub file_path: String,
    pub generated: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncJson<'a> {
    pub path: &'a str,
    pub event: String,
    pub report: &'a SyncReport,
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// `[ ] Ship landing page (launch) due 2025-06-01 #web`
pub fn format_task_line(task: &TaskView) -> String {
    let mark = if task.completed.is_some() { 'x' } else { ' ' };
    let mut line = format!("[{}] {} ({})", mark, task.title, task.project);
    if let Some(due) = task.due {
        line.push_str(&format!(" due {due}"));
    }
    for tag in &task.tags {
        line.push_str(&format!(" #{tag}"));
    }
    line
}

pub fn format_dashboard(dashboard: &Dashboard) -> Vec<String> {
    let buckets = &dashboard.buckets;
    let sections: [(&str, &[TaskView]); 6] = [
        ("Overdue", &buckets.overdue),
        ("Today", &buckets.today),
        ("This week", &buckets.this_week),
        ("Later", &buckets.later),
        ("Unscheduled", &buckets.unscheduled),
        ("Completed this week", &dashboard.completed_this_week),
    ];

    let mut lines = vec![format!("Dashboard for {}", dashboard.date)];
    for (heading, tasks) in sections {
        if tasks.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(format!("{} ({})", heading, tasks.len()));
        lines.extend(tasks.iter().map(|t| format!("  {}", format_task_line(t))));
    }
    if lines.len() == 1 {
        lines.push("No tasks yet.".to_string());
    }
    lines
}

pub fn format_sync_report(report: &SyncReport) -> Vec<String> {
    let mut lines = Vec::new();
    for p in &report.promoted {
        let verb = if p.inserted { "added" } else { "already in" };
        lines.push(format!("{} {} {}", p.title, verb, p.project));
    }
    for (project, title) in &report.completed {
        lines.push(format!("completed {title} ({project})"));
    }
    for (project, title) in &report.bumped {
        lines.push(format!("moved up {title} ({project})"));
    }
    if report.archived > 0 {
        lines.push(format!("archived {}", report.archived));
    }
    if report.daily_refreshed {
        lines.push("refreshed today's daily file".to_string());
    }
    for w in &report.warnings {
        lines.push(format!("warning: {w}"));
    }
    if lines.is_empty() {
        lines.push("nothing to do".to_string());
    }
    lines
}
