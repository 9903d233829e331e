use chrono::{Duration, NaiveDate};
use indexmap::IndexMap;
use serde::Serialize;

use crate::io::layout::DataLayout;
use crate::io::ledger_io::{LedgerError, load_project_ledgers, project_display_name};
use crate::model::ledger::{Month, SectionKind};
use crate::model::task::{Priority, Status, Task};

/// A task as the dashboard shows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub title: String,
    pub project: String,
    pub due: Option<NaiveDate>,
    pub priority: Priority,
    pub status: Status,
    pub tags: Vec<String>,
    pub created: Option<NaiveDate>,
    pub completed: Option<NaiveDate>,
    pub month: Month,
    pub section: SectionKind,
}

impl TaskView {
    fn new(task: &Task, project: &str, month: Month, section: SectionKind) -> Self {
        TaskView {
            title: task.title.clone(),
            project: project.to_string(),
            due: task.due,
            priority: task.priority,
            status: task.status,
            tags: task.tags.clone(),
            created: task.created,
            completed: task.completed,
            month,
            section,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectView {
    pub name: String,
    pub tasks: Vec<TaskView>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Buckets {
    pub overdue: Vec<TaskView>,
    pub today: Vec<TaskView>,
    /// Due in the next seven days, today excluded
    pub this_week: Vec<TaskView>,
    pub later: Vec<TaskView>,
    pub unscheduled: Vec<TaskView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub date: NaiveDate,
    pub projects: IndexMap<String, ProjectView>,
    pub buckets: Buckets,
    pub completed_this_week: Vec<TaskView>,
}

/// Read-only projection of every ledger for `today`
pub fn aggregate(layout: &DataLayout, today: NaiveDate) -> Result<Dashboard, LedgerError> {
    let week_end = today + Duration::days(7);
    let week_start = today - Duration::days(7);
    let mut projects = IndexMap::new();
    let mut buckets = Buckets::default();
    let mut completed_this_week = Vec::new();

    for key in layout.project_keys() {
        let mut tasks = Vec::new();
        for loaded in load_project_ledgers(layout, &key)? {
            for (section, task) in loaded.ledger.all_tasks() {
                let view = TaskView::new(task, &key, loaded.month, section);
                if task.is_done() {
                    if let Some(done) = task.completed
                        && done >= week_start
                        && done <= today
                    {
                        completed_this_week.push(view.clone());
                    }
                } else {
                    let bucket = match task.due {
                        None => &mut buckets.unscheduled,
                        Some(d) if d < today => &mut buckets.overdue,
                        Some(d) if d == today => &mut buckets.today,
                        Some(d) if d <= week_end => &mut buckets.this_week,
                        Some(_) => &mut buckets.later,
                    };
                    bucket.push(view.clone());
                }
                tasks.push(view);
            }
        }
        if !tasks.is_empty() {
            projects.insert(
                key.clone(),
                ProjectView {
                    name: project_display_name(layout, &key),
                    tasks,
                },
            );
        }
    }

    for bucket in [
        &mut buckets.overdue,
        &mut buckets.today,
        &mut buckets.this_week,
        &mut buckets.later,
    ] {
        bucket.sort_by(|a, b| a.due.cmp(&b.due).then_with(|| a.project.cmp(&b.project)));
    }
    completed_this_week.sort_by(|a, b| b.completed.cmp(&a.completed));

    Ok(Dashboard {
        date: today,
        projects,
        buckets,
        completed_this_week,
    })
}
