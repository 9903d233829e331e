use crate::model::task::Task;

/// Emit a task block (the lines between its `---` delimiters).
/// Clean tasks come back verbatim; dirty ones in canonical field order.
pub fn serialize_block(task: &Task) -> Vec<String> {
    if !task.dirty
        && let Some(source) = &task.source_text
    {
        return source.clone();
    }
    canonical_block(task)
}

fn canonical_block(task: &Task) -> Vec<String> {
    let mut lines = task.leading.clone();
    lines.push(format!("### {}", task.title));
    lines.push(match task.due {
        Some(d) => format!("due: {}", d.format("%Y-%m-%d")),
        None => "due:".to_string(),
    });
    lines.push(format!("priority: {}", task.priority));
    lines.push(format!("status: {}", task.status));
    lines.push(format!("tags: [{}]", task.tags.join(", ")));
    if let Some(created) = task.created {
        lines.push(format!("created: {}", created.format("%Y-%m-%d")));
    }
    if let Some(completed) = task.completed {
        lines.push(format!("completed: {}", completed.format("%Y-%m-%d")));
    }
    for (key, value) in &task.extra_fields {
        if value.is_empty() {
            lines.push(format!("{}:", key));
        } else {
            lines.push(format!("{}: {}", key, value));
        }
    }
    lines.push(String::new());
    if !task.notes.is_empty() {
        lines.extend(task.notes.split('\n').map(|l| l.to_string()));
        lines.push(String::new());
    }
    lines
}
