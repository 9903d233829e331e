use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::parse::span::SourceSpan;

/// Task priority (`priority:` field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Priority> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" | "med" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task status (`status:` field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Blocked,
    Done,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in-progress",
            Status::Blocked => "blocked",
            Status::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" => Some(Status::Todo),
            "in-progress" | "in_progress" | "inprogress" => Some(Status::InProgress),
            "blocked" => Some(Status::Blocked),
            "done" => Some(Status::Done),
            _ => None,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task block from a monthly ledger, with source tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Title from the `### ` line; the matching key within a project
    pub title: String,
    pub due: Option<NaiveDate>,
    pub priority: Priority,
    pub status: Status,
    /// Tags without brackets, de-duplicated
    pub tags: Vec<String>,
    pub created: Option<NaiveDate>,
    pub completed: Option<NaiveDate>,
    /// `key: value` lines the parser does not know, kept in order
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub extra_fields: Vec<(String, String)>,
    /// Free text after the fields, opaque to the engine
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub notes: String,

    /// Lines typed above the `### ` heading inside the block (comments, a
    /// moved-from marker), re-emitted before it
    #[serde(skip)]
    pub leading: Vec<String>,

    // --- Source tracking ---
    /// Line range of the block in the original file
    #[serde(skip)]
    pub span: Option<SourceSpan>,
    /// The original lines of the block (for verbatim emission)
    #[serde(skip)]
    pub source_text: Option<Vec<String>>,
    /// Whether this task has been modified since parsing
    #[serde(skip)]
    pub dirty: bool,
}

impl Task {
    /// Create a new todo task, marked dirty (no source)
    pub fn new(title: impl Into<String>, created: NaiveDate) -> Self {
        Task {
            title: title.into(),
            due: None,
            priority: Priority::Medium,
            status: Status::Todo,
            tags: Vec::new(),
            created: Some(created),
            completed: None,
            extra_fields: Vec::new(),
            notes: String::new(),
            leading: Vec::new(),
            span: None,
            source_text: None,
            dirty: true,
        }
    }

    /// Mark this task as dirty (will be serialized in canonical format)
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_done(&self) -> bool {
        self.status == Status::Done
    }

    /// Case-insensitive title match, the identity rule within a project
    pub fn matches_title(&self, title: &str) -> bool {
        titles_match(&self.title, title)
    }

    /// Add a tag if it is not already present
    pub fn add_tag(&mut self, tag: &str) {
        let tag = tag.trim();
        if !tag.is_empty() && !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }
}

/// Title comparison used everywhere tasks are matched
pub fn titles_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        let mut a = self.tags.clone();
        let mut b = other.tags.clone();
        a.sort();
        b.sort();
        self.title == other.title
            && self.due == other.due
            && self.priority == other.priority
            && self.status == other.status
            && a == b
            && self.created == other.created
            && self.completed == other.completed
            && self.extra_fields == other.extra_fields
            && self.notes == other.notes
    }
}

impl Eq for Task {}
