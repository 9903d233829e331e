use chrono::NaiveDate;
use serde::Serialize;

/// A pending line in tasks.md: `- [ ] title | YYYY-MM-DD | project`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureEntry {
    /// 0-based index into the file's lines
    pub index: usize,
    pub title: String,
    pub due: Option<NaiveDate>,
    /// Explicit project as typed, before normalization
    pub project: Option<String>,
}

/// A capture entry that has been given a ledger home
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Promotion {
    pub title: String,
    pub project: String,
    pub due: Option<NaiveDate>,
    /// False when the project already had a task with this title
    pub inserted: bool,
}

/// A dated section of inbox.md (`## YYYY-MM-DD`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxSection {
    pub date: NaiveDate,
    /// 0-based line range, heading included
    pub start: usize,
    pub end: usize,
}
