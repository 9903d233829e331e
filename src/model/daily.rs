use chrono::NaiveDate;
use serde::Serialize;

/// Which `## ` section of a daily file a line sits under
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DailySection {
    /// Before any `## ` heading
    Top,
    Overdue,
    Today,
    Notes,
    Other(String),
}

impl DailySection {
    pub fn from_name(name: &str) -> DailySection {
        match name.trim().to_lowercase().as_str() {
            "overdue" => DailySection::Overdue,
            "today" => DailySection::Today,
            "notes" => DailySection::Notes,
            other => DailySection::Other(other.to_string()),
        }
    }
}

/// A checkbox line in a daily file: `- [ ] title (project)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyEntry {
    /// 1-based line number
    pub line: usize,
    pub checked: bool,
    pub title: String,
    /// Parenthesized suffix, if any
    pub project: Option<String>,
    pub section: DailySection,
}

/// A parsed daily file (`daily/YYYY-MM-DD.md`)
#[derive(Debug, Clone, Default)]
pub struct DailyFile {
    pub entries: Vec<DailyEntry>,
    /// Lines after the `## Notes` heading, verbatim
    pub notes: Option<Vec<String>>,
}

impl DailyFile {
    /// Checked entries, candidates for completing ledger tasks
    pub fn checked(&self) -> impl Iterator<Item = &DailyEntry> {
        self.entries.iter().filter(|e| e.checked)
    }

    /// Unchecked entries, candidates for new ledger tasks
    pub fn unchecked(&self) -> impl Iterator<Item = &DailyEntry> {
        self.entries.iter().filter(|e| !e.checked)
    }
}

/// A task due on or before the day a daily file is built for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DueTask {
    pub title: String,
    pub project: String,
    pub due: NaiveDate,
}

/// Ledger tasks bucketed for a daily file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DueBuckets {
    pub overdue: Vec<DueTask>,
    pub today: Vec<DueTask>,
}

impl DueBuckets {
    pub fn is_empty(&self) -> bool {
        self.overdue.is_empty() && self.today.is_empty()
    }
}
