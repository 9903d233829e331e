use chrono::NaiveDate;
use serde::Serialize;

/// `target-date:` value from PROJECT.md front matter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TargetDate {
    Date(NaiveDate),
    Ongoing,
}

impl std::fmt::Display for TargetDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetDate::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            TargetDate::Ongoing => write!(f, "ongoing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub done: bool,
    pub text: String,
}

/// The parsed PROJECT.md of a project directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub key: String,
    /// From the `# ` line, falling back to the key
    pub name: String,
    pub status: Option<String>,
    pub target_date: Option<TargetDate>,
    pub goal: Option<String>,
    pub milestones: Vec<Milestone>,
}
