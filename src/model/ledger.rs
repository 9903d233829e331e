use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::task::Task;

/// A calendar month, the unit a ledger file covers (`YYYY-MM`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Month> {
        if (1..=12).contains(&month) {
            Some(Month { year, month })
        } else {
            None
        }
    }

    /// The month a date falls in
    pub fn of(date: NaiveDate) -> Month {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Human name used in ledger titles, e.g. `June 2025`
    pub fn long_name(&self) -> String {
        match self.first_day() {
            Some(d) => d.format("%B %Y").to_string(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid month '{}': expected YYYY-MM", s))?;
        if y.len() != 4 || m.len() != 2 {
            return Err(format!("invalid month '{}': expected YYYY-MM", s));
        }
        let year: i32 = y.parse().map_err(|_| format!("invalid year in '{}'", s))?;
        let month: u32 = m.parse().map_err(|_| format!("invalid month in '{}'", s))?;
        Month::new(year, month).ok_or_else(|| format!("month out of range in '{}'", s))
    }
}

impl Serialize for Month {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Which task section of a ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Active,
    Completed,
}

impl SectionKind {
    pub fn header(self) -> &'static str {
        match self {
            SectionKind::Active => "## Active Tasks",
            SectionKind::Completed => "## Completed Tasks",
        }
    }

    /// Recognize a section name (text after `## `)
    pub fn from_name(name: &str) -> Option<SectionKind> {
        match name.trim().to_lowercase().as_str() {
            "active tasks" => Some(SectionKind::Active),
            "completed tasks" => Some(SectionKind::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionKind::Active => write!(f, "Active"),
            SectionKind::Completed => write!(f, "Completed"),
        }
    }
}

/// A recoverable problem found while parsing a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseIssue {
    /// 1-based line number
    pub line: usize,
    pub message: String,
}

impl ParseIssue {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        ParseIssue {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// The lines between two `---` delimiters
#[derive(Debug, Clone)]
pub enum LedgerBlock {
    Task(Task),
    /// Anything that is not a task block (blank runs, stray prose,
    /// malformed blocks), emitted verbatim
    Raw(Vec<String>),
}

#[derive(Debug, Clone)]
pub enum SectionItem {
    /// A `---` line (kept verbatim, trailing spaces included)
    Delimiter(String),
    Block(LedgerBlock),
}

/// A content node in the ledger file: a task section or literal text
#[derive(Debug, Clone)]
pub enum LedgerNode {
    Literal(Vec<String>),
    Section {
        kind: SectionKind,
        header_line: String,
        items: Vec<SectionItem>,
    },
}

/// A parsed monthly ledger (`projects/<key>/tasks/YYYY-MM.md`)
#[derive(Debug, Clone)]
pub struct Ledger {
    /// Text of the `# ` line, if any
    pub title: String,
    pub nodes: Vec<LedgerNode>,
    pub issues: Vec<ParseIssue>,
}

impl Ledger {
    fn section_items(&self, kind: SectionKind) -> Option<&Vec<SectionItem>> {
        self.nodes.iter().find_map(|node| match node {
            LedgerNode::Section { kind: k, items, .. } if *k == kind => Some(items),
            _ => None,
        })
    }

    fn section_items_mut(&mut self, kind: SectionKind) -> Option<&mut Vec<SectionItem>> {
        self.nodes.iter_mut().find_map(|node| match node {
            LedgerNode::Section { kind: k, items, .. } if *k == kind => Some(items),
            _ => None,
        })
    }

    pub fn has_section(&self, kind: SectionKind) -> bool {
        self.section_items(kind).is_some()
    }

    /// Tasks of one section, in file order
    pub fn tasks(&self, kind: SectionKind) -> impl Iterator<Item = &Task> {
        self.section_items(kind)
            .into_iter()
            .flatten()
            .filter_map(|item| match item {
                SectionItem::Block(LedgerBlock::Task(t)) => Some(t),
                _ => None,
            })
    }

    pub fn active(&self) -> impl Iterator<Item = &Task> {
        self.tasks(SectionKind::Active)
    }

    pub fn completed(&self) -> impl Iterator<Item = &Task> {
        self.tasks(SectionKind::Completed)
    }

    /// Every task with the section it lives in
    pub fn all_tasks(&self) -> Vec<(SectionKind, &Task)> {
        let mut out: Vec<(SectionKind, &Task)> = self
            .active()
            .map(|t| (SectionKind::Active, t))
            .collect();
        out.extend(self.completed().map(|t| (SectionKind::Completed, t)));
        out
    }

    /// Find a task by title in either section
    pub fn find_task(&self, title: &str) -> Option<(SectionKind, &Task)> {
        self.all_tasks().into_iter().find(|(_, t)| t.matches_title(title))
    }

    pub fn find_task_mut(&mut self, title: &str) -> Option<&mut Task> {
        self.nodes.iter_mut().find_map(|node| match node {
            LedgerNode::Section { items, .. } => items.iter_mut().find_map(|item| match item {
                SectionItem::Block(LedgerBlock::Task(t)) if t.matches_title(title) => Some(t),
                _ => None,
            }),
            LedgerNode::Literal(_) => None,
        })
    }

    /// Ensure a section exists, appending it at the end if missing
    pub fn ensure_section(&mut self, kind: SectionKind) {
        if self.has_section(kind) {
            return;
        }
        let node = LedgerNode::Section {
            kind,
            header_line: kind.header().to_string(),
            items: vec![
                SectionItem::Block(LedgerBlock::Raw(vec![String::new()])),
                SectionItem::Delimiter("---".to_string()),
                SectionItem::Block(LedgerBlock::Raw(vec![String::new()])),
            ],
        };
        match kind {
            SectionKind::Completed => self.nodes.push(node),
            SectionKind::Active => {
                let pos = self
                    .nodes
                    .iter()
                    .position(|n| matches!(n, LedgerNode::Section { kind: SectionKind::Completed, .. }))
                    .unwrap_or(self.nodes.len());
                self.nodes.insert(pos, node);
            }
        }
    }

    /// Insert a task at the top of a section, right after its first `---`
    pub fn insert_task(&mut self, kind: SectionKind, task: Task) {
        self.ensure_section(kind);
        let Some(items) = self.section_items_mut(kind) else {
            return;
        };
        match items.iter().position(|i| matches!(i, SectionItem::Delimiter(_))) {
            Some(pos) => {
                items.insert(pos + 1, SectionItem::Delimiter("---".to_string()));
                items.insert(pos + 1, SectionItem::Block(LedgerBlock::Task(task)));
            }
            None => {
                items.push(SectionItem::Delimiter("---".to_string()));
                items.push(SectionItem::Block(LedgerBlock::Task(task)));
                items.push(SectionItem::Delimiter("---".to_string()));
            }
        }
    }

    /// Remove a task (and one adjoining `---`) from whichever section holds it
    pub fn remove_task(&mut self, title: &str) -> Option<(SectionKind, Task)> {
        for node in &mut self.nodes {
            let LedgerNode::Section { kind, items, .. } = node else {
                continue;
            };
            let Some(idx) = items.iter().position(
                |i| matches!(i, SectionItem::Block(LedgerBlock::Task(t)) if t.matches_title(title)),
            ) else {
                continue;
            };
            let SectionItem::Block(LedgerBlock::Task(task)) = items.remove(idx) else {
                continue;
            };
            if matches!(items.get(idx), Some(SectionItem::Delimiter(_))) {
                items.remove(idx);
            } else if idx > 0 && matches!(items.get(idx - 1), Some(SectionItem::Delimiter(_))) {
                items.remove(idx - 1);
            }
            return Some((*kind, task));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_parses_and_displays() {
        let m: Month = "2025-06".parse().unwrap();
        assert_eq!(m, Month::new(2025, 6).unwrap());
        assert_eq!(m.to_string(), "2025-06");
        assert_eq!(m.long_name(), "June 2025");
        assert!("2025-13".parse::<Month>().is_err());
        assert!("2025-6".parse::<Month>().is_err());
        assert!("notes".parse::<Month>().is_err());
    }

    #[test]
    fn month_of_date() {
        let d = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        assert_eq!(Month::of(d).to_string(), "2025-12");
    }

    #[test]
    fn months_order_chronologically() {
        let a: Month = "2024-12".parse().unwrap();
        let b: Month = "2025-01".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn section_names() {
        assert_eq!(SectionKind::from_name("Active Tasks"), Some(SectionKind::Active));
        assert_eq!(
            SectionKind::from_name(" completed tasks "),
            Some(SectionKind::Completed)
        );
        assert_eq!(SectionKind::from_name("Backlog"), None);
    }
}
