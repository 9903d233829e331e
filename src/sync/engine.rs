use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::io::file_store::StoreError;
use crate::io::layout::DataLayout;
use crate::io::ledger_io::LedgerError;
use crate::model::capture::Promotion;
use crate::model::daily::DailySection;
use crate::model::ledger::Month;
use crate::ops::capture_ops::{ResolvedEntry, apply_promotions, archive_completed};
use crate::ops::daily_ops::refresh_daily;
use crate::ops::inbox_ops::{archive_old_sections, ensure_date_header};
use crate::ops::ledger_ops::{
    CompleteOutcome, InsertOutcome, bump_due, complete_task, insert_task, new_task,
    normalize_project_key,
};
use crate::parse::capture_parser::parse_capture_entries;
use crate::parse::daily_parser::parse_daily;
use crate::sync::event::ChangeEvent;
use crate::sync::inference::{InferenceRequest, ProjectInferrer, resolve_projects};
use crate::sync::policy::Policy;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// What a save did beyond writing the file itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Capture or daily lines given a ledger home
    pub promoted: Vec<Promotion>,
    /// `(project, title)` of tasks moved to Completed
    pub completed: Vec<(String, String)>,
    /// `(project, title)` of tasks whose due date moved later
    pub bumped: Vec<(String, String)>,
    /// Capture lines or inbox sections moved to an archive file
    pub archived: usize,
    /// Whether today's daily file was regenerated
    pub daily_refreshed: bool,
    /// Steps that failed without failing the save
    pub warnings: Vec<String>,
}

impl SyncReport {
    /// Whether any ledger file was written
    pub fn ledgers_changed(&self) -> bool {
        self.promoted.iter().any(|p| p.inserted) || !self.completed.is_empty() || !self.bumped.is_empty()
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Content to write after the engine had its say
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    pub content: String,
    pub report: SyncReport,
}

/// Dispatches propagation by the kind of file that changed.
///
/// Holds no file state between calls: every step rereads what it needs.
#[derive(Clone)]
pub struct SyncEngine {
    layout: DataLayout,
    policy: Policy,
    inferrer: Arc<dyn ProjectInferrer>,
}

impl SyncEngine {
    pub fn new(layout: DataLayout, policy: Policy, inferrer: Arc<dyn ProjectInferrer>) -> Self {
        SyncEngine {
            layout,
            policy,
            inferrer,
        }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    // -----------------------------------------------------------------------
    // Before the write
    // -----------------------------------------------------------------------

    /// Rewrite content that is promoted or archived on save (capture and
    /// inbox files). Other kinds pass through untouched.
    pub fn prepare(&self, event: &ChangeEvent, content: &str, today: NaiveDate) -> Prepared {
        match event {
            ChangeEvent::Capture => self.prepare_capture(content, today),
            ChangeEvent::Inbox => self.prepare_inbox(content, today),
            _ => Prepared {
                content: content.to_string(),
                report: SyncReport::default(),
            },
        }
    }

    fn prepare_capture(&self, content: &str, today: NaiveDate) -> Prepared {
        let mut report = SyncReport::default();
        let entries = parse_capture_entries(content);

        let mut projects: Vec<Option<String>> = Vec::with_capacity(entries.len());
        let mut untagged = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            match entry.project.as_deref() {
                Some(raw) => {
                    let key = normalize_project_key(raw).unwrap_or_else(|| {
                        tracing::debug!(project = raw, "capture project is not a valid key, using fallback");
                        self.policy.fallback_project.clone()
                    });
                    projects.push(Some(key));
                }
                None => {
                    projects.push(None);
                    untagged.push(i);
                }
            }
        }

        if !untagged.is_empty() {
            let titles = untagged.iter().map(|&i| entries[i].title.clone()).collect();
            let inferred = resolve_projects(self.inferrer.as_ref(), &self.inference_request(titles));
            for (&i, project) in untagged.iter().zip(inferred) {
                projects[i] = Some(project);
            }
        }

        let resolved: Vec<ResolvedEntry> = entries
            .into_iter()
            .zip(projects)
            .map(|(entry, project)| ResolvedEntry {
                project: project.unwrap_or_else(|| self.policy.fallback_project.clone()),
                entry,
            })
            .collect();

        let promoted = apply_promotions(&self.layout, content, &resolved, today);
        if promoted.promotions.len() < resolved.len() {
            report.warn(format!(
                "{} capture line(s) could not be promoted and were left in place",
                resolved.len() - promoted.promotions.len()
            ));
        }
        report.promoted = promoted.promotions;

        let content = match archive_completed(
            &self.layout,
            &promoted.content,
            self.policy.capture_archive_threshold,
            self.policy.capture_archive_keep,
            today,
        ) {
            Ok(outcome) => {
                report.archived = outcome.archived;
                outcome.content
            }
            Err(e) => {
                report.warn(format!("capture archiving failed: {e}"));
                promoted.content
            }
        };

        Prepared { content, report }
    }

    fn prepare_inbox(&self, content: &str, today: NaiveDate) -> Prepared {
        let mut report = SyncReport::default();
        let dated = ensure_date_header(content, today);
        let content = match archive_old_sections(&self.layout, &dated, today, self.policy.inbox_retention_days) {
            Ok(outcome) => {
                report.archived = outcome.archived;
                outcome.content
            }
            Err(e) => {
                report.warn(format!("inbox archiving failed: {e}"));
                dated
            }
        };
        Prepared { content, report }
    }

    // -----------------------------------------------------------------------
    // After the write
    // -----------------------------------------------------------------------

    /// Fan a completed write out to the files that depend on it.
    ///
    /// `report` is what `prepare` produced for the same save. A daily file is
    /// never regenerated by its own save; today's daily file is refreshed
    /// (only if it exists) when ledgers changed underneath it.
    pub fn propagate(
        &self,
        event: &ChangeEvent,
        content: &str,
        mut report: SyncReport,
        today: NaiveDate,
    ) -> Result<SyncReport, SyncError> {
        let refresh = match event {
            ChangeEvent::Daily { date } => {
                self.propagate_daily(content, *date, today, &mut report);
                *date != today && report.ledgers_changed()
            }
            ChangeEvent::Ledger { .. } => true,
            ChangeEvent::Capture => report.ledgers_changed(),
            ChangeEvent::Inbox | ChangeEvent::Other { .. } => false,
        };

        if refresh {
            report.daily_refreshed = refresh_daily(&self.layout, today)?;
            if report.daily_refreshed {
                tracing::info!(date = %today, trigger = %event, "daily file refreshed");
            }
        }
        Ok(report)
    }

    fn propagate_daily(&self, content: &str, date: NaiveDate, today: NaiveDate, report: &mut SyncReport) {
        let daily = parse_daily(content);

        // (a) unchecked lines become ledger tasks
        let mut untagged = Vec::new();
        for entry in daily.unchecked() {
            let Some(tag) = entry.project.as_deref() else {
                untagged.push(entry.title.clone());
                continue;
            };
            let Some(project) = normalize_project_key(tag).filter(|k| self.layout.project_exists(k)) else {
                tracing::debug!(project = tag, title = %entry.title, "daily line tagged with unknown project, skipped");
                continue;
            };
            let in_today = entry.section == DailySection::Today;
            self.add_from_daily(&project, &entry.title, date, today, in_today, report);
        }

        if !untagged.is_empty() {
            let request = self.inference_request(untagged.clone());
            let projects = resolve_projects(self.inferrer.as_ref(), &request);
            for (title, project) in untagged.iter().zip(projects) {
                self.add_from_daily(&project, title, date, today, false, report);
            }
        }

        // (b) checked lines with a project complete their task, as of the
        // daily file's own date
        for entry in daily.checked() {
            let Some(tag) = entry.project.as_deref() else {
                continue;
            };
            let Some(project) = normalize_project_key(tag) else {
                continue;
            };
            match complete_task(&self.layout, &project, &entry.title, date) {
                Ok(CompleteOutcome::Completed { .. }) => {
                    report.completed.push((project, entry.title.clone()));
                }
                Ok(CompleteOutcome::AlreadyDone { .. }) => {}
                Err(LedgerError::TaskNotFound { .. }) => {
                    tracing::debug!(project = %project, title = %entry.title, "checked daily line has no ledger task");
                }
                Err(e) => report.warn(format!("could not complete '{}' in {}: {e}", entry.title, project)),
            }
        }
    }

    fn add_from_daily(
        &self,
        project: &str,
        title: &str,
        date: NaiveDate,
        today: NaiveDate,
        in_today: bool,
        report: &mut SyncReport,
    ) {
        let task = new_task(title, Some(date), today);
        match insert_task(&self.layout, project, task, Month::of(date)) {
            Ok(InsertOutcome::Inserted { .. }) => report.promoted.push(Promotion {
                title: title.to_string(),
                project: project.to_string(),
                due: Some(date),
                inserted: true,
            }),
            Ok(InsertOutcome::AlreadyExists { .. }) if in_today => {
                match bump_due(&self.layout, project, title, date) {
                    Ok(true) => report.bumped.push((project.to_string(), title.to_string())),
                    Ok(false) => {}
                    Err(e) => report.warn(format!("could not move due date of '{title}' in {project}: {e}")),
                }
            }
            Ok(InsertOutcome::AlreadyExists { .. }) => {}
            Err(e) => report.warn(format!("could not add '{title}' to {project}: {e}")),
        }
    }

    /// Candidates are every existing project plus the fallback
    fn inference_request(&self, titles: Vec<String>) -> InferenceRequest {
        let fallback = self.policy.fallback_project.clone();
        let mut candidates = self.layout.project_keys();
        if !candidates.contains(&fallback) {
            candidates.push(fallback.clone());
        }
        InferenceRequest {
            titles,
            candidates,
            fallback,
        }
    }
}
