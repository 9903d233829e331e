use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::io::file_store::{FileStore, WriteOutcome};
use crate::io::layout::{CAPTURE_FILE, DataLayout, INBOX_FILE};
use crate::io::ledger_io::LedgerError;
use crate::model::config::Config;
use crate::model::ledger::Month;
use crate::model::task::Priority;
use crate::ops::capture_ops::CAPTURE_TEMPLATE;
use crate::ops::daily_ops;
use crate::ops::dashboard::{Dashboard, aggregate};
use crate::ops::inbox_ops::inbox_template;
use crate::ops::ledger_ops::{self, CompleteOutcome, new_task};
use crate::ops::project_ops::{CreatedProject, NewProject, create_project};
use crate::sync::engine::{SyncEngine, SyncError, SyncReport};
use crate::sync::event::ChangeEvent;
use crate::sync::inference::ProjectInferrer;
use crate::sync::policy::Policy;

/// Result of saving a file through the workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved {
        modified: DateTime<Utc>,
        /// Final text on disk; differs from the input when the engine rewrote it
        content: String,
        event: ChangeEvent,
        report: SyncReport,
    },
    Conflict {
        current_content: String,
        modified: DateTime<Utc>,
    },
}

/// A task to add through the API or CLI
#[derive(Debug, Clone, Default)]
pub struct NewTaskRequest {
    pub title: String,
    pub project: String,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub due: Option<NaiveDate>,
}

/// The data directory with its file store and sync engine.
///
/// Every mutation goes through here so that dependent files (today's daily
/// view) follow the ledgers.
#[derive(Clone)]
pub struct Workspace {
    store: FileStore,
    engine: SyncEngine,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, policy: Policy, inferrer: Arc<dyn ProjectInferrer>) -> Self {
        let root = root.into();
        Workspace {
            store: FileStore::new(root.clone()),
            engine: SyncEngine::new(DataLayout::new(root), policy, inferrer),
        }
    }

    pub fn open(root: &Path, config: &Config, inferrer: Arc<dyn ProjectInferrer>) -> Self {
        Workspace::new(root, Policy::from(&config.sync), inferrer)
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn layout(&self) -> &DataLayout {
        self.engine.layout()
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    // -----------------------------------------------------------------------
    // Saving files
    // -----------------------------------------------------------------------

    /// Conflict check, then prepare, write and propagate.
    ///
    /// Propagation failures are logged and reported as warnings; they never
    /// fail a save whose file was written.
    pub fn save(
        &self,
        rel: &str,
        content: &str,
        expected: Option<DateTime<Utc>>,
        today: NaiveDate,
    ) -> Result<SaveOutcome, SyncError> {
        self.store.resolve(rel)?;
        if let Some(WriteOutcome::Conflict {
            current_content,
            modified,
        }) = self.store.detect_conflict(rel, expected)?
        {
            return Ok(SaveOutcome::Conflict {
                current_content,
                modified,
            });
        }

        let event = ChangeEvent::classify(rel);
        let prepared = self.engine.prepare(&event, content, today);
        let modified = self.store.write_unchecked(rel, &prepared.content)?;
        tracing::debug!(path = rel, %event, "file saved");

        let report = match self
            .engine
            .propagate(&event, &prepared.content, prepared.report.clone(), today)
        {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(path = rel, error = %e, "propagation failed after save");
                let mut report = prepared.report;
                report.warnings.push(format!("propagation failed: {e}"));
                report
            }
        };

        Ok(SaveOutcome::Saved {
            modified,
            content: prepared.content,
            event,
            report,
        })
    }

    /// Run propagation for a file edited outside the editor
    pub fn sync_file(&self, rel: &str, today: NaiveDate) -> Result<SaveOutcome, SyncError> {
        let current = self.store.read(rel)?;
        self.save(rel, &current.content, None, today)
    }

    /// Create `inbox.md` and `tasks.md` from templates when missing.
    /// Returns the names created.
    pub fn ensure_capture_files(&self, today: NaiveDate) -> Result<Vec<String>, SyncError> {
        let mut created = Vec::new();
        let inbox = inbox_template(today);
        for (name, template) in [(INBOX_FILE, inbox.as_str()), (CAPTURE_FILE, CAPTURE_TEMPLATE)] {
            if self.store.exists(name)? {
                continue;
            }
            self.store.create_file(name, template)?;
            tracing::info!(file = name, "capture file created");
            created.push(name.to_string());
        }
        Ok(created)
    }

    // -----------------------------------------------------------------------
    // Daily view and dashboard
    // -----------------------------------------------------------------------

    /// Generate the daily file for `date` if it is missing
    pub fn ensure_daily(&self, date: NaiveDate) -> Result<bool, SyncError> {
        Ok(daily_ops::ensure_daily(self.layout(), date)?)
    }

    /// Regenerate the daily file for `date`, keeping its notes
    pub fn generate_daily(&self, date: NaiveDate) -> Result<PathBuf, SyncError> {
        Ok(daily_ops::generate_daily(self.layout(), date)?)
    }

    pub fn dashboard(&self, today: NaiveDate) -> Result<Dashboard, SyncError> {
        Ok(aggregate(self.layout(), today)?)
    }

    // -----------------------------------------------------------------------
    // Task and project mutations
    // -----------------------------------------------------------------------

    /// Add a task to the ledger of its due month (else `today`'s month).
    /// A title the project already has is an error.
    pub fn create_task(&self, request: &NewTaskRequest, today: NaiveDate) -> Result<PathBuf, SyncError> {
        let mut task = new_task(&request.title, request.due, today);
        if let Some(priority) = request.priority {
            task.priority = priority;
        }
        for tag in &request.tags {
            task.add_tag(tag);
        }
        let month = Month::of(request.due.unwrap_or(today));
        let path = ledger_ops::create_task(self.layout(), &request.project, task, month)?;
        self.ledger_changed(&request.project, month, today);
        Ok(path)
    }

    /// Complete a task wherever it lives in the project, stamped `today`
    pub fn complete_task(&self, project: &str, title: &str, today: NaiveDate) -> Result<CompleteOutcome, SyncError> {
        let outcome = ledger_ops::complete_task(self.layout(), project, title, today)?;
        if let CompleteOutcome::Completed { month } = outcome {
            self.ledger_changed(project, month, today);
        }
        Ok(outcome)
    }

    /// Set a task's due date. Returns the previous one.
    pub fn reschedule_task(
        &self,
        project: &str,
        title: &str,
        due: NaiveDate,
        today: NaiveDate,
    ) -> Result<Option<NaiveDate>, SyncError> {
        let location = ledger_ops::find_task(self.layout(), project, title)?.ok_or_else(|| {
            LedgerError::TaskNotFound {
                project: project.to_string(),
                title: title.to_string(),
            }
        })?;
        let previous = ledger_ops::reschedule_task(self.layout(), project, title, due)?;
        tracing::info!(project, title, due = %due, "task rescheduled");
        self.ledger_changed(project, location.month, today);
        Ok(previous)
    }

    pub fn create_project(&self, project: &NewProject, today: NaiveDate) -> Result<CreatedProject, SyncError> {
        Ok(create_project(self.layout(), project, today)?)
    }

    fn ledger_changed(&self, project: &str, month: Month, today: NaiveDate) {
        let event = ChangeEvent::Ledger {
            project: project.to_string(),
            month,
        };
        if let Err(e) = self.engine.propagate(&event, "", SyncReport::default(), today) {
            tracing::warn!(%event, error = %e, "could not refresh daily file");
        }
    }
}
