pub mod cache;
pub mod error;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use chrono::{Local, NaiveDate};
use tower_http::cors::CorsLayer;

use crate::llm::TextModel;
use crate::ops::summary::DailySummary;
use crate::sync::Workspace;
use cache::TtlCache;

pub use error::ApiError;

/// Generated summaries are reused for the same date within this window
pub const SUMMARY_TTL: Duration = Duration::from_secs(60 * 60);

/// Source of "today" for every request
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub workspace: Workspace,
    pub model: Option<Arc<dyn TextModel>>,
    pub summaries: Arc<TtlCache<NaiveDate, DailySummary>>,
    clock: Clock,
}

impl AppState {
    pub fn new(workspace: Workspace, model: Option<Arc<dyn TextModel>>) -> Self {
        AppState {
            workspace,
            model,
            summaries: Arc::new(TtlCache::new(SUMMARY_TTL)),
            clock: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Replace the local-date clock, e.g. with a fixed day in tests
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/files/tree", get(handlers::files_tree))
        .route("/files/read", get(handlers::files_read))
        .route("/files/write", post(handlers::files_write))
        .route("/files/create", post(handlers::files_create))
        .route("/files/delete", post(handlers::files_delete))
        .route("/files/rename", post(handlers::files_rename))
        .route("/files/mkdir", post(handlers::files_mkdir))
        .route("/files/ensure-capture-files", post(handlers::ensure_capture_files))
        .route("/dashboard", get(handlers::dashboard))
        .route("/daily/ensure", get(handlers::daily_ensure))
        .route("/tasks/create", post(handlers::tasks_create))
        .route("/tasks/done", post(handlers::tasks_done))
        .route("/tasks/reschedule", post(handlers::tasks_reschedule))
        .route("/projects/create", post(handlers::projects_create))
        .route("/ai/search", post(handlers::ai_search))
        .route("/ai/daily-summary", post(handlers::ai_daily_summary))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `host:port` and serve until Ctrl-C
pub async fn serve(state: AppState, host: &str, port: u16) -> std::io::Result<()> {
    let root = state.workspace.root().to_path_buf();
    let app = router(state);
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!(addr = %listener.local_addr()?, root = %root.display(), "daybook listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
}
