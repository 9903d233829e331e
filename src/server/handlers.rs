use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use super::AppState;
use super::error::{ApiError, ApiJson};
use crate::io::layout::daily_rel_path;
use crate::model::task::Priority;
use crate::ops::dashboard::Dashboard;
use crate::ops::ledger_ops::CompleteOutcome;
use crate::ops::project_ops::{NewProject, parse_target_date};
use crate::ops::{search, summary};
use crate::sync::workspace::{NewTaskRequest, SaveOutcome};

type ApiResult<T = Value> = Result<Json<T>, ApiError>;

/// Run blocking file or network work off the async workers
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

/// A required, non-blank string field
fn required(value: Option<String>, what: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{what} is required")))
}

fn parse_date(value: &str, what: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request(format!("invalid {what}: expected YYYY-MM-DD")))
}

/// An optional date where blank means none
fn optional_date(value: Option<String>, what: &str) -> Result<Option<NaiveDate>, ApiError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_date(v, what).map(Some),
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PathBody {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteBody {
    path: Option<String>,
    content: Option<String>,
    last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
    path: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameBody {
    old_path: Option<String>,
    new_path: Option<String>,
}

pub async fn files_tree(State(state): State<AppState>) -> ApiResult {
    blocking(move || {
        let tree = state.workspace.store().list_tree()?;
        Ok(Json(json!(tree)))
    })
    .await
}

pub async fn files_read(State(state): State<AppState>, Query(query): Query<PathQuery>) -> ApiResult {
    let path = required(query.path, "path")?;
    blocking(move || {
        let file = state.workspace.store().read(&path)?;
        Ok(Json(json!({
            "content": file.content,
            "path": path,
            "stats": { "size": file.size, "modified": file.modified },
        })))
    })
    .await
}

pub async fn files_write(State(state): State<AppState>, ApiJson(body): ApiJson<WriteBody>) -> ApiResult {
    let path = required(body.path, "path")?;
    let content = body
        .content
        .ok_or_else(|| ApiError::bad_request("content is required"))?;
    let today = state.today();
    blocking(move || {
        match state
            .workspace
            .save(&path, &content, body.last_modified, today)?
        {
            SaveOutcome::Saved {
                modified,
                content,
                report,
                ..
            } => Ok(Json(json!({
                "success": true,
                "modified": modified,
                "conflict": false,
                "content": content,
                "sync": report,
            }))),
            SaveOutcome::Conflict {
                current_content,
                modified,
            } => Err(ApiError::Conflict {
                current_content,
                modified,
            }),
        }
    })
    .await
}

pub async fn files_create(State(state): State<AppState>, ApiJson(body): ApiJson<CreateBody>) -> ApiResult {
    let path = required(body.path, "path")?;
    let kind = body.kind.unwrap_or_else(|| "file".to_string());
    blocking(move || {
        let store = state.workspace.store();
        match kind.as_str() {
            "directory" => store.create_dir(&path)?,
            "file" => {
                store.create_file(&path, body.content.as_deref().unwrap_or(""))?;
            }
            other => return Err(ApiError::bad_request(format!("unknown type: {other}"))),
        }
        tracing::info!(path = %path, kind = %kind, "created");
        Ok(Json(json!({ "success": true, "path": path })))
    })
    .await
}

pub async fn files_delete(State(state): State<AppState>, ApiJson(body): ApiJson<PathBody>) -> ApiResult {
    let path = required(body.path, "path")?;
    blocking(move || {
        state.workspace.store().delete(&path)?;
        tracing::info!(path = %path, "deleted");
        Ok(Json(json!({ "success": true })))
    })
    .await
}

pub async fn files_rename(State(state): State<AppState>, ApiJson(body): ApiJson<RenameBody>) -> ApiResult {
    let old_path = required(body.old_path, "oldPath")?;
    let new_path = required(body.new_path, "newPath")?;
    blocking(move || {
        state.workspace.store().rename(&old_path, &new_path)?;
        tracing::info!(from = %old_path, to = %new_path, "renamed");
        Ok(Json(json!({ "success": true, "path": new_path })))
    })
    .await
}

pub async fn files_mkdir(State(state): State<AppState>, ApiJson(body): ApiJson<PathBody>) -> ApiResult {
    let path = required(body.path, "path")?;
    blocking(move || {
        state.workspace.store().create_dir(&path)?;
        Ok(Json(json!({ "success": true, "path": path })))
    })
    .await
}

pub async fn ensure_capture_files(State(state): State<AppState>) -> ApiResult {
    let today = state.today();
    blocking(move || {
        let created = state.workspace.ensure_capture_files(today)?;
        Ok(Json(json!({ "success": true, "created": created })))
    })
    .await
}

// ---------------------------------------------------------------------------
// Dashboard and daily view
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    date: Option<String>,
}

pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Dashboard> {
    let today = state.today();
    blocking(move || Ok(Json(state.workspace.dashboard(today)?))).await
}

pub async fn daily_ensure(State(state): State<AppState>, Query(query): Query<DateQuery>) -> ApiResult {
    let date = optional_date(query.date, "date")?.unwrap_or_else(|| state.today());
    blocking(move || {
        let generated = state.workspace.ensure_daily(date)?;
        Ok(Json(json!({
            "success": true,
            "generated": generated,
            "filePath": daily_rel_path(date),
            "date": date,
        })))
    })
    .await
}

// ---------------------------------------------------------------------------
// Tasks and projects
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskBody {
    title: Option<String>,
    project_name: Option<String>,
    priority: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    due: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoneBody {
    task_title: Option<String>,
    project_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleBody {
    task_title: Option<String>,
    project: Option<String>,
    new_due_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectBody {
    project_key: Option<String>,
    project_name: Option<String>,
    goal: Option<String>,
    target_date: Option<String>,
}

pub async fn tasks_create(State(state): State<AppState>, ApiJson(body): ApiJson<CreateTaskBody>) -> ApiResult {
    let title = required(body.title, "title")?;
    let project = required(body.project_name, "projectName")?;
    let priority = match body.priority.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(p) => Some(Priority::parse(p).ok_or_else(|| ApiError::bad_request(format!("invalid priority: {p}")))?),
    };
    let request = NewTaskRequest {
        title,
        project,
        priority,
        tags: body.tags,
        due: optional_date(body.due, "due date")?,
    };
    let today = state.today();
    blocking(move || {
        state.workspace.create_task(&request, today)?;
        Ok(Json(json!({ "success": true, "message": "Task created" })))
    })
    .await
}

pub async fn tasks_done(State(state): State<AppState>, ApiJson(body): ApiJson<DoneBody>) -> ApiResult {
    let title = required(body.task_title, "taskTitle")?;
    let project = required(body.project_name, "projectName")?;
    let today = state.today();
    blocking(move || {
        let message = match state.workspace.complete_task(&project, &title, today)? {
            CompleteOutcome::Completed { .. } => "Task marked as done",
            CompleteOutcome::AlreadyDone { .. } => "Task was already done",
        };
        Ok(Json(json!({ "success": true, "message": message })))
    })
    .await
}

pub async fn tasks_reschedule(State(state): State<AppState>, ApiJson(body): ApiJson<RescheduleBody>) -> ApiResult {
    let title = required(body.task_title, "taskTitle")?;
    let project = required(body.project, "project")?;
    let due = parse_date(&required(body.new_due_date, "newDueDate")?, "newDueDate")?;
    let today = state.today();
    blocking(move || {
        let previous = state.workspace.reschedule_task(&project, &title, due, today)?;
        Ok(Json(json!({
            "success": true,
            "message": "Task rescheduled",
            "previousDue": previous,
        })))
    })
    .await
}

pub async fn projects_create(State(state): State<AppState>, ApiJson(body): ApiJson<CreateProjectBody>) -> ApiResult {
    let key = required(body.project_key, "projectKey")?;
    let name = required(body.project_name, "projectName")?;
    let target = parse_target_date(body.target_date.as_deref())
        .ok_or_else(|| ApiError::bad_request("targetDate must be YYYY-MM-DD or 'ongoing'"))?;
    let project = NewProject {
        key,
        name: Some(name),
        goal: body.goal.filter(|g| !g.trim().is_empty()),
        target,
    };
    let today = state.today();
    blocking(move || {
        let created = state.workspace.create_project(&project, today)?;
        Ok(Json(json!({
            "success": true,
            "message": "Project created",
            "projectKey": created.key,
            "projectPath": format!("projects/{}", created.key),
        })))
    })
    .await
}

// ---------------------------------------------------------------------------
// Assistant
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    query: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryBody {
    #[serde(default)]
    refresh: bool,
}

pub async fn ai_search(State(state): State<AppState>, ApiJson(body): ApiJson<SearchBody>) -> ApiResult {
    let query = required(body.query, "query")?;
    blocking(move || {
        let answer = search::search(state.workspace.root(), &query, state.model.as_deref());
        Ok(Json(json!({
            "success": true,
            "answer": answer.answer,
            "results": answer.results,
            "query": answer.query,
        })))
    })
    .await
}

/// The body is optional; an empty one means `{ "refresh": false }`
pub async fn ai_daily_summary(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let body: SummaryBody = if body.iter().all(u8::is_ascii_whitespace) {
        SummaryBody::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(format!("invalid JSON body: {e}")))?
    };
    let today = state.today();

    if !body.refresh
        && let Some(cached) = state.summaries.get(&today)
    {
        return Ok(Json(json!({ "success": true, "summary": cached, "cached": true })));
    }

    blocking(move || {
        let built = summary::build_summary(state.workspace.layout(), today, state.model.as_deref())?;
        state.summaries.insert(today, built.clone());
        Ok(Json(json!({ "success": true, "summary": built, "cached": false })))
    })
    .await
}
