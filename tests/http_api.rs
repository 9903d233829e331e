use std::fs::{self, OpenOptions};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use daybook::server::{AppState, router};
use daybook::sync::{NoInference, Policy, Workspace};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const TODAY: &str = "2025-06-01";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

fn app(tmp: &TempDir) -> Router {
    let workspace = Workspace::new(tmp.path(), Policy::default(), Arc::new(NoInference));
    router(AppState::new(workspace, None).with_clock(today))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().method("GET").uri(uri).body(Body::empty()).expect("request");
    send(app, request).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    send(app, request).await
}

async fn create_launch(app: &Router) {
    let (status, body) = post(
        app,
        "/projects/create",
        json!({ "projectKey": "launch", "projectName": "Launch" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

// ============================================================================
// Files
// ============================================================================

#[tokio::test]
async fn health_is_ok() {
    let tmp = TempDir::new().unwrap();
    let (status, body) = get(&app(&tmp), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn capture_write_echoes_promoted_content() {
    let tmp = TempDir::new().unwrap();
    let app = app(&tmp);

    let (status, body) = post(
        &app,
        "/files/write",
        json!({ "path": "tasks.md", "content": "- [ ] Ship landing page | 2025-06-01 | launch\n" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["conflict"], json!(false));
    assert_eq!(
        body["content"],
        json!("- [x] ~~Ship landing page | 2025-06-01 | launch~~ (added to launch)\n")
    );

    let (status, read) = get(&app, "/files/read?path=tasks.md").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["content"], body["content"]);
    assert_eq!(read["path"], json!("tasks.md"));
    assert_eq!(read["stats"]["modified"], body["modified"]);
    assert!(read["stats"]["size"].as_u64().unwrap() > 0);
    assert!(tmp.path().join("projects/launch/tasks/2025-06.md").exists());
}

#[tokio::test]
async fn stale_write_is_a_409_with_current_content() {
    let tmp = TempDir::new().unwrap();
    let app = app(&tmp);
    let (_, first) = post(&app, "/files/write", json!({ "path": "ideas/plan.md", "content": "v1\n" })).await;
    let modified = first["modified"].clone();

    let path = tmp.path().join("ideas/plan.md");
    fs::write(&path, "theirs\n").unwrap();
    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(5)).unwrap();
    drop(file);

    let (status, body) = post(
        &app,
        "/files/write",
        json!({ "path": "ideas/plan.md", "content": "mine\n", "lastModified": modified }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["conflict"], json!(true));
    assert_eq!(body["currentContent"], json!("theirs\n"));
    assert!(body["error"].is_string());
    assert_eq!(fs::read_to_string(&path).unwrap(), "theirs\n");
}

#[tokio::test]
async fn unsafe_and_missing_paths() {
    let tmp = TempDir::new().unwrap();
    let app = app(&tmp);
    fs::write(tmp.path().join("daybook.toml"), "[server]\n").unwrap();

    let (status, _) = get(&app, "/files/read?path=../etc/passwd").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = get(&app, "/files/read?path=daybook.toml").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = get(&app, "/files/read?path=nope.md").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
    let (status, _) = get(&app, "/files/read").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn task_endpoints_reject_project_keys_outside_the_data_dir() {
    let outer = TempDir::new().unwrap();
    let data = outer.path().join("data");
    fs::create_dir_all(data.join("projects")).unwrap();
    let ledger = "# Outside - June 2025\n\n## Active Tasks\n\n---\n### Secret\ndue: 2025-06-01\nstatus: todo\n\n---\n## Completed Tasks\n\n---\n";
    let outside = outer.path().join("outside/tasks/2025-06.md");
    fs::create_dir_all(outside.parent().unwrap()).unwrap();
    fs::write(&outside, ledger).unwrap();

    let workspace = Workspace::new(&data, Policy::default(), Arc::new(NoInference));
    let app = router(AppState::new(workspace, None).with_clock(today));

    let (status, body) = post(&app, "/tasks/done", json!({ "taskTitle": "Secret", "projectName": "../../outside" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    let (status, _) = post(
        &app,
        "/tasks/reschedule",
        json!({ "taskTitle": "Secret", "project": "../../outside", "newDueDate": "2025-06-09" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = post(&app, "/tasks/create", json!({ "title": "Sneaky", "projectName": "../../outside" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(fs::read_to_string(&outside).unwrap(), ledger);
}

#[tokio::test]
async fn malformed_bodies_get_a_json_400() {
    let tmp = TempDir::new().unwrap();
    let app = app(&tmp);

    let (status, body) = post(
        &app,
        "/files/write",
        json!({ "path": "ideas/plan.md", "content": "x", "lastModified": "yesterday" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid request body"), "{body}");

    let request = Request::builder()
        .method("POST")
        .uri("/tasks/done")
        .body(Body::from("{}"))
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let request = Request::builder()
        .method("POST")
        .uri("/tasks/done")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_rename_delete() {
    let tmp = TempDir::new().unwrap();
    let app = app(&tmp);

    let (status, _) = post(&app, "/files/create", json!({ "path": "ideas/a.md", "type": "file", "content": "hi" })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post(&app, "/files/create", json!({ "path": "ideas/a.md", "type": "file" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = post(&app, "/files/create", json!({ "path": "ideas/sub", "type": "directory" })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(tmp.path().join("ideas/sub").is_dir());
    let (status, _) = post(&app, "/files/mkdir", json!({ "path": "ideas/sub" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(&app, "/files/rename", json!({ "oldPath": "ideas/a.md", "newPath": "ideas/b.md" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fs::read_to_string(tmp.path().join("ideas/b.md")).unwrap(), "hi");
    let (status, _) = post(&app, "/files/rename", json!({ "oldPath": "ideas/a.md", "newPath": "ideas/c.md" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    fs::write(tmp.path().join("README.md"), "keep").unwrap();
    let (status, _) = post(&app, "/files/delete", json!({ "path": "README.md" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = post(&app, "/files/delete", json!({ "path": "ideas" })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!tmp.path().join("ideas").exists());
}

#[tokio::test]
async fn capture_files_and_tree() {
    let tmp = TempDir::new().unwrap();
    let app = app(&tmp);
    fs::create_dir_all(tmp.path().join("projects")).unwrap();
    fs::create_dir_all(tmp.path().join("node_modules")).unwrap();
    fs::write(tmp.path().join("notes.txt"), "hidden at root").unwrap();

    let (status, body) = post(&app, "/files/ensure-capture-files", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], json!(["inbox.md", "tasks.md"]));
    let (_, body) = post(&app, "/files/ensure-capture-files", json!({})).await;
    assert_eq!(body["created"], json!([]));

    let (status, tree) = get(&app, "/files/tree").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = tree
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["tasks.md", "inbox.md", "projects"]);
    assert_eq!(tree[2]["type"], json!("directory"));
}

// ============================================================================
// Tasks, projects and views
// ============================================================================

#[tokio::test]
async fn project_and_task_lifecycle() {
    let tmp = TempDir::new().unwrap();
    let app = app(&tmp);

    let (status, body) = post(
        &app,
        "/projects/create",
        json!({ "projectKey": "launch", "projectName": "Launch", "goal": "Ship v1", "targetDate": "2025-07-01" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["projectKey"], json!("launch"));
    assert_eq!(body["projectPath"], json!("projects/launch"));
    let (status, _) = post(&app, "/projects/create", json!({ "projectKey": "launch", "projectName": "Again" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = post(&app, "/projects/create", json!({ "projectKey": "Bad Key", "projectName": "x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let task = json!({
        "title": "Ship landing page",
        "projectName": "launch",
        "priority": "high",
        "tags": ["web"],
        "due": TODAY,
    });
    let (status, body) = post(&app, "/tasks/create", task.clone()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (status, _) = post(&app, "/tasks/create", task).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = post(&app, "/tasks/create", json!({ "title": "x", "projectName": "launch", "priority": "urgent" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, dashboard) = get(&app, "/dashboard").await;
    assert_eq!(dashboard["date"], json!(TODAY));
    assert_eq!(dashboard["buckets"]["today"][0]["title"], json!("Ship landing page"));
    assert_eq!(dashboard["projects"]["launch"]["name"], json!("Launch"));

    let reschedule = |date: &str| {
        json!({ "taskTitle": "Ship landing page", "project": "launch", "newDueDate": date })
    };
    let (status, _) = post(&app, "/tasks/reschedule", reschedule("06/03/2025")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = post(&app, "/tasks/reschedule", reschedule("2025-06-03")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["previousDue"], json!(TODAY));
    let (status, _) = post(
        &app,
        "/tasks/reschedule",
        json!({ "taskTitle": "Nope", "project": "launch", "newDueDate": "2025-06-03" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, dashboard) = get(&app, "/dashboard").await;
    assert_eq!(dashboard["buckets"]["thisWeek"][0]["title"], json!("Ship landing page"));

    let done = json!({ "taskTitle": "ship landing page", "projectName": "launch" });
    let (status, body) = post(&app, "/tasks/done", done.clone()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], json!("Task marked as done"));
    let (_, body) = post(&app, "/tasks/done", done).await;
    assert_eq!(body["message"], json!("Task was already done"));
    let (status, _) = post(&app, "/tasks/done", json!({ "taskTitle": "Nope", "projectName": "launch" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, dashboard) = get(&app, "/dashboard").await;
    assert_eq!(dashboard["completedThisWeek"][0]["completed"], json!(TODAY));
}

#[tokio::test]
async fn daily_ensure_generates_once() {
    let tmp = TempDir::new().unwrap();
    let app = app(&tmp);
    create_launch(&app).await;
    post(&app, "/tasks/create", json!({ "title": "Write copy", "projectName": "launch", "due": TODAY })).await;

    let (status, body) = get(&app, "/daily/ensure").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generated"], json!(true));
    assert_eq!(body["filePath"], json!("daily/2025-06-01.md"));
    assert_eq!(body["date"], json!(TODAY));
    let daily = fs::read_to_string(tmp.path().join("daily/2025-06-01.md")).unwrap();
    assert!(daily.contains("- [ ] Write copy (launch)"));

    let (_, body) = get(&app, "/daily/ensure?date=2025-06-01").await;
    assert_eq!(body["generated"], json!(false));
    let (status, _) = get(&app, "/daily/ensure?date=tomorrow").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn new_task_refreshes_existing_daily_file() {
    let tmp = TempDir::new().unwrap();
    let app = app(&tmp);
    create_launch(&app).await;
    get(&app, "/daily/ensure").await;

    post(&app, "/tasks/create", json!({ "title": "Call printer", "projectName": "launch", "due": TODAY })).await;
    let daily = fs::read_to_string(tmp.path().join("daily/2025-06-01.md")).unwrap();
    assert!(daily.contains("## Today\n- [ ] Call printer (launch)"), "{daily}");
}

// ============================================================================
// Assistant endpoints without a model
// ============================================================================

#[tokio::test]
async fn search_falls_back_to_a_canned_answer() {
    let tmp = TempDir::new().unwrap();
    let app = app(&tmp);
    create_launch(&app).await;
    post(&app, "/tasks/create", json!({ "title": "Renew the bank card", "projectName": "launch" })).await;

    let (status, _) = post(&app, "/ai/search", json!({ "query": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post(&app, "/ai/search", json!({ "query": "bank card?" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["query"], json!("bank card?"));
    assert!(body["answer"].as_str().unwrap().starts_with("Found matches in 1 file(s)"), "{body}");
    assert_eq!(body["results"][0]["file"], json!("projects/launch/tasks/2025-06.md"));
}

#[tokio::test]
async fn daily_summary_is_cached_per_date() {
    let tmp = TempDir::new().unwrap();
    let app = app(&tmp);

    let request = Request::builder()
        .method("POST")
        .uri("/ai/daily-summary")
        .body(Body::empty())
        .expect("request");
    let (status, first) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["cached"], json!(false));
    assert_eq!(first["summary"]["date"], json!(TODAY));
    assert!(!first["summary"]["narrative"].as_str().unwrap().is_empty());
    assert!(!first["summary"]["quote"].as_str().unwrap().is_empty());

    let (_, second) = post(&app, "/ai/daily-summary", json!({})).await;
    assert_eq!(second["cached"], json!(true));
    assert_eq!(second["summary"], first["summary"]);

    let (_, refreshed) = post(&app, "/ai/daily-summary", json!({ "refresh": true })).await;
    assert_eq!(refreshed["cached"], json!(false));
}
