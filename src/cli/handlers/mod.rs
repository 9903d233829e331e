use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde_json::json;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::{apply_env_overrides, load_config};
use crate::io::layout::daily_rel_path;
use crate::llm::{LlmClient, LlmError, LlmSettings, ModelInferrer, TextModel};
use crate::model::config::Config;
use crate::model::task::Priority;
use crate::ops::ledger_ops::CompleteOutcome;
use crate::ops::project_ops::{NewProject, parse_target_date};
use crate::server::{self, AppState};
use crate::sync::{NewTaskRequest, NoInference, ProjectInferrer, SaveOutcome, Workspace};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Everything a command needs: the data directory, its config and the
/// optional model
struct Context {
    workspace: Workspace,
    config: Config,
    model: Option<Arc<dyn TextModel>>,
    json: bool,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let data_dir = resolve_data_dir(cli.data_dir.as_deref(), std::env::var("DAYBOOK_DATA_DIR").ok())?;
    let mut config = load_config(&data_dir)?;
    apply_env_overrides(&mut config);

    let model = build_model(&config);
    let inferrer: Arc<dyn ProjectInferrer> = match &model {
        Some(model) => Arc::new(ModelInferrer::new(model.clone())),
        None => Arc::new(NoInference),
    };
    let ctx = Context {
        workspace: Workspace::open(&data_dir, &config, inferrer),
        config,
        model,
        json: cli.json,
    };
    tracing::debug!(data_dir = %data_dir.display(), "data directory");

    match cli.command {
        Commands::Serve(args) => cmd_serve(&ctx, args),
        Commands::Daily(args) => cmd_daily(&ctx, args),
        Commands::Sync(args) => cmd_sync(&ctx, args),
        Commands::Dashboard => cmd_dashboard(&ctx),
        Commands::Project(cmd) => match cmd.action {
            ProjectAction::New(args) => cmd_project_new(&ctx, args),
        },
        Commands::Add(args) => cmd_add(&ctx, args),
        Commands::Done(args) => cmd_done(&ctx, args),
        Commands::Reschedule(args) => cmd_reschedule(&ctx, args),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `-C` wins over `DAYBOOK_DATA_DIR`, which wins over the current directory.
/// The directory must exist.
fn resolve_data_dir(flag: Option<&str>, env: Option<String>) -> Result<PathBuf, String> {
    let dir = match flag {
        Some(dir) => PathBuf::from(dir),
        None => match env.filter(|v| !v.trim().is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir().map_err(|e| format!("cannot read current directory: {e}"))?,
        },
    };
    std::fs::canonicalize(&dir).map_err(|e| format!("cannot resolve data directory '{}': {}", dir.display(), e))
}

/// The configured LLM, or None when no key is set. A bad setup is logged,
/// never fatal: every caller has a fallback.
fn build_model(config: &Config) -> Option<Arc<dyn TextModel>> {
    let settings = match LlmSettings::from_env(&config.llm) {
        Ok(settings) => settings,
        Err(LlmError::NotConfigured) => {
            tracing::debug!("no LLM key set, assistant features use fallbacks");
            return None;
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM settings rejected");
            return None;
        }
    };
    match LlmClient::new(settings) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!(error = %e, "could not build LLM client");
            None
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| format!("invalid date '{value}', expected YYYY-MM-DD"))
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

// ---------------------------------------------------------------------------
// Server and views
// ---------------------------------------------------------------------------

fn cmd_serve(ctx: &Context, args: ServeArgs) -> CmdResult {
    let host = args.host.unwrap_or_else(|| ctx.config.server.host.clone());
    let port = args.port.unwrap_or(ctx.config.server.port);
    let state = AppState::new(ctx.workspace.clone(), ctx.model.clone());

    // The blocking LLM client must not be dropped on a runtime thread; ctx
    // keeps a handle alive until the runtime is gone.
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::serve(state, &host, port))?;
    Ok(())
}

fn cmd_daily(ctx: &Context, args: DailyArgs) -> CmdResult {
    let date = match args.date.as_deref() {
        Some(d) => parse_date(d)?,
        None => today(),
    };
    let generated = if args.force {
        ctx.workspace.generate_daily(date)?;
        true
    } else {
        ctx.workspace.ensure_daily(date)?
    };

    let file_path = daily_rel_path(date);
    if ctx.json {
        print_json(&DailyJson {
            date: date.to_string(),
            file_path,
            generated,
        })?;
    } else if generated {
        println!("generated {file_path}");
    } else {
        println!("{file_path} already exists (use --force to regenerate)");
    }
    Ok(())
}

fn cmd_sync(ctx: &Context, args: SyncArgs) -> CmdResult {
    match ctx.workspace.sync_file(&args.path, today())? {
        SaveOutcome::Saved { event, report, .. } => {
            if ctx.json {
                print_json(&SyncJson {
                    path: &args.path,
                    event: event.to_string(),
                    report: &report,
                })?;
            } else {
                print_lines(&format_sync_report(&report));
            }
            Ok(())
        }
        SaveOutcome::Conflict { .. } => Err(format!("{} changed while syncing, try again", args.path).into()),
    }
}

fn cmd_dashboard(ctx: &Context) -> CmdResult {
    let dashboard = ctx.workspace.dashboard(today())?;
    if ctx.json {
        print_json(&dashboard)?;
    } else {
        print_lines(&format_dashboard(&dashboard));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

fn cmd_project_new(ctx: &Context, args: ProjectNewArgs) -> CmdResult {
    let target = parse_target_date(args.target.as_deref())
        .ok_or_else(|| format!("invalid target '{}', expected YYYY-MM-DD or ongoing", args.target.unwrap_or_default()))?;
    let project = NewProject {
        key: args.key,
        name: Some(args.name),
        goal: args.goal,
        target,
    };
    let created = ctx.workspace.create_project(&project, today())?;
    let rel = relative(ctx.workspace.root(), &created.summary_path);
    if ctx.json {
        print_json(&json!({ "projectKey": created.key, "summaryPath": rel }))?;
    } else {
        println!("created project {} ({})", created.key, rel);
    }
    Ok(())
}

fn cmd_add(ctx: &Context, args: AddArgs) -> CmdResult {
    let priority = match args.priority.as_deref() {
        Some(p) => Some(Priority::parse(p).ok_or_else(|| format!("invalid priority '{p}', expected low, medium or high"))?),
        None => None,
    };
    let request = NewTaskRequest {
        title: args.title,
        project: args.project,
        priority,
        tags: args.tags,
        due: args.due.as_deref().map(parse_date).transpose()?,
    };
    let path = ctx.workspace.create_task(&request, today())?;
    let rel = relative(ctx.workspace.root(), &path);
    if ctx.json {
        print_json(&json!({ "title": request.title, "project": request.project, "ledger": rel }))?;
    } else {
        println!("added \"{}\" to {}", request.title, rel);
    }
    Ok(())
}

fn cmd_done(ctx: &Context, args: DoneArgs) -> CmdResult {
    let outcome = ctx.workspace.complete_task(&args.project, &args.title, today())?;
    let already = matches!(outcome, CompleteOutcome::AlreadyDone { .. });
    if ctx.json {
        print_json(&json!({ "title": args.title, "project": args.project, "alreadyDone": already }))?;
    } else if already {
        println!("\"{}\" was already done", args.title);
    } else {
        println!("done: \"{}\" ({})", args.title, args.project);
    }
    Ok(())
}

fn cmd_reschedule(ctx: &Context, args: RescheduleArgs) -> CmdResult {
    let due = parse_date(&args.date)?;
    let previous = ctx.workspace.reschedule_task(&args.project, &args.title, due, today())?;
    if ctx.json {
        print_json(&json!({ "title": args.title, "project": args.project, "due": due, "previousDue": previous }))?;
    } else {
        match previous {
            Some(prev) => println!("\"{}\" moved from {} to {}", args.title, prev, due),
            None => println!("\"{}\" now due {}", args.title, due),
        }
    }
    Ok(())
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
