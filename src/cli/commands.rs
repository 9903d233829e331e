use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "daybook", about = concat!("daybook v", env!("CARGO_PKG_VERSION"), " - plain-text ledgers, one day at a time"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data directory (default: $DAYBOOK_DATA_DIR, else the current directory)
    #[arg(short = 'C', long = "data-dir", global = true)]
    pub data_dir: Option<String>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Generate the daily file for a date (default: today)
    Daily(DailyArgs),
    /// Run propagation for a file edited outside the editor
    Sync(SyncArgs),
    /// Show tasks bucketed by due date
    Dashboard,
    /// Project management
    Project(ProjectCmd),
    /// Add a task to a project's ledger
    Add(AddArgs),
    /// Mark a task done
    Done(DoneArgs),
    /// Change a task's due date
    Reschedule(RescheduleArgs),
}

// ---------------------------------------------------------------------------
// Server and views
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind (overrides daybook.toml)
    #[arg(long)]
    pub host: Option<String>,
    /// Port to bind (overrides daybook.toml)
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Args)]
pub struct DailyArgs {
    /// Date to generate, YYYY-MM-DD
    #[arg(long)]
    pub date: Option<String>,
    /// Regenerate even if the file exists (notes are kept)
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct SyncArgs {
    /// File path relative to the data directory
    pub path: String,
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ProjectCmd {
    #[command(subcommand)]
    pub action: ProjectAction,
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a project with a PROJECT.md and an empty ledger
    New(ProjectNewArgs),
}

#[derive(Args)]
pub struct ProjectNewArgs {
    /// Project key (lowercase letters, digits and dashes)
    pub key: String,
    /// Display name
    pub name: String,
    /// One-line goal
    #[arg(long)]
    pub goal: Option<String>,
    /// Target date, YYYY-MM-DD or "ongoing"
    #[arg(long)]
    pub target: Option<String>,
}

// ---------------------------------------------------------------------------
// Task mutations
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Project key
    pub project: String,
    /// Task title
    pub title: String,
    /// Due date, YYYY-MM-DD
    #[arg(long)]
    pub due: Option<String>,
    /// Priority (low, medium, high)
    #[arg(long)]
    pub priority: Option<String>,
    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Args)]
pub struct DoneArgs {
    /// Project key
    pub project: String,
    /// Task title
    pub title: String,
}

#[derive(Args)]
pub struct RescheduleArgs {
    /// Project key
    pub project: String,
    /// Task title
    pub title: String,
    /// New due date, YYYY-MM-DD
    pub date: String,
}
