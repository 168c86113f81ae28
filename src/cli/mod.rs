use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde_json::{Value, json};
use tracing::error;
use uuid::Uuid;

use crate::board::{Board, DropOutcome, column_views};
use crate::notification::{BackendNotifier, MemoryNotifier, Notice, Notifier};
use crate::settings::Settings;
use crate::store::{HttpStoreConfig, HttpTaskStore, SqliteTaskStore, TaskStore};
use crate::types::{Task, TaskFilters, TaskId, TaskStatus};

const SCHEMA_VERSION: &str = "cli.v1";

#[derive(Debug, Clone, Subcommand)]
pub enum RootCommand {
    /// Print the board, one column at a time
    Board(FilterArgs),
    /// Add a task to the local database
    Add(AddArgs),
    /// Move a task to another column
    Move(MoveArgs),
    /// Replay a drag gesture: pick up a task and drop it on an element id
    Drag(DragArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    #[arg(long, value_name = "NAME")]
    pub assignee: Option<String>,

    #[arg(long, value_name = "TAG")]
    pub tag: Option<String>,

    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,
}

impl From<FilterArgs> for TaskFilters {
    fn from(args: FilterArgs) -> Self {
        TaskFilters {
            assignee: args.assignee,
            tag: args.tag,
            search: args.search,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    #[arg(long, value_name = "TEXT")]
    pub title: String,

    #[arg(long, value_name = "STATUS", default_value = "todo")]
    pub status: String,

    #[arg(long)]
    pub pinned: bool,

    #[arg(long, value_name = "NAME")]
    pub assignee: Option<String>,

    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    #[arg(long, value_name = "YYYY-MM-DD")]
    pub due: Option<NaiveDate>,

    #[arg(long, value_name = "N")]
    pub rating: Option<u8>,
}

#[derive(Debug, Clone, Args)]
pub struct MoveArgs {
    #[arg(value_name = "TASK_ID")]
    pub id: String,

    #[arg(value_name = "STATUS")]
    pub status: String,
}

#[derive(Debug, Clone, Args)]
pub struct DragArgs {
    #[arg(value_name = "TASK_ID")]
    pub id: String,

    /// Column id, task id, or `column-<status>` container id
    #[arg(value_name = "TARGET")]
    pub target: String,
}

/// Where the CLI reads and writes tasks.
#[derive(Debug, Clone, Default)]
pub struct StoreArgs {
    pub api_url: Option<String>,
    pub db_path: Option<PathBuf>,
}

pub async fn run(
    command: RootCommand,
    store_args: StoreArgs,
    settings: Settings,
    json_output: bool,
    quiet: bool,
) -> i32 {
    match execute(command, store_args, &settings).await {
        Ok(output) => {
            print_success(output, json_output, quiet);
            0
        }
        Err(err) => {
            print_error(&err, json_output);
            err.exit_code
        }
    }
}

struct CommandOutput {
    command: &'static str,
    data: Value,
    text: String,
}

#[derive(Debug)]
struct CliError {
    exit_code: i32,
    code: &'static str,
    message: String,
}

type CliResult<T> = Result<T, CliError>;

fn cli_error(exit_code: i32, code: &'static str, message: impl Into<String>) -> CliError {
    CliError {
        exit_code,
        code,
        message: message.into(),
    }
}

fn store_error(err: anyhow::Error) -> CliError {
    cli_error(5, "STORE_ERROR", format!("{err:#}"))
}

enum CliStore {
    Http(HttpTaskStore),
    Sqlite(SqliteTaskStore),
}

impl TaskStore for CliStore {
    async fn fetch_all(&self, filters: &TaskFilters) -> Result<Vec<Task>> {
        match self {
            CliStore::Http(store) => store.fetch_all(filters).await,
            CliStore::Sqlite(store) => store.fetch_all(filters).await,
        }
    }

    async fn update_status(&self, id: &TaskId, status: TaskStatus) -> Result<()> {
        match self {
            CliStore::Http(store) => store.update_status(id, status).await,
            CliStore::Sqlite(store) => store.update_status(id, status).await,
        }
    }
}

async fn open_store(store_args: StoreArgs, settings: &Settings) -> Result<CliStore> {
    if store_args.db_path.is_none()
        && let Some(base_url) = store_args.api_url.or_else(|| settings.api_url.clone())
    {
        let config = HttpStoreConfig {
            base_url,
            api_token: settings.api_token.clone(),
            request_timeout: settings.request_timeout(),
        };
        return Ok(CliStore::Http(HttpTaskStore::new(config)?));
    }

    let path = store_args
        .db_path
        .or_else(|| settings.resolved_database_path())
        .ok_or_else(|| anyhow!("unable to determine database path"))?;
    let store = SqliteTaskStore::open(&path)
        .await
        .with_context(|| format!("failed to open task database {}", path.display()))?;
    Ok(CliStore::Sqlite(store))
}

/// Forwards notices to the configured backend and keeps a copy so the
/// command can report a rejected move.
struct CliNotifier {
    backend: BackendNotifier,
    recorded: MemoryNotifier,
}

impl Notifier for CliNotifier {
    fn notify(&self, notice: &Notice) {
        self.backend.notify(notice);
        self.recorded.notify(notice);
    }
}

async fn execute(
    command: RootCommand,
    store_args: StoreArgs,
    settings: &Settings,
) -> CliResult<CommandOutput> {
    let store = open_store(store_args, settings).await.map_err(store_error)?;

    match command {
        RootCommand::Board(filters) => execute_board(store, filters.into()).await,
        RootCommand::Add(args) => execute_add(store, args).await,
        RootCommand::Move(args) => {
            let status = parse_status(&args.status)?;
            let task_id = TaskId::new(args.id);
            execute_gesture(store, settings, "move", &task_id, |board| {
                board.move_task(&task_id, status)
            })
            .await
        }
        RootCommand::Drag(args) => {
            let task_id = TaskId::new(args.id);
            execute_gesture(store, settings, "drag", &task_id, |board| {
                if !board.drag_start(task_id.clone()) {
                    return DropOutcome::Discarded;
                }
                board.drag_over(&args.target);
                board.drag_end(&args.target)
            })
            .await
        }
    }
}

fn parse_status(raw: &str) -> CliResult<TaskStatus> {
    TaskStatus::from_str(raw).map_err(|err| cli_error(2, "INVALID_STATUS", err.to_string()))
}

async fn execute_board(store: CliStore, filters: TaskFilters) -> CliResult<CommandOutput> {
    let tasks = store.fetch_all(&filters).await.map_err(store_error)?;
    let views = column_views(&tasks);

    let mut lines = Vec::new();
    for view in &views {
        lines.push(format!("{} ({})", view.column.title, view.tasks.len()));
        for task in &view.tasks {
            lines.push(format_task_line(task));
        }
    }

    Ok(CommandOutput {
        command: "board",
        data: json!({ "filters": filters, "columns": views }),
        text: lines.join("\n"),
    })
}

async fn execute_add(store: CliStore, args: AddArgs) -> CliResult<CommandOutput> {
    let CliStore::Sqlite(store) = store else {
        return Err(cli_error(
            2,
            "STORE_UNSUPPORTED",
            "tasks can only be added to the local database",
        ));
    };

    let task = Task {
        id: TaskId::new(Uuid::new_v4().to_string()),
        title: args.title,
        status: parse_status(&args.status)?,
        pinned: args.pinned,
        assignee: args.assignee,
        due_date: args.due,
        tags: args.tags,
        rating: args.rating,
    };
    store.insert_task(&task).await.map_err(store_error)?;

    Ok(CommandOutput {
        command: "add",
        text: format!("added {}", format_task_line(&task).trim_start()),
        data: json!({ "task": task }),
    })
}

/// Loads a board, applies one gesture to `task_id` and waits for the store
/// to answer.
async fn execute_gesture<F>(
    store: CliStore,
    settings: &Settings,
    command: &'static str,
    task_id: &TaskId,
    gesture: F,
) -> CliResult<CommandOutput>
where
    F: FnOnce(&mut Board<CliStore>) -> DropOutcome,
{
    let recorded = MemoryNotifier::default();
    let notifier = CliNotifier {
        backend: BackendNotifier::new(
            settings.notification_backend(),
            settings.notification_duration_ms,
        ),
        recorded: recorded.clone(),
    };

    let mut board = Board::new(store, notifier);
    board
        .load(TaskFilters::default())
        .await
        .map_err(store_error)?;

    if board.task(task_id).is_none() {
        return Err(cli_error(
            3,
            "TASK_NOT_FOUND",
            format!("task {task_id} not found"),
        ));
    }

    let outcome = gesture(&mut board);
    board.settle().await;

    if let Some(notice) = recorded.notices().into_iter().next() {
        return Err(cli_error(1, "MOVE_REJECTED", notice.message));
    }

    match outcome {
        DropOutcome::Moved { task_id, from, to } => {
            let title = board
                .task(&task_id)
                .map(|t| t.title.clone())
                .unwrap_or_default();
            Ok(CommandOutput {
                command,
                data: json!({
                    "outcome": "moved",
                    "task_id": task_id,
                    "from": from,
                    "to": to,
                }),
                text: format!("moved {task_id} \"{title}\": {from} -> {to}"),
            })
        }
        DropOutcome::Unchanged => Ok(CommandOutput {
            command,
            data: json!({ "outcome": "unchanged" }),
            text: "unchanged".to_string(),
        }),
        DropOutcome::Discarded => Err(cli_error(
            3,
            "TARGET_NOT_RESOLVED",
            "drop target not found on the board",
        )),
    }
}

fn format_task_line(task: &Task) -> String {
    let marker = if task.pinned { "*" } else { "-" };
    let mut line = format!("  {marker} [{}] {}", task.id, task.title);
    if let Some(assignee) = task.assignee.as_deref() {
        line.push_str(&format!(" @{assignee}"));
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!(" due {due}"));
    }
    if !task.tags.is_empty() {
        line.push_str(&format!(" #{}", task.tags.join(" #")));
    }
    line
}

fn print_success(output: CommandOutput, json_output: bool, quiet: bool) {
    if json_output {
        let payload = json!({
            "schema_version": SCHEMA_VERSION,
            "command": output.command,
            "data": output.data
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(value) => println!("{value}"),
            Err(_) => println!("{}", payload),
        }
        return;
    }

    if quiet {
        return;
    }

    if output.text.is_empty() {
        println!("ok");
    } else {
        println!("{}", output.text);
    }
}

fn print_error(err: &CliError, json_output: bool) {
    error!(code = err.code, message = %err.message, "cli command failed");

    if json_output {
        let payload = json!({
            "schema_version": SCHEMA_VERSION,
            "error": {
                "code": err.code,
                "message": err.message
            }
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(value) => eprintln!("{value}"),
            Err(_) => eprintln!("{}", payload),
        }
        return;
    }

    eprintln!("error[{}]: {}", err.code, err.message);
}
