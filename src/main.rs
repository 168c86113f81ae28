use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use task_board::{
    cli::{self, RootCommand, StoreArgs},
    logging::init_logging,
    settings::Settings,
};

#[derive(Parser, Debug)]
#[command(
    name = "task-board",
    about = "Kanban task board with drag-and-drop status transitions",
    long_about = "Drives the task board engine against a remote task API or a local SQLite database.",
    version = env!("TASK_BOARD_BUILD_VERSION"),
    author
)]
struct Cli {
    /// Base URL of the task API (overrides settings)
    #[arg(long, global = true, value_name = "URL", conflicts_with = "db")]
    api: Option<String>,

    /// Local SQLite database to use instead of the API
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: RootCommand,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_guard = match init_logging() {
        Ok((_, guard)) => Some(guard),
        Err(err) => {
            eprintln!("warning: failed to initialize logging: {err:#}");
            None
        }
    };

    let settings = Settings::load();
    let store_args = StoreArgs {
        api_url: cli.api,
        db_path: cli.db,
    };

    let code = cli::run(cli.command, store_args, settings, cli.json, cli.quiet).await;
    if code != 0 {
        drop(log_guard);
        std::process::exit(code);
    }
    Ok(())
}
