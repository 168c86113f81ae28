use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::store::TaskStore;
use crate::types::{Task, TaskFilters, TaskId, TaskStatus};

/// Local SQLite-backed store used by the CLI when no API is configured.
#[derive(Debug, Clone)]
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!(
                    "failed to create parent directories for {}",
                    path_ref.display()
                )
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path_ref)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open sqlite db at {}", path_ref.display()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Private in-memory database; a single connection keeps every query on
    /// the same database.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("invalid in-memory sqlite url")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("failed to open in-memory sqlite db")?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub async fn insert_task(&self, task: &Task) -> Result<()> {
        let tags = serde_json::to_string(&task.tags).context("failed to encode task tags")?;

        sqlx::query(
            "INSERT INTO tasks (id, title, status, pinned, assignee, due_date, tags, rating) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(task.id.as_str())
        .bind(&task.title)
        .bind(task.status.as_str())
        .bind(task.pinned)
        .bind(task.assignee.as_deref())
        .bind(task.due_date.map(|date| date.to_string()))
        .bind(tags)
        .bind(task.rating.map(i64::from))
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert task {}", task.id))?;

        Ok(())
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tasks (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                status TEXT NOT NULL,
                pinned INTEGER NOT NULL DEFAULT 0,
                assignee TEXT,
                due_date TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                rating INTEGER
            )",
        )
        .execute(&self.pool)
        .await
        .context("failed to create tasks table")?;
        Ok(())
    }
}

fn map_task_row(row: &SqliteRow) -> Result<Task> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let due_date: Option<String> = row.try_get("due_date")?;
    let tags: String = row.try_get("tags")?;
    let rating: Option<i64> = row.try_get("rating")?;

    Ok(Task {
        status: TaskStatus::from_str(&status)
            .with_context(|| format!("task {id} has invalid status"))?,
        due_date: due_date
            .map(|raw| NaiveDate::from_str(&raw))
            .transpose()
            .with_context(|| format!("task {id} has invalid due date"))?,
        tags: serde_json::from_str(&tags)
            .with_context(|| format!("task {id} has invalid tags"))?,
        rating: rating
            .map(u8::try_from)
            .transpose()
            .with_context(|| format!("task {id} has invalid rating"))?,
        title: row.try_get("title")?,
        pinned: row.try_get("pinned")?,
        assignee: row.try_get("assignee")?,
        id: TaskId::new(id),
    })
}

impl TaskStore for SqliteTaskStore {
    async fn fetch_all(&self, filters: &TaskFilters) -> Result<Vec<Task>> {
        let rows = sqlx::query(
            "SELECT id, title, status, pinned, assignee, due_date, tags, rating \
             FROM tasks ORDER BY seq ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to load tasks")?;

        let mut tasks = Vec::with_capacity(rows.len());
        for row in &rows {
            let task = map_task_row(row)?;
            if filters.matches(&task) {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    async fn update_status(&self, id: &TaskId, status: TaskStatus) -> Result<()> {
        let result = sqlx::query("UPDATE tasks SET status = ?1 WHERE id = ?2")
            .bind(status.as_str())
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to update status of task {id}"))?;

        if result.rows_affected() == 0 {
            bail!("task {id} not found");
        }
        Ok(())
    }
}
