use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::store::TaskStore;
use crate::types::{Task, TaskFilters, TaskId, TaskStatus};

#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
}

impl HttpStoreConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// REST client for the remote task API.
#[derive(Debug, Clone)]
pub struct HttpTaskStore {
    client: reqwest::Client,
    config: HttpStoreConfig,
}

#[derive(Serialize)]
struct StatusPatch {
    status: TaskStatus,
}

impl HttpTaskStore {
    pub fn new(config: HttpStoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    fn tasks_url(&self) -> String {
        format!("{}/tasks", self.config.base_url.trim_end_matches('/'))
    }

    fn task_url(&self, id: &TaskId) -> String {
        format!("{}/{}", self.tasks_url(), urlencoding::encode(id.as_str()))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn filter_query(filters: &TaskFilters) -> Vec<(&'static str, &str)> {
    [
        ("assignee", filters.assignee.as_deref()),
        ("tag", filters.tag.as_deref()),
        ("search", filters.search.as_deref()),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|value| (key, value)))
    .collect()
}

impl TaskStore for HttpTaskStore {
    async fn fetch_all(&self, filters: &TaskFilters) -> Result<Vec<Task>> {
        let url = self.tasks_url();
        debug!(url = %url, ?filters, "fetching tasks");

        self.authorize(self.client.get(&url))
            .query(&filter_query(filters))
            .send()
            .await
            .with_context(|| format!("failed to send task list request to {url}"))?
            .error_for_status()
            .context("task list endpoint returned error status")?
            .json::<Vec<Task>>()
            .await
            .context("failed to parse task list response")
    }

    async fn update_status(&self, id: &TaskId, status: TaskStatus) -> Result<()> {
        let url = self.task_url(id);
        debug!(task_id = %id, %status, url = %url, "updating task status");

        self.authorize(self.client.patch(&url))
            .json(&StatusPatch { status })
            .send()
            .await
            .with_context(|| format!("failed to send status update for task {id}"))?
            .error_for_status()
            .with_context(|| format!("status update for task {id} was rejected"))?;
        Ok(())
    }
}
