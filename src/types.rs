use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for TaskId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Board state of a task. Each variant is also the id of its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    InReview,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::InReview,
        TaskStatus::Done,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::InReview => "in-review",
            TaskStatus::Done => "done",
        }
    }

    pub fn index(self) -> usize {
        match self {
            TaskStatus::Todo => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::InReview => 2,
            TaskStatus::Done => 3,
        }
    }

    /// Column to the right, `None` at the last column.
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// Column to the left, `None` at the first column.
    pub fn previous(self) -> Option<Self> {
        self.index()
            .checked_sub(1)
            .and_then(|idx| Self::ALL.get(idx).copied())
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "in-progress" => Ok(TaskStatus::InProgress),
            "in-review" => Ok(TaskStatus::InReview),
            "done" => Ok(TaskStatus::Done),
            other => Err(anyhow!("unknown task status `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub rating: Option<u8>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status,
            pinned: false,
            assignee: None,
            due_date: None,
            tags: Vec::new(),
            rating: None,
        }
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }
}

/// Criteria forwarded to the store's `fetch_all`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilters {
    pub assignee: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

impl TaskFilters {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(assignee) = self.assignee.as_deref()
            && task.assignee.as_deref() != Some(assignee)
        {
            return false;
        }

        if let Some(tag) = self.tag.as_deref()
            && !task.tags.iter().any(|t| t == tag)
        {
            return false;
        }

        if let Some(search) = self.search.as_deref() {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() && !task.title.to_lowercase().contains(&needle) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_as_str() {
        assert_eq!(TaskStatus::Todo.as_str(), "todo");
        assert_eq!(TaskStatus::InProgress.as_str(), "in-progress");
        assert_eq!(TaskStatus::InReview.as_str(), "in-review");
        assert_eq!(TaskStatus::Done.as_str(), "done");
    }

    #[test]
    fn test_task_status_from_str() {
        assert_eq!("todo".parse::<TaskStatus>().unwrap(), TaskStatus::Todo);
        assert_eq!(
            "  In-Progress ".parse::<TaskStatus>().unwrap(),
            TaskStatus::InProgress
        );
        assert_eq!("DONE".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert!("archived".parse::<TaskStatus>().is_err());
        assert!("".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_task_status_neighbours() {
        assert_eq!(TaskStatus::Todo.previous(), None);
        assert_eq!(TaskStatus::Todo.next(), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::InReview.previous(), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::Done.next(), None);
    }

    #[test]
    fn test_task_serializes_with_wire_names() {
        let mut task = Task::new("t1", "Write invoice", TaskStatus::InReview);
        task.due_date = NaiveDate::from_ymd_opt(2026, 3, 1);

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["id"], "t1");
        assert_eq!(value["status"], "in-review");
        assert_eq!(value["dueDate"], "2026-03-01");
    }

    #[test]
    fn test_task_deserializes_with_missing_payload() {
        let task: Task =
            serde_json::from_str(r#"{"id":"t9","title":"Call client","status":"todo"}"#).unwrap();
        assert_eq!(task.id.as_str(), "t9");
        assert!(!task.pinned);
        assert!(task.tags.is_empty());
        assert_eq!(task.rating, None);
    }

    #[test]
    fn test_filters_match() {
        let mut task = Task::new("t1", "Send Invoice #42", TaskStatus::Todo);
        task.assignee = Some("ana".to_string());
        task.tags = vec!["billing".to_string()];

        assert!(TaskFilters::default().matches(&task));
        assert!(
            TaskFilters {
                search: Some("invoice".to_string()),
                ..TaskFilters::default()
            }
            .matches(&task)
        );
        assert!(
            !TaskFilters {
                assignee: Some("bo".to_string()),
                ..TaskFilters::default()
            }
            .matches(&task)
        );
        assert!(
            !TaskFilters {
                tag: Some("design".to_string()),
                ..TaskFilters::default()
            }
            .matches(&task)
        );
    }
}
