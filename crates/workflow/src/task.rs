//! Task records and their one-way status lifecycle.

use chrono::{DateTime, Utc};
use prospector_core::error::TaskError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Task identifier, `task-N` for tasks allocated by the graph.
///
/// Orders by the numeric suffix when both sides have one (`task-2` before
/// `task-10`), otherwise lexicographically after all numbered ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id allocated for the `n`th task.
    pub fn sequence(n: u64) -> Self {
        Self(format!("task-{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn number(&self) -> Option<u64> {
        self.0.strip_prefix("task-")?.parse().ok()
    }
}

impl Ord for TaskId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.number(), other.number()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for TaskId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        Self::Pending,
        Self::InProgress,
        Self::Completed,
        Self::Failed,
        Self::Skipped,
    ];

    /// Symbol used in the progress report.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Pending => "⏳",
            Self::InProgress => "🔄",
            Self::Completed => "✅",
            Self::Failed => "❌",
            Self::Skipped => "⏭️",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Skipped => "Skipped",
        }
    }

    /// Completed and Skipped end a task for good. Failed does not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::InProgress => 1,
            Self::Failed => 2,
            Self::Completed | Self::Skipped => 3,
        }
    }

    /// Transitions only move forward: Pending → InProgress → Failed →
    /// Completed | Skipped, with any forward jump allowed.
    pub fn can_become(&self, next: TaskStatus) -> bool {
        next.rank() > self.rank()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNote {
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub dependencies: Vec<TaskId>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Vec<TaskNote>,
}

impl Task {
    pub fn new(id: TaskId, description: impl Into<String>, dependencies: Vec<TaskId>) -> Self {
        Self {
            id,
            description: description.into(),
            dependencies,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            notes: Vec::new(),
        }
    }

    pub fn add_note(&mut self, content: impl Into<String>) {
        self.notes.push(TaskNote {
            timestamp: Utc::now(),
            content: content.into(),
        });
    }

    /// Move to `next`. Returns `Ok(false)` when already there.
    ///
    /// Entering a terminal or failed state stamps the completion time and
    /// appends `note` (if any); repeating the current state changes nothing.
    pub(crate) fn transition(
        &mut self,
        next: TaskStatus,
        note: Option<String>,
    ) -> Result<bool, TaskError> {
        if self.status == next {
            return Ok(false);
        }
        if !self.status.can_become(next) {
            return Err(TaskError::InvalidTransition {
                id: self.id.to_string(),
                from: self.status.label().into(),
                to: next.label().into(),
            });
        }

        let now = Utc::now();
        match next {
            TaskStatus::InProgress => self.started_at = Some(now),
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Skipped => {
                self.completed_at = Some(now)
            }
            TaskStatus::Pending => {}
        }
        self.status = next;
        if let Some(note) = note {
            self.add_note(note);
        }
        Ok(true)
    }
}
