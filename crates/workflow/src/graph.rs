//! The task graph: readiness, status transitions, and the run's snapshot view.

use prospector_core::error::TaskError;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::plan::PlannedTask;
use crate::report::ProgressReport;
use crate::task::{Task, TaskId, TaskStatus};

/// Handle shared by the planning loop and the task capabilities.
pub type SharedTaskGraph = Arc<Mutex<TaskGraph>>;

/// Read-only view handed to the oracle and to stop-condition checks.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub tasks: Vec<Task>,
    pub count: usize,
    pub completed_count: usize,
}

impl TaskSnapshot {
    /// Every task exists and every one is Completed.
    pub fn is_finished(&self) -> bool {
        self.count > 0 && self.completed_count == self.count
    }
}

/// Tasks keyed by id, in id order.
///
/// A task is never removed. Dependencies may name ids that don't exist;
/// such dependencies count as satisfied.
#[derive(Default)]
pub struct TaskGraph {
    tasks: BTreeMap<TaskId, Task>,
    next_seq: u64,
    report: Option<ProgressReport>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-render a markdown progress report at `path` after every change.
    pub fn with_report(mut self, path: impl Into<PathBuf>) -> Self {
        self.report = Some(ProgressReport::new(path));
        self
    }

    /// Wrap the graph in a shared handle.
    pub fn shared(self) -> SharedTaskGraph {
        Arc::new(Mutex::new(self))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(&TaskId::from(id))
    }

    /// All tasks in ascending id order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    fn allocate_id(&mut self) -> TaskId {
        loop {
            self.next_seq += 1;
            let id = TaskId::sequence(self.next_seq);
            if !self.tasks.contains_key(&id) {
                return id;
            }
        }
    }

    /// Insert a new Pending task with the next sequential id.
    pub fn add_task(&mut self, description: impl Into<String>, dependencies: Vec<String>) -> Task {
        let id = self.allocate_id();
        let task = Task::new(
            id.clone(),
            description,
            dependencies.into_iter().map(TaskId::from).collect(),
        );
        info!(task_id = %id, description = %task.description, "Task added");
        self.tasks.insert(id, task.clone());
        self.touched();
        task
    }

    /// Insert a whole plan, translating its local ids into allocated ones.
    ///
    /// Dependencies on ids outside the plan are kept verbatim.
    pub fn insert_plan(&mut self, plan: &[PlannedTask]) -> Vec<Task> {
        let mut ids: HashMap<&str, TaskId> = HashMap::new();
        let mut allocated = Vec::with_capacity(plan.len());
        for planned in plan {
            let id = self.allocate_id();
            if let Some(local) = planned.id.as_deref() {
                ids.insert(local, id.clone());
            }
            allocated.push(id);
        }

        let mut inserted = Vec::with_capacity(plan.len());
        for (planned, id) in plan.iter().zip(allocated) {
            let dependencies = planned
                .dependencies
                .iter()
                .map(|d| ids.get(d.as_str()).cloned().unwrap_or_else(|| TaskId::from(d.as_str())))
                .collect();
            let task = Task::new(id.clone(), planned.description.clone(), dependencies);
            self.tasks.insert(id, task.clone());
            inserted.push(task);
        }

        info!(count = inserted.len(), "Plan inserted");
        self.touched();
        inserted
    }

    fn transition(
        &mut self,
        id: &str,
        next: TaskStatus,
        note: Option<String>,
    ) -> Result<Task, TaskError> {
        let task = self
            .tasks
            .get_mut(&TaskId::from(id))
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;

        let changed = task.transition(next, note)?;
        let task = task.clone();
        if changed {
            info!(task_id = %id, status = %next, "Task status changed");
            self.touched();
        } else {
            debug!(task_id = %id, status = %next, "Task already in requested status");
        }
        Ok(task)
    }

    pub fn start_task(&mut self, id: &str) -> Result<Task, TaskError> {
        self.transition(id, TaskStatus::InProgress, None)
    }

    /// Mark a task Completed. Completing twice is a no-op.
    pub fn complete_task(&mut self, id: &str) -> Result<Task, TaskError> {
        self.transition(id, TaskStatus::Completed, None)
    }

    pub fn fail_task(&mut self, id: &str, reason: &str) -> Result<Task, TaskError> {
        self.transition(id, TaskStatus::Failed, Some(format!("Failed: {reason}")))
    }

    pub fn skip_task(&mut self, id: &str, reason: &str) -> Result<Task, TaskError> {
        self.transition(id, TaskStatus::Skipped, Some(format!("Skipped: {reason}")))
    }

    /// Append a note without touching status. Allowed in every status.
    pub fn add_task_note(&mut self, id: &str, note: &str) -> Result<Task, TaskError> {
        let task = self
            .tasks
            .get_mut(&TaskId::from(id))
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        task.add_note(note);
        let task = task.clone();
        self.touched();
        Ok(task)
    }

    /// Pending, and every dependency present in the graph is Completed.
    pub fn is_ready(&self, task: &Task) -> bool {
        task.status == TaskStatus::Pending
            && task.dependencies.iter().all(|dep| {
                self.tasks
                    .get(dep)
                    .is_none_or(|d| d.status == TaskStatus::Completed)
            })
    }

    /// The ready task with the smallest id.
    pub fn get_next_ready_task(&self) -> Option<&Task> {
        self.tasks.values().find(|t| self.is_ready(t))
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        let tasks: Vec<Task> = self.tasks.values().cloned().collect();
        let completed_count = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        TaskSnapshot {
            count: tasks.len(),
            completed_count,
            tasks,
        }
    }

    /// Every task is Completed or Skipped. A Failed task keeps this false.
    pub fn all_terminal(&self) -> bool {
        self.tasks.values().all(|t| t.status.is_terminal())
    }

    /// Count of tasks per status.
    pub fn status_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts: BTreeMap<&'static str, usize> =
            TaskStatus::ALL.iter().map(|s| (s.label(), 0)).collect();
        for task in self.tasks.values() {
            *counts.entry(task.status.label()).or_default() += 1;
        }
        counts
    }

    fn touched(&self) {
        if let Some(report) = &self.report {
            if let Err(e) = report.write(self) {
                warn!(
                    path = %report.path().display(),
                    error = %e,
                    "Could not write task progress report"
                );
            }
        }
    }
}
