//! Task capabilities: thin wrappers over the shared task graph.

use async_trait::async_trait;
use prospector_core::error::ToolError;
use prospector_core::tool::{Capability, Tool, ToolResult};
use prospector_workflow::SharedTaskGraph;
use serde_json::{Value, json};

use crate::args::{required_str, string_list};

pub struct AddTaskTool {
    tasks: SharedTaskGraph,
}

impl AddTaskTool {
    pub fn new(tasks: SharedTaskGraph) -> Self {
        Self { tasks }
    }
}

#[async_trait]
impl Tool for AddTaskTool {
    fn capability(&self) -> Capability {
        Capability::AddTask
    }

    fn description(&self) -> &str {
        "Add a task to the task list. Tasks start pending and become ready once \
         every task they depend on is completed. Returns the new task with its id."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "description": {
                    "type": "string",
                    "description": "What needs to be done"
                },
                "dependencies": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Ids of tasks that must complete first (e.g. [\"task-1\"])"
                }
            },
            "required": ["description"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let description = required_str(&arguments, "description")?;
        let dependencies = string_list(&arguments, "dependencies");

        let task = self.tasks.lock().await.add_task(description, dependencies);
        Ok(ToolResult::success(json!({
            "task_id": task.id,
            "task": task,
        })))
    }
}

pub struct CompleteTaskTool {
    tasks: SharedTaskGraph,
}

impl CompleteTaskTool {
    pub fn new(tasks: SharedTaskGraph) -> Self {
        Self { tasks }
    }
}

#[async_trait]
impl Tool for CompleteTaskTool {
    fn capability(&self) -> Capability {
        Capability::CompleteTask
    }

    fn description(&self) -> &str {
        "Mark a task as completed."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": { "type": "string", "description": "Id of the task, e.g. task-3" }
            },
            "required": ["task_id"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let id = required_str(&arguments, "task_id")?;
        let task = self.tasks.lock().await.complete_task(id)?;
        Ok(ToolResult::success(json!({
            "message": format!("Task {id} marked as completed"),
            "task": task,
        })))
    }
}

pub struct AddTaskNoteTool {
    tasks: SharedTaskGraph,
}

impl AddTaskNoteTool {
    pub fn new(tasks: SharedTaskGraph) -> Self {
        Self { tasks }
    }
}

#[async_trait]
impl Tool for AddTaskNoteTool {
    fn capability(&self) -> Capability {
        Capability::AddTaskNote
    }

    fn description(&self) -> &str {
        "Attach a timestamped note to a task without changing its status."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": { "type": "string" },
                "note": { "type": "string" }
            },
            "required": ["task_id", "note"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let id = required_str(&arguments, "task_id")?;
        let note = required_str(&arguments, "note")?;
        let task = self.tasks.lock().await.add_task_note(id, note)?;
        Ok(ToolResult::success(json!({
            "message": format!("Note added to {id}"),
            "task": task,
        })))
    }
}

pub struct GetTasksTool {
    tasks: SharedTaskGraph,
}

impl GetTasksTool {
    pub fn new(tasks: SharedTaskGraph) -> Self {
        Self { tasks }
    }
}

#[async_trait]
impl Tool for GetTasksTool {
    fn capability(&self) -> Capability {
        Capability::GetTasks
    }

    fn description(&self) -> &str {
        "List every task with its status, dependencies and notes, plus the next ready task."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: Value) -> Result<ToolResult, ToolError> {
        let graph = self.tasks.lock().await;
        let snapshot = graph.snapshot();
        let next_ready = graph.get_next_ready_task().map(|t| t.id.clone());
        Ok(ToolResult::success(json!({
            "tasks": snapshot.tasks,
            "count": snapshot.count,
            "completed_count": snapshot.completed_count,
            "next_ready_task": next_ready,
        })))
    }
}
