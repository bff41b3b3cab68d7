//! Memory capabilities over the run's `MemoryStore`.

use async_trait::async_trait;
use prospector_core::error::ToolError;
use prospector_core::interaction::Interaction;
use prospector_core::tool::{Capability, Tool, ToolResult};
use prospector_memory::{MemoryStore, parse_required_inputs};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::args::required_str;

pub struct RememberTool {
    memory: Arc<MemoryStore>,
}

impl RememberTool {
    pub fn new(memory: Arc<MemoryStore>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for RememberTool {
    fn capability(&self) -> Capability {
        Capability::Remember
    }

    fn description(&self) -> &str {
        "Store a fact under a key so it survives later turns and runs."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "key": { "type": "string" },
                "value": { "description": "Any JSON value" }
            },
            "required": ["key", "value"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let key = required_str(&arguments, "key")?;
        let value = arguments.get("value").cloned().unwrap_or(Value::Null);
        self.memory.remember(key, value).await?;
        Ok(ToolResult::success(json!({
            "message": format!("Remembered {key}"),
        })))
    }
}

pub struct RecallTool {
    memory: Arc<MemoryStore>,
}

impl RecallTool {
    pub fn new(memory: Arc<MemoryStore>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for RecallTool {
    fn capability(&self) -> Capability {
        Capability::Recall
    }

    fn description(&self) -> &str {
        "Look up a remembered fact. Reports where it came from: memory, disk or default."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "key": { "type": "string" },
                "default": { "description": "Returned when the key is unknown" }
            },
            "required": ["key"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let key = required_str(&arguments, "key")?;
        let default = arguments.get("default").filter(|v| !v.is_null()).cloned();
        let recalled = self.memory.recall(key, default).await?;
        Ok(ToolResult::success(json!({
            "value": recalled.value,
            "source": recalled.source.as_str(),
        })))
    }
}

pub struct EnsureRequiredInputsTool {
    memory: Arc<MemoryStore>,
    interaction: Arc<dyn Interaction>,
}

impl EnsureRequiredInputsTool {
    pub fn new(memory: Arc<MemoryStore>, interaction: Arc<dyn Interaction>) -> Self {
        Self {
            memory,
            interaction,
        }
    }
}

#[async_trait]
impl Tool for EnsureRequiredInputsTool {
    fn capability(&self) -> Capability {
        Capability::EnsureRequiredInputs
    }

    fn description(&self) -> &str {
        "Make sure a set of named inputs is known: each is recalled from memory or \
         asked of the user and remembered. Each entry may give prompt, default, \
         options and type (int, float, bool)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "required_inputs": {
                    "type": "object",
                    "description": "Map of key to {prompt?, default?, options?, type?}",
                    "additionalProperties": {
                        "type": "object",
                        "properties": {
                            "prompt": { "type": "string" },
                            "default": {},
                            "options": { "type": "array", "items": { "type": "string" } },
                            "type": { "type": "string", "enum": ["str", "int", "float", "bool"] }
                        }
                    }
                }
            },
            "required": ["required_inputs"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let required = arguments
            .get("required_inputs")
            .map(parse_required_inputs)
            .transpose()
            .map_err(ToolError::InvalidArguments)?
            .unwrap_or_default();

        let inputs = self
            .memory
            .ensure_required_inputs(self.interaction.as_ref(), &required)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.capability().to_string(),
                reason: e.to_string(),
            })?;

        Ok(ToolResult::success(json!({ "inputs": inputs })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospector_channels::ScriptedChannel;
    use prospector_core::ToolRegistry;
    use prospector_memory::FileBackend;

    fn registry(memory: Arc<MemoryStore>, channel: Arc<ScriptedChannel>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(RememberTool::new(memory.clone())));
        registry.register(Box::new(RecallTool::new(memory.clone())));
        registry.register(Box::new(EnsureRequiredInputsTool::new(memory, channel)));
        registry
    }

    #[tokio::test]
    async fn remember_then_recall_from_memory_then_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        let memory = Arc::new(MemoryStore::new(Arc::new(FileBackend::new(&path))));
        let registry = registry(memory.clone(), Arc::new(ScriptedChannel::silent()));

        let stored = registry
            .dispatch("remember", json!({"key": "leads_count", "value": 10}))
            .await;
        assert_eq!(stored.get("message"), Some(&json!("Remembered leads_count")));

        let recalled = registry.dispatch("recall", json!({"key": "leads_count"})).await;
        assert_eq!(recalled.get("value"), Some(&json!(10)));
        assert_eq!(recalled.get("source"), Some(&json!("memory")));

        memory.clear_cache().await;
        let recalled = registry.dispatch("recall", json!({"key": "leads_count"})).await;
        assert_eq!(recalled.get("source"), Some(&json!("disk")));
    }

    #[tokio::test]
    async fn recall_unknown_key() {
        let registry = registry(
            Arc::new(MemoryStore::in_memory()),
            Arc::new(ScriptedChannel::silent()),
        );

        let missing = registry.dispatch("recall", json!({"key": "icp"})).await;
        assert_eq!(
            missing.to_value(),
            json!({"status": "error", "error": "Key not found: icp"})
        );

        let defaulted = registry
            .dispatch("recall", json!({"key": "icp", "default": "none yet"}))
            .await;
        assert_eq!(defaulted.get("source"), Some(&json!("default")));
    }

    #[tokio::test]
    async fn ensure_inputs_asks_only_for_unknown_keys() {
        let memory = Arc::new(MemoryStore::in_memory());
        memory.remember("company_name", json!("Acme")).await.unwrap();
        let channel = Arc::new(ScriptedChannel::new(["12", "yes"]));
        let registry = registry(memory.clone(), channel.clone());

        let result = registry
            .dispatch(
                "ensure_required_inputs",
                json!({"required_inputs": {
                    "company_name": {"prompt": "Company?"},
                    "leads_count": {"prompt": "How many leads?", "type": "int"}
                }}),
            )
            .await;
        let inputs = result.get("inputs").unwrap();
        assert_eq!(inputs["company_name"], json!("Acme"));
        assert_eq!(inputs["leads_count"], json!(12));
        assert_eq!(channel.asked(), vec!["How many leads?"]);

        let result = registry
            .dispatch(
                "ensure_required_inputs",
                json!({"required_inputs": {"follow_up": {"type": "bool"}}}),
            )
            .await;
        assert_eq!(result.get("inputs").unwrap()["follow_up"], json!(true));
        assert_eq!(channel.asked()[1], "Please provide follow up");

        let remembered = memory.recall("leads_count", None).await.unwrap();
        assert_eq!(remembered.value, json!(12));
    }

    #[tokio::test]
    async fn malformed_spec_is_invalid_arguments() {
        let registry = registry(
            Arc::new(MemoryStore::in_memory()),
            Arc::new(ScriptedChannel::silent()),
        );
        let result = registry
            .dispatch(
                "ensure_required_inputs",
                json!({"required_inputs": {"x": {"options": "not-a-list"}}}),
            )
            .await;
        assert_eq!(result.status(), "error");
        assert!(result.to_value()["error"].as_str().unwrap().starts_with("invalid arguments"));
    }
}
