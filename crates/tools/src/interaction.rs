//! Capabilities that talk to the person running the agent.

use async_trait::async_trait;
use prospector_core::error::ToolError;
use prospector_core::interaction::Interaction;
use prospector_core::tool::{Capability, Tool, ToolResult};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::args::{optional_str, required_str, string_list};

pub struct GetUserInputTool {
    interaction: Arc<dyn Interaction>,
}

impl GetUserInputTool {
    pub fn new(interaction: Arc<dyn Interaction>) -> Self {
        Self { interaction }
    }
}

#[async_trait]
impl Tool for GetUserInputTool {
    fn capability(&self) -> Capability {
        Capability::GetUserInput
    }

    fn description(&self) -> &str {
        "Ask the user a question and return their answer. Use options to restrict \
         the answer to a fixed set; an empty answer takes the default."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": { "type": "string", "description": "The question to ask" },
                "default": {
                    "type": "string",
                    "description": "Answer used when the user just presses enter"
                },
                "options": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Allowed answers"
                }
            },
            "required": ["prompt"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let prompt = required_str(&arguments, "prompt")?;
        let default = optional_str(&arguments, "default");
        let options = string_list(&arguments, "options");

        let input = self
            .interaction
            .get_user_input(prompt, default, &options)
            .await?;
        Ok(ToolResult::success(json!({ "input": input })))
    }
}

pub struct ConfirmActionTool {
    interaction: Arc<dyn Interaction>,
}

impl ConfirmActionTool {
    pub fn new(interaction: Arc<dyn Interaction>) -> Self {
        Self { interaction }
    }
}

#[async_trait]
impl Tool for ConfirmActionTool {
    fn capability(&self) -> Capability {
        Capability::ConfirmAction
    }

    fn description(&self) -> &str {
        "Ask the user a yes/no question about an action, e.g. 'proceed with these leads'."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action_description": {
                    "type": "string",
                    "description": "Completes the question 'Do you want to ...?'"
                },
                "default": {
                    "type": "boolean",
                    "description": "Answer when the user just presses enter (default false)"
                }
            },
            "required": ["action_description"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let description = required_str(&arguments, "action_description")?;
        let default = arguments
            .get("default")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let confirmed = self.interaction.confirm(description, default).await?;
        Ok(ToolResult::success(json!({ "confirmed": confirmed })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospector_channels::ScriptedChannel;

    #[tokio::test]
    async fn input_with_default() {
        let channel = Arc::new(ScriptedChannel::new([""]));
        let tool = GetUserInputTool::new(channel.clone());
        let result = tool
            .execute(json!({"prompt": "How many leads?", "default": "5"}))
            .await
            .unwrap();
        assert_eq!(result.get("input"), Some(&json!("5")));
        assert_eq!(channel.asked(), vec!["How many leads? [default: 5]"]);
    }

    #[tokio::test]
    async fn input_restricted_to_options() {
        let channel = Arc::new(ScriptedChannel::new(["maybe", "b"]));
        let tool = GetUserInputTool::new(channel.clone());
        let result = tool
            .execute(json!({"prompt": "Pick", "options": ["a", "b"]}))
            .await
            .unwrap();
        assert_eq!(result.get("input"), Some(&json!("b")));
        assert_eq!(channel.asked().len(), 2);
    }

    #[tokio::test]
    async fn confirm_defaults_to_no() {
        let channel = Arc::new(ScriptedChannel::new([""]));
        let tool = ConfirmActionTool::new(channel.clone());
        let result = tool
            .execute(json!({"action_description": "proceed with these leads"}))
            .await
            .unwrap();
        assert_eq!(result.get("confirmed"), Some(&json!(false)));
        assert_eq!(
            channel.asked(),
            vec!["Do you want to proceed with these leads? (y/N)"]
        );
    }

    #[tokio::test]
    async fn closed_input_is_an_error_result() {
        let channel: Arc<dyn Interaction> = Arc::new(ScriptedChannel::silent());
        let mut registry = prospector_core::ToolRegistry::new();
        registry.register(Box::new(ConfirmActionTool::new(channel)));
        let result = registry
            .dispatch("confirm_action", json!({"action_description": "go", "default": true}))
            .await;
        assert_eq!(result.status(), "error");
    }
}
