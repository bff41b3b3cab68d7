//! Capability registry: the fixed action space of the planning loop.
//!
//! Every capability is keyed by the closed [`Capability`] enum, declares a
//! JSON-schema parameter contract, and returns a discriminated
//! [`ToolResult`]. [`ToolRegistry::dispatch`] validates arguments against
//! that contract and routes side-effecting capabilities through a
//! confirmation gate the oracle cannot skip.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::error::ToolError;
use crate::interaction::Interaction;
use crate::provider::ToolDefinition;

/// Every capability the oracle may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    GenerateIcp,
    GetLeads,
    ScrapeWebsite,
    WriteEmail,
    SendEmail,
    LogToCrm,
    AddTask,
    CompleteTask,
    AddTaskNote,
    GetTasks,
    GetUserInput,
    Remember,
    Recall,
    EnsureRequiredInputs,
    ConfirmAction,
}

impl Capability {
    pub const ALL: [Capability; 15] = [
        Self::GenerateIcp,
        Self::GetLeads,
        Self::ScrapeWebsite,
        Self::WriteEmail,
        Self::SendEmail,
        Self::LogToCrm,
        Self::AddTask,
        Self::CompleteTask,
        Self::AddTaskNote,
        Self::GetTasks,
        Self::GetUserInput,
        Self::Remember,
        Self::Recall,
        Self::EnsureRequiredInputs,
        Self::ConfirmAction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GenerateIcp => "generate_icp",
            Self::GetLeads => "get_leads",
            Self::ScrapeWebsite => "scrape_website",
            Self::WriteEmail => "write_email",
            Self::SendEmail => "send_email",
            Self::LogToCrm => "log_to_crm",
            Self::AddTask => "add_task",
            Self::CompleteTask => "complete_task",
            Self::AddTaskNote => "add_task_note",
            Self::GetTasks => "get_tasks",
            Self::GetUserInput => "get_user_input",
            Self::Remember => "remember",
            Self::Recall => "recall",
            Self::EnsureRequiredInputs => "ensure_required_inputs",
            Self::ConfirmAction => "confirm_action",
        }
    }

    /// Look up a capability by its wire name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Whether invoking this capability is visible to a third party.
    pub fn has_external_side_effect(&self) -> bool {
        matches!(self, Self::SendEmail)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of a capability, discriminated by `status`.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    /// `{"status": "success", ...fields}`
    Success(Map<String, Value>),
    /// `{"status": "cancelled", "message": ...}`; a user decline, not a failure
    Cancelled(String),
    /// `{"status": "error", "error": ...}`
    Error(String),
}

impl ToolResult {
    /// Build a success result. Object fields are flattened into the result;
    /// any other value is stored under `value`.
    pub fn success(fields: Value) -> Self {
        match fields {
            Value::Object(map) => Self::Success(map),
            Value::Null => Self::Success(Map::new()),
            other => {
                let mut map = Map::new();
                map.insert("value".into(), other);
                Self::Success(map)
            }
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled(message.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Cancelled(_) => "cancelled",
            Self::Error(_) => "error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// A field of a success result.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Success(map) => map.get(key),
            _ => None,
        }
    }

    /// The JSON object the oracle sees.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert("status".into(), Value::from(self.status()));
        match self {
            Self::Success(fields) => {
                for (k, v) in fields {
                    if k != "status" {
                        out.insert(k.clone(), v.clone());
                    }
                }
            }
            Self::Cancelled(message) => {
                out.insert("message".into(), Value::from(message.as_str()));
            }
            Self::Error(message) => {
                out.insert("error".into(), Value::from(message.as_str()));
            }
        }
        Value::Object(out)
    }
}

/// The core Tool trait.
///
/// Each capability implements this trait. Implementations are pure
/// request/response; the only shared state they touch (memory store,
/// task graph) is handed to them at construction.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Which capability this tool implements.
    fn capability(&self) -> Capability;

    /// A description of what this capability does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this capability's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute with already-validated arguments.
    async fn execute(&self, arguments: Value) -> std::result::Result<ToolResult, ToolError>;

    /// Full human-readable rendering of a pending call, shown by the gate.
    fn preview(&self, arguments: &Value) -> String {
        serde_json::to_string_pretty(arguments).unwrap_or_else(|_| arguments.to_string())
    }

    /// Phrase completing "Do you want to ...?" for the gate.
    fn confirmation_label(&self) -> String {
        format!("run {}", self.capability())
    }

    /// Message returned when the user declines the gate.
    fn cancellation_message(&self) -> String {
        format!("{} cancelled by user", self.capability())
    }

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.capability().as_str().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Check `arguments` against a JSON-schema-like parameter contract.
///
/// Supports `type: object`, `required`, and per-property primitive `type`.
/// Properties not declared in the schema are accepted.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> std::result::Result<(), ToolError> {
    let args = arguments
        .as_object()
        .ok_or_else(|| ToolError::InvalidArguments("arguments must be a JSON object".into()))?;

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if args.get(field).is_none_or(Value::is_null) {
                return Err(ToolError::InvalidArguments(format!(
                    "missing required field '{field}'"
                )));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (field, value) in args {
            if value.is_null() {
                continue;
            }
            let Some(expected) = properties
                .get(field)
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            let ok = match expected {
                "string" => value.is_string(),
                "integer" => value.is_i64() || value.is_u64(),
                "number" => value.is_number(),
                "boolean" => value.is_boolean(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                _ => true,
            };
            if !ok {
                return Err(ToolError::InvalidArguments(format!(
                    "field '{field}' must be of type {expected}"
                )));
            }
        }
    }

    Ok(())
}

/// A registry of available capabilities.
///
/// The planning loop uses this to:
/// 1. Get capability definitions to send to the LLM
/// 2. Dispatch the oracle's selection and get a discriminated result back
pub struct ToolRegistry {
    tools: BTreeMap<Capability, Box<dyn Tool>>,
    gate: Option<Arc<dyn Interaction>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
            gate: None,
        }
    }

    /// Route confirmation of side-effecting capabilities through `interaction`.
    ///
    /// Without a gate, side-effecting capabilities are always declined.
    pub fn with_gate(mut self, interaction: Arc<dyn Interaction>) -> Self {
        self.gate = Some(interaction);
        self
    }

    /// Register a tool. Replaces any existing tool for the same capability.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.capability(), tool);
    }

    /// Get a tool by capability.
    pub fn get(&self, capability: Capability) -> Option<&dyn Tool> {
        self.tools.get(&capability).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// List all registered capability names.
    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().map(Capability::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch a capability by wire name.
    ///
    /// Never fails: unknown names, invalid arguments, declined confirmation
    /// and execution errors all come back as a [`ToolResult`].
    pub async fn dispatch(&self, name: &str, arguments: Value) -> ToolResult {
        let Some(tool) = Capability::parse(name).and_then(|c| self.tools.get(&c)) else {
            warn!(capability = %name, "Unknown capability requested");
            return ToolResult::error("capability not found");
        };

        let arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        if let Err(e) = validate_arguments(&tool.parameters_schema(), &arguments) {
            warn!(capability = %name, error = %e, "Rejected capability arguments");
            return ToolResult::error(e.to_string());
        }

        if tool.capability().has_external_side_effect()
            && !self.confirm(tool.as_ref(), &arguments).await
        {
            info!(capability = %name, "Side effect declined");
            return ToolResult::cancelled(tool.cancellation_message());
        }

        debug!(capability = %name, "Dispatching capability");
        match tool.execute(arguments).await {
            Ok(result) => result,
            Err(e) => {
                warn!(capability = %name, error = %e, "Capability failed");
                ToolResult::error(e.to_string())
            }
        }
    }

    async fn confirm(&self, tool: &dyn Tool, arguments: &Value) -> bool {
        let Some(gate) = &self.gate else {
            return false;
        };

        let shown = gate
            .show(&format!("\nPending action:\n{}", tool.preview(arguments)))
            .await;
        if let Err(e) = shown {
            warn!(error = %e, "Could not display pending action");
            return false;
        }

        match gate.confirm(&tool.confirmation_label(), false).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Confirmation unavailable, declining");
                false
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChannelError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn capability(&self) -> Capability {
            Capability::Remember
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "key": { "type": "string" },
                    "value": { "type": "string" }
                },
                "required": ["key", "value"]
            })
        }
        async fn execute(&self, arguments: Value) -> std::result::Result<ToolResult, ToolError> {
            Ok(ToolResult::success(arguments))
        }
    }

    struct SpySend {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for SpySend {
        fn capability(&self) -> Capability {
            Capability::SendEmail
        }
        fn description(&self) -> &str {
            "Send"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": { "recipient_email": { "type": "string" } },
                "required": ["recipient_email"]
            })
        }
        async fn execute(&self, _arguments: Value) -> std::result::Result<ToolResult, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ToolResult::success(serde_json::json!({"provider": "spy"})))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn capability(&self) -> Capability {
            Capability::GetLeads
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _arguments: Value) -> std::result::Result<ToolResult, ToolError> {
            Err(ToolError::ExecutionFailed {
                tool_name: "get_leads".into(),
                reason: "upstream down".into(),
            })
        }
    }

    struct FixedAnswer(&'static str);

    #[async_trait]
    impl Interaction for FixedAnswer {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn ask(&self, _prompt: &str) -> std::result::Result<String, ChannelError> {
            Ok(self.0.to_string())
        }
        async fn show(&self, _text: &str) -> std::result::Result<(), ChannelError> {
            Ok(())
        }
    }

    fn spy_registry(answer: Option<&'static str>) -> (ToolRegistry, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        if let Some(answer) = answer {
            registry = registry.with_gate(Arc::new(FixedAnswer(answer)));
        }
        registry.register(Box::new(SpySend { calls: calls.clone() }));
        (registry, calls)
    }

    #[test]
    fn capability_names_round_trip() {
        for cap in Capability::ALL {
            assert_eq!(Capability::parse(cap.as_str()), Some(cap));
        }
        assert_eq!(Capability::parse("shell"), None);
        assert_eq!(Capability::ALL.iter().filter(|c| c.has_external_side_effect()).count(), 1);
    }

    #[test]
    fn result_shapes() {
        assert_eq!(
            ToolResult::error("boom").to_value(),
            serde_json::json!({"status": "error", "error": "boom"})
        );
        assert_eq!(
            ToolResult::cancelled("no").to_value(),
            serde_json::json!({"status": "cancelled", "message": "no"})
        );
        let ok = ToolResult::success(serde_json::json!({"count": 2, "status": "ignored"}));
        assert_eq!(ok.to_value(), serde_json::json!({"status": "success", "count": 2}));
    }

    #[tokio::test]
    async fn unknown_capability_is_structured_error() {
        let registry = ToolRegistry::new();
        let result = registry.dispatch("launch_rockets", serde_json::json!({})).await;
        assert_eq!(result, ToolResult::error("capability not found"));
    }

    #[tokio::test]
    async fn missing_required_argument_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let result = registry.dispatch("remember", serde_json::json!({"key": "k"})).await;
        assert!(matches!(result, ToolResult::Error(ref m) if m.contains("'value'")));
    }

    #[tokio::test]
    async fn wrong_argument_type_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let result = registry
            .dispatch("remember", serde_json::json!({"key": "k", "value": 3}))
            .await;
        assert!(matches!(result, ToolResult::Error(ref m) if m.contains("type string")));
    }

    #[tokio::test]
    async fn valid_call_reaches_the_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let result = registry
            .dispatch("remember", serde_json::json!({"key": "k", "value": "v"}))
            .await;
        assert_eq!(result.get("value"), Some(&Value::from("v")));
    }

    #[tokio::test]
    async fn execution_error_becomes_result() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(FailingTool));
        let result = registry.dispatch("get_leads", Value::Null).await;
        assert!(matches!(result, ToolResult::Error(ref m) if m.contains("upstream down")));
    }

    #[tokio::test]
    async fn declined_gate_never_invokes_transport() {
        let (registry, calls) = spy_registry(Some("n"));
        let result = registry
            .dispatch("send_email", serde_json::json!({"recipient_email": "a@b.com"}))
            .await;
        assert_eq!(result.status(), "cancelled");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn default_answer_declines() {
        let (registry, calls) = spy_registry(Some(""));
        let result = registry
            .dispatch("send_email", serde_json::json!({"recipient_email": "a@b.com"}))
            .await;
        assert_eq!(result.status(), "cancelled");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn gate_cannot_be_skipped_by_arguments() {
        let (registry, calls) = spy_registry(None);
        let result = registry
            .dispatch(
                "send_email",
                serde_json::json!({
                    "recipient_email": "a@b.com",
                    "confirmed": true,
                    "skip_confirmation": true
                }),
            )
            .await;
        assert_eq!(result.status(), "cancelled");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn accepted_gate_invokes_transport_once() {
        let (registry, calls) = spy_registry(Some("y"));
        let result = registry
            .dispatch("send_email", serde_json::json!({"recipient_email": "a@b.com"}))
            .await;
        assert!(result.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn definitions_are_ordered_by_capability() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        registry.register(Box::new(FailingTool));
        assert_eq!(registry.names(), vec!["get_leads", "remember"]);
        assert_eq!(registry.definitions()[1].name, "remember");
    }
}
