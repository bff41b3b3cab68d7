//! The planning loop.
//!
//! Each turn projects the conversation, asks the oracle for the next
//! action, and either dispatches the selected capability (recording its
//! result as an observation) or shows the oracle's message and checks the
//! stop conditions. Turns run strictly one after another.

use prospector_config::{AgentSettings, RunMode};
use prospector_core::error::Error;
use prospector_core::interaction::Interaction;
use prospector_core::message::{Conversation, Message, MessageToolCall};
use prospector_core::provider::{Provider, ProviderRequest};
use prospector_core::tool::{Capability, ToolRegistry, ToolResult};
use prospector_core::Lead;
use prospector_workflow::SharedTaskGraph;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::history;
use crate::prompt::system_prompt;

/// Shown in place of the oracle's reply when the oracle cannot be reached.
pub const ORACLE_FAILURE_MESSAGE: &str =
    "I'm having trouble connecting to the Deepseek API. Please check your API key and try again.";

/// Sampling temperature for planning turns.
pub const PLANNING_TEMPERATURE: f32 = 0.2;

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The oracle's message contained a completion keyword.
    CompletionKeyword,
    /// Every task in the graph is Completed.
    TasksExhausted,
    /// The turn budget ran out.
    TurnBudget,
    /// A turn failed in an unattended run.
    TurnFailed(String),
    /// A turn failed and the user chose not to continue.
    UserAborted(String),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CompletionKeyword => f.write_str("completion keyword"),
            Self::TasksExhausted => f.write_str("all tasks completed"),
            Self::TurnBudget => f.write_str("turn budget reached"),
            Self::TurnFailed(e) => write!(f, "turn failed: {e}"),
            Self::UserAborted(e) => write!(f, "aborted after error: {e}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub turns: usize,
    pub stop_reason: StopReason,
    /// The most recent batch returned by `get_leads`.
    pub leads: Vec<Lead>,
    pub conversation: Conversation,
}

enum TurnOutcome {
    Continue,
    Stop(StopReason),
}

pub struct PlanningLoop {
    oracle: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    tools: Arc<ToolRegistry>,
    tasks: SharedTaskGraph,
    interaction: Arc<dyn Interaction>,
    max_turns: usize,
    turn_delay: Duration,
    mode: RunMode,
    completion_keywords: Vec<String>,
}

impl PlanningLoop {
    pub fn new(
        oracle: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        tasks: SharedTaskGraph,
        interaction: Arc<dyn Interaction>,
    ) -> Self {
        Self {
            oracle,
            model: model.into(),
            temperature: PLANNING_TEMPERATURE,
            tools,
            tasks,
            interaction,
            max_turns: 0,
            turn_delay: Duration::ZERO,
            mode: RunMode::default(),
            completion_keywords: Vec::new(),
        }
        .with_settings(&AgentSettings::default())
    }

    /// Apply `[agent]`: turn budget, pacing, mode, completion keywords.
    pub fn with_settings(mut self, settings: &AgentSettings) -> Self {
        self.max_turns = settings.max_turns;
        self.turn_delay = Duration::from_millis(settings.turn_delay_ms);
        self.mode = settings.mode;
        self.completion_keywords = settings
            .completion_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .collect();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_turn_delay(mut self, delay: Duration) -> Self {
        self.turn_delay = delay;
        self
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run until a stop condition holds. Never returns an error: turn
    /// failures end up in [`StopReason`].
    pub async fn run(&self, prompt: &str) -> RunSummary {
        info!(
            mode = ?self.mode,
            max_turns = self.max_turns,
            capabilities = self.tools.len(),
            "Starting planning loop"
        );

        let mut conversation = Conversation::new();
        conversation.push(Message::system(system_prompt(&self.tools)));
        conversation.push(Message::user(format!("I need help with the following: {prompt}")));

        let mut leads = Vec::new();
        let mut turns = 0;
        let stop_reason = loop {
            if turns >= self.max_turns {
                info!(turns, "Turn budget reached");
                break StopReason::TurnBudget;
            }
            if turns > 0 && !self.turn_delay.is_zero() {
                tokio::time::sleep(self.turn_delay).await;
            }
            turns += 1;
            debug!(turn = turns, conversation_id = %conversation.id, "Planning turn");

            match self.turn(&mut conversation, &mut leads).await {
                Ok(TurnOutcome::Continue) => {}
                Ok(TurnOutcome::Stop(reason)) => break reason,
                Err(e) => {
                    warn!(turn = turns, error = %e, "Planning turn failed");
                    if let Some(reason) = self.on_turn_failure(&e).await {
                        break reason;
                    }
                }
            }
        };

        info!(turns, stop_reason = %stop_reason, leads = leads.len(), "Planning loop stopped");
        RunSummary {
            turns,
            stop_reason,
            leads,
            conversation,
        }
    }

    async fn turn(
        &self,
        conversation: &mut Conversation,
        leads: &mut Vec<Lead>,
    ) -> Result<TurnOutcome, Error> {
        let request = ProviderRequest::new(&self.model, history::project(conversation))
            .with_temperature(self.temperature)
            .with_tools(self.tools.definitions());

        let message = match self.oracle.complete(request).await {
            Ok(response) => {
                if let Some(usage) = &response.usage {
                    debug!(
                        model = %response.model,
                        tokens = usage.total_tokens,
                        "Oracle responded"
                    );
                }
                response.message
            }
            Err(e) => {
                warn!(oracle = self.oracle.name(), error = %e, "Oracle call failed");
                Message::assistant(ORACLE_FAILURE_MESSAGE)
            }
        };

        let call = message.tool_calls.first().cloned();
        let text = message.content.clone();
        conversation.push(message);

        match call {
            Some(call) => {
                self.execute_call(conversation, leads, &call).await?;
                Ok(TurnOutcome::Continue)
            }
            None => self.conclude(&text).await,
        }
    }

    async fn execute_call(
        &self,
        conversation: &mut Conversation,
        leads: &mut Vec<Lead>,
        call: &MessageToolCall,
    ) -> Result<(), Error> {
        info!(capability = %call.name, "Capability selected");

        let result = match parse_arguments(&call.arguments) {
            Ok(arguments) => {
                if self.mode.is_interactive() {
                    let pretty = serde_json::to_string_pretty(&arguments)?;
                    self.interaction
                        .show(&format!("\nExecuting: {}\nArguments: {pretty}", call.name))
                        .await?;
                }
                self.tools.dispatch(&call.name, arguments).await
            }
            Err(e) => {
                warn!(capability = %call.name, error = %e, "Oracle produced malformed arguments");
                ToolResult::error(format!("invalid arguments: {e}"))
            }
        };

        if call.name == Capability::GetLeads.as_str() {
            if let Some(batch) = result.get("leads") {
                match serde_json::from_value::<Vec<Lead>>(batch.clone()) {
                    Ok(batch) => *leads = batch,
                    Err(e) => warn!(error = %e, "Lead batch was not readable"),
                }
            }
        }

        debug!(capability = %call.name, status = result.status(), "Observation recorded");
        conversation.push(Message::observation(&call.name, result.to_value().to_string()));
        Ok(())
    }

    /// Show a plain oracle message and check both stop signals.
    async fn conclude(&self, text: &str) -> Result<TurnOutcome, Error> {
        self.interaction.show(&format!("\nAssistant: {text}")).await?;

        let lower = text.to_lowercase();
        if self.completion_keywords.iter().any(|k| lower.contains(k.as_str())) {
            info!("Oracle reported completion");
            return Ok(TurnOutcome::Stop(StopReason::CompletionKeyword));
        }

        let snapshot = self.tasks.lock().await.snapshot();
        if snapshot.is_finished() {
            info!(count = snapshot.count, "All tasks completed");
            return Ok(TurnOutcome::Stop(StopReason::TasksExhausted));
        }
        Ok(TurnOutcome::Continue)
    }

    /// Interactive runs ask whether to go on (default: stop); unattended runs stop.
    async fn on_turn_failure(&self, error: &Error) -> Option<StopReason> {
        let message = error.to_string();
        if !self.mode.is_interactive() {
            return Some(StopReason::TurnFailed(message));
        }

        match self.interaction.confirm("continue after this error", false).await {
            Ok(true) => None,
            Ok(false) => Some(StopReason::UserAborted(message)),
            Err(e) => {
                warn!(error = %e, "Could not ask whether to continue");
                Some(StopReason::UserAborted(message))
            }
        }
    }
}

/// Oracle arguments as JSON; an empty string means no arguments.
fn parse_arguments(raw: &str) -> Result<Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SequentialMockProvider, call_response, text_response};
    use async_trait::async_trait;
    use prospector_channels::ScriptedChannel;
    use prospector_core::error::{ChannelError, ProviderError, ToolError};
    use prospector_core::tool::Tool;
    use prospector_workflow::TaskGraph;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct StubLeads;

    #[async_trait]
    impl Tool for StubLeads {
        fn capability(&self) -> Capability {
            Capability::GetLeads
        }
        fn description(&self) -> &str {
            "Find leads"
        }
        fn parameters_schema(&self) -> Value {
            json!({ "type": "object", "properties": { "industry": { "type": "string" } } })
        }
        async fn execute(&self, _arguments: Value) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::success(json!({
                "count": 1,
                "source": "stub",
                "leads": [{
                    "name": "Alice Smith",
                    "company": "GrowthAI",
                    "email": "alice@growthai.io"
                }]
            })))
        }
    }

    /// Displays always fail; questions take scripted answers.
    struct BrokenDisplay {
        answers: Mutex<VecDeque<String>>,
    }

    #[async_trait]
    impl Interaction for BrokenDisplay {
        fn name(&self) -> &str {
            "broken"
        }
        async fn ask(&self, prompt: &str) -> Result<String, ChannelError> {
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ChannelError::InputClosed(prompt.to_string()))
        }
        async fn show(&self, _text: &str) -> Result<(), ChannelError> {
            Err(ChannelError::ConnectionLost("stdout closed".into()))
        }
    }

    fn planner(
        oracle: Arc<SequentialMockProvider>,
        tools: ToolRegistry,
        tasks: SharedTaskGraph,
    ) -> (PlanningLoop, Arc<ScriptedChannel>) {
        let channel = Arc::new(ScriptedChannel::silent());
        let planner = PlanningLoop::new(
            oracle,
            "mock-model",
            Arc::new(tools),
            tasks,
            channel.clone(),
        )
        .with_mode(RunMode::Auto)
        .with_turn_delay(Duration::ZERO);
        (planner, channel)
    }

    #[tokio::test]
    async fn stops_exactly_at_turn_budget() {
        let oracle = Arc::new(SequentialMockProvider::texts(&["Still working on it."]));
        let (planner, _) = planner(oracle.clone(), ToolRegistry::new(), TaskGraph::new().shared());

        let summary = planner.with_max_turns(7).run("find founders").await;
        assert_eq!(summary.stop_reason, StopReason::TurnBudget);
        assert_eq!(summary.turns, 7);
        assert_eq!(oracle.call_count(), 7);
    }

    #[tokio::test]
    async fn default_budget_is_fifty_turns() {
        let oracle = Arc::new(SequentialMockProvider::texts(&["Thinking."]));
        let (planner, _) = planner(oracle.clone(), ToolRegistry::new(), TaskGraph::new().shared());

        let summary = planner.run("x").await;
        assert_eq!(summary.turns, 50);
        assert_eq!(oracle.call_count(), 50);
    }

    #[tokio::test]
    async fn completion_keyword_stops_the_run() {
        let oracle = Arc::new(SequentialMockProvider::texts(&[
            "Let me look into that.",
            "Outreach is Finished for today.",
        ]));
        let (planner, channel) =
            planner(oracle.clone(), ToolRegistry::new(), TaskGraph::new().shared());

        let summary = planner.run("x").await;
        assert_eq!(summary.stop_reason, StopReason::CompletionKeyword);
        assert_eq!(summary.turns, 2);
        assert!(channel.shown().iter().any(|s| s.contains("Outreach is Finished")));
    }

    #[tokio::test]
    async fn fully_completed_graph_stops_the_run() {
        let tasks = TaskGraph::new().shared();
        {
            let mut graph = tasks.lock().await;
            let task = graph.add_task("Find leads", vec![]);
            graph.complete_task(task.id.as_str()).unwrap();
        }
        let oracle = Arc::new(SequentialMockProvider::texts(&["Here is a summary."]));
        let (planner, _) = planner(oracle, ToolRegistry::new(), tasks);

        let summary = planner.run("x").await;
        assert_eq!(summary.stop_reason, StopReason::TasksExhausted);
        assert_eq!(summary.turns, 1);
    }

    #[tokio::test]
    async fn failed_task_keeps_the_run_going() {
        let tasks = TaskGraph::new().shared();
        {
            let mut graph = tasks.lock().await;
            let a = graph.add_task("Find leads", vec![]);
            let b = graph.add_task("Send emails", vec![]);
            graph.complete_task(a.id.as_str()).unwrap();
            graph.fail_task(b.id.as_str(), "no transport").unwrap();
        }
        let oracle = Arc::new(SequentialMockProvider::texts(&["Waiting."]));
        let (planner, _) = planner(oracle, ToolRegistry::new(), tasks);

        let summary = planner.with_max_turns(3).run("x").await;
        assert_eq!(summary.stop_reason, StopReason::TurnBudget);
    }

    #[tokio::test]
    async fn empty_graph_never_counts_as_finished() {
        let oracle = Arc::new(SequentialMockProvider::texts(&["Nothing planned yet."]));
        let (planner, _) = planner(oracle, ToolRegistry::new(), TaskGraph::new().shared());

        let summary = planner.with_max_turns(2).run("x").await;
        assert_eq!(summary.stop_reason, StopReason::TurnBudget);
    }

    #[tokio::test]
    async fn capability_result_is_observed_and_leads_cached() {
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(StubLeads));
        let oracle = Arc::new(SequentialMockProvider::new(vec![
            call_response("get_leads", r#"{"industry": "SaaS"}"#),
            text_response("All done, outreach completed."),
        ]));
        let (planner, _) = planner(oracle.clone(), tools, TaskGraph::new().shared());

        let summary = planner.run("find SaaS founders").await;
        assert_eq!(summary.stop_reason, StopReason::CompletionKeyword);
        assert_eq!(summary.leads.len(), 1);
        assert_eq!(summary.leads[0].company, "GrowthAI");

        let requests = oracle.requests();
        let second = &requests[1];
        let observed = &second.messages.last().unwrap().content;
        assert!(observed.starts_with("Function response: "));
        assert!(observed.contains(r#""status":"success""#));
    }

    #[tokio::test]
    async fn request_carries_schema_and_auto_selection() {
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(StubLeads));
        let oracle = Arc::new(SequentialMockProvider::texts(&["completed"]));
        let (planner, _) = planner(oracle.clone(), tools, TaskGraph::new().shared());

        planner.run("find founders").await;
        let requests = oracle.requests();
        let request = &requests[0];
        assert_eq!(request.tool_choice.as_deref(), Some("auto"));
        assert_eq!(request.tools.len(), 1);
        assert_eq!(request.temperature, PLANNING_TEMPERATURE);
        assert_eq!(request.messages.len(), 1);
        assert!(
            request.messages[0]
                .content
                .ends_with("I need help with the following: find founders")
        );
    }

    #[tokio::test]
    async fn malformed_arguments_become_an_error_observation() {
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(StubLeads));
        let oracle = Arc::new(SequentialMockProvider::new(vec![
            call_response("get_leads", "{industry: SaaS"),
            text_response("completed"),
        ]));
        let (planner, _) = planner(oracle.clone(), tools, TaskGraph::new().shared());

        let summary = planner.run("x").await;
        assert!(summary.leads.is_empty());
        let requests = oracle.requests();
        let observed = &requests[1].messages.last().unwrap().content;
        assert!(observed.contains("invalid arguments"));
        assert!(observed.contains(r#""status":"error""#));
    }

    #[tokio::test]
    async fn unknown_capability_is_reported_not_fatal() {
        let oracle = Arc::new(SequentialMockProvider::new(vec![
            call_response("book_meeting", "{}"),
            text_response("completed"),
        ]));
        let (planner, _) = planner(oracle.clone(), ToolRegistry::new(), TaskGraph::new().shared());

        let summary = planner.run("x").await;
        assert_eq!(summary.turns, 2);
        let requests = oracle.requests();
        let observed = &requests[1].messages.last().unwrap().content;
        assert!(observed.contains("capability not found"));
    }

    #[tokio::test]
    async fn oracle_failure_degrades_to_apology_and_continues() {
        let oracle = Arc::new(SequentialMockProvider::with_outcomes(vec![
            Err(ProviderError::Network("connection refused".into())),
            Ok(text_response("completed")),
        ]));
        let (planner, channel) = planner(oracle, ToolRegistry::new(), TaskGraph::new().shared());

        let summary = planner.run("x").await;
        assert_eq!(summary.turns, 2);
        assert!(channel.shown().iter().any(|s| s.contains(ORACLE_FAILURE_MESSAGE)));
    }

    #[tokio::test]
    async fn unattended_turn_failure_stops_immediately() {
        let oracle = Arc::new(SequentialMockProvider::texts(&["Working."]));
        let console = Arc::new(BrokenDisplay {
            answers: Mutex::new(VecDeque::new()),
        });
        let planner = PlanningLoop::new(
            oracle,
            "m",
            Arc::new(ToolRegistry::new()),
            TaskGraph::new().shared(),
            console,
        )
        .with_mode(RunMode::Auto)
        .with_turn_delay(Duration::ZERO);

        let summary = planner.run("x").await;
        assert_eq!(summary.turns, 1);
        assert!(matches!(
            summary.stop_reason,
            StopReason::TurnFailed(ref e) if e.contains("stdout closed")
        ));
    }

    #[tokio::test]
    async fn interactive_turn_failure_asks_before_continuing() {
        let oracle = Arc::new(SequentialMockProvider::texts(&["Working."]));
        let console = Arc::new(BrokenDisplay {
            answers: Mutex::new(VecDeque::from(["y".to_string(), "".to_string()])),
        });
        let planner = PlanningLoop::new(
            oracle,
            "m",
            Arc::new(ToolRegistry::new()),
            TaskGraph::new().shared(),
            console,
        )
        .with_mode(RunMode::Interactive)
        .with_turn_delay(Duration::ZERO);

        let summary = planner.run("x").await;
        assert_eq!(summary.turns, 2);
        assert!(matches!(summary.stop_reason, StopReason::UserAborted(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn turns_are_paced() {
        let oracle = Arc::new(SequentialMockProvider::texts(&["Working."]));
        let (planner, _) = planner(oracle, ToolRegistry::new(), TaskGraph::new().shared());
        let planner = planner.with_turn_delay(Duration::from_secs(1)).with_max_turns(3);

        let started = tokio::time::Instant::now();
        planner.run("x").await;
        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
