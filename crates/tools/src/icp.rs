//! `generate_icp`: turn a free-text request into an Ideal Customer Profile.
//!
//! A profile already in memory is reused as-is. Otherwise the oracle
//! extracts one, with keyword rules as the fallback, and any field still
//! missing is asked of the user. The result is remembered under `icp`.

use async_trait::async_trait;
use prospector_core::domain::Icp;
use prospector_core::error::ToolError;
use prospector_core::interaction::Interaction;
use prospector_core::message::Message;
use prospector_core::provider::{Provider, ProviderRequest};
use prospector_core::tool::{Capability, Tool, ToolResult};
use prospector_memory::MemoryStore;
use regex_lite::Regex;
use serde_json::{Value, json};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

use crate::args::required_str;

pub const ICP_MEMORY_KEY: &str = "icp";

const DEFAULT_GOAL: &str = "Book meetings";

/// Fields asked of the user when extraction leaves them empty.
const ASK_FOR: [(&str, &str, &str); 4] = [
    ("industry", "What industry are you targeting?", "SaaS"),
    ("location", "What location are you targeting?", "United States"),
    ("role", "What role are you targeting?", "Founder"),
    (
        "product",
        "What product/service are you offering?",
        "an AI that improves business efficiency",
    ),
];

const INDUSTRIES: [&str; 9] = [
    "SaaS",
    "AI",
    "Finance",
    "Healthcare",
    "Education",
    "E-commerce",
    "Retail",
    "Manufacturing",
    "Technology",
];

/// Keyword, canonical location.
const LOCATIONS: [(&str, &str); 9] = [
    ("United States", "United States"),
    ("USA", "United States"),
    ("US", "United States"),
    ("Europe", "Europe"),
    ("UK", "United Kingdom"),
    ("Canada", "Canada"),
    ("Australia", "Australia"),
    ("Germany", "Germany"),
    ("France", "France"),
];

const ROLES: [&str; 10] = [
    "Founder", "CEO", "CTO", "CFO", "COO", "CMO", "VP", "Director", "Manager", "Owner",
];

static PRODUCT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:selling|offering|with|about|for|our)\s+([^.]+)").ok()
});

const EXTRACTION_PROMPT: &str = "Extract the following information from the request below:
1. goal (e.g. Book meetings, Generate leads)
2. industry (e.g. SaaS, AI, Finance)
3. location (e.g. United States, Europe)
4. role (e.g. Founder, CEO, CTO)
5. product: a short description of what is being sold

Respond with a single JSON object with the keys goal, industry, location, role and product.
Use null for anything the request does not say.

Request: ";

/// Whole-word match for single words, substring match for phrases.
fn mentions(lower: &str, words: &[&str], keyword: &str) -> bool {
    let keyword = keyword.to_lowercase();
    if keyword.contains(' ') || keyword.contains('-') {
        return lower.contains(&keyword);
    }
    words
        .iter()
        .any(|w| *w == keyword || w.strip_suffix('s') == Some(keyword.as_str()))
}

/// Keyword-table extraction used when the oracle is unavailable.
pub fn extract_rule_based(prompt: &str) -> Icp {
    let lower = prompt.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let goal = if lower.contains("book") && (lower.contains("meeting") || lower.contains("call")) {
        DEFAULT_GOAL
    } else if lower.contains("demo") {
        "Schedule product demos"
    } else if lower.contains("lead") || lower.contains("prospect") {
        "Generate leads"
    } else {
        DEFAULT_GOAL
    };

    let industry = INDUSTRIES
        .iter()
        .find(|kw| mentions(&lower, &words, kw))
        .map(|s| s.to_string());
    let location = LOCATIONS
        .iter()
        .find(|(kw, _)| mentions(&lower, &words, kw))
        .map(|(_, canonical)| canonical.to_string());
    let role = ROLES
        .iter()
        .find(|kw| mentions(&lower, &words, kw))
        .map(|s| s.to_string());
    let product = PRODUCT
        .as_ref()
        .and_then(|re| re.captures(prompt))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());

    Icp {
        goal: Some(goal.to_string()),
        industry,
        location,
        role,
        product,
    }
}

/// The outermost `{...}` span of `text`, parsed as an ICP.
pub fn parse_icp_json(text: &str) -> Option<Icp> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    let value: Value = serde_json::from_str(&text[start..=end]).ok()?;
    let mut icp = Icp::default();
    for field in Icp::FIELDS {
        match value.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => icp.set(field, s.trim()),
            Some(Value::Number(n)) => icp.set(field, n.to_string()),
            _ => {}
        }
    }
    Some(icp)
}

fn has_targeting(icp: &Icp) -> bool {
    ["industry", "location", "role", "product"]
        .iter()
        .any(|f| icp.get(f).is_some_and(|v| !v.trim().is_empty()))
}

pub struct GenerateIcpTool {
    memory: Arc<MemoryStore>,
    interaction: Arc<dyn Interaction>,
    oracle: Option<Arc<dyn Provider>>,
    model: String,
}

impl GenerateIcpTool {
    pub fn new(memory: Arc<MemoryStore>, interaction: Arc<dyn Interaction>) -> Self {
        Self {
            memory,
            interaction,
            oracle: None,
            model: String::new(),
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        self.oracle = Some(oracle);
        self.model = model.into();
        self
    }

    async fn extract_with_oracle(&self, prompt: &str) -> Option<Icp> {
        let oracle = self.oracle.as_ref()?;
        let request = ProviderRequest::new(
            &self.model,
            vec![Message::user(format!("{EXTRACTION_PROMPT}{prompt}"))],
        );
        match oracle.complete(request).await {
            Ok(response) => {
                let parsed = parse_icp_json(&response.message.content);
                if parsed.is_none() {
                    warn!("Oracle ICP reply was not JSON, using keyword rules");
                }
                parsed
            }
            Err(e) => {
                warn!(error = %e, "Oracle ICP extraction failed, using keyword rules");
                None
            }
        }
    }

    async fn extract(&self, prompt: &str) -> Icp {
        let rules = extract_rule_based(prompt);
        match self.extract_with_oracle(prompt).await {
            Some(mut icp) if has_targeting(&icp) => {
                debug!("ICP extracted by oracle");
                icp.merge_missing(&rules);
                icp
            }
            _ => rules,
        }
    }
}

#[async_trait]
impl Tool for GenerateIcpTool {
    fn capability(&self) -> Capability {
        Capability::GenerateIcp
    }

    fn description(&self) -> &str {
        "Build the Ideal Customer Profile (goal, industry, location, role, product) \
         from the user's request. Reuses a remembered profile; asks the user for \
         anything missing."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": { "type": "string", "description": "The user's original request" },
                "ask_for_missing": {
                    "type": "boolean",
                    "description":
                        "Ask the user for fields that could not be extracted (default true)"
                }
            },
            "required": ["prompt"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        if let Ok(recalled) = self.memory.recall(ICP_MEMORY_KEY, None).await {
            if let Ok(icp) = serde_json::from_value::<Icp>(recalled.value.clone()) {
                info!("Using ICP from memory");
                return Ok(ToolResult::success(json!({ "icp": icp })));
            }
        }

        let prompt = required_str(&arguments, "prompt")?;
        let ask_for_missing = arguments
            .get("ask_for_missing")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        let mut icp = self.extract(prompt).await;
        if icp.goal.as_deref().is_none_or(|g| g.trim().is_empty()) {
            icp.goal = Some(DEFAULT_GOAL.to_string());
        }

        if ask_for_missing {
            for (field, question, default) in ASK_FOR {
                if icp.get(field).is_none_or(|v| v.trim().is_empty()) {
                    let answer = self
                        .interaction
                        .get_user_input(question, Some(default), &[])
                        .await?;
                    icp.set(field, answer);
                }
            }
        }

        let value = serde_json::to_value(&icp).map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.capability().to_string(),
            reason: e.to_string(),
        })?;
        self.memory.remember(ICP_MEMORY_KEY, value.clone()).await?;
        info!(
            industry = ?icp.industry,
            role = ?icp.role,
            location = ?icp.location,
            "ICP generated"
        );

        Ok(ToolResult::success(json!({ "icp": value })))
    }
}
