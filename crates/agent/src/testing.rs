//! Scripted oracles for planning loop tests.

use prospector_core::error::ProviderError;
use prospector_core::message::{Message, MessageToolCall};
use prospector_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;

pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A response selecting `name` with raw JSON `arguments`.
pub fn call_response(name: &str, arguments: &str) -> ProviderResponse {
    let mut message = Message::assistant("");
    message.tool_calls.push(MessageToolCall {
        id: format!("call_{name}"),
        name: name.into(),
        arguments: arguments.into(),
    });
    ProviderResponse {
        message,
        usage: None,
        model: "mock-model".into(),
    }
}

/// Returns scripted outcomes in order; once they run out, repeats the last one.
pub struct SequentialMockProvider {
    outcomes: Vec<Result<ProviderResponse, ProviderError>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::with_outcomes(responses.into_iter().map(Ok).collect())
    }

    pub fn with_outcomes(outcomes: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            outcomes,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| text_response(t)).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len().min(self.outcomes.len().saturating_sub(1));
        requests.push(request);
        self.outcomes
            .get(index)
            .cloned()
            .unwrap_or_else(|| Err(ProviderError::NotConfigured("no scripted responses".into())))
    }
}
