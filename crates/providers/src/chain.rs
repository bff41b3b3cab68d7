//! The oracle chain: the default provider first, then the others in order.
//!
//! Each link gets its own deadline. A turn only fails once every link has
//! failed, and then with the error of the last link tried.

use async_trait::async_trait;
use prospector_core::error::ProviderError;
use prospector_core::provider::{Provider, ProviderRequest, ProviderResponse};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Per-link deadline when none is given.
pub const DEFAULT_LINK_TIMEOUT: Duration = Duration::from_secs(90);

struct Link {
    provider: Arc<dyn Provider>,
    timeout: Duration,
}

pub struct OracleChain {
    links: Vec<Link>,
}

impl OracleChain {
    pub fn new() -> Self {
        Self { links: Vec::new() }
    }

    pub fn then(mut self, provider: Arc<dyn Provider>) -> Self {
        self.links.push(Link {
            provider,
            timeout: DEFAULT_LINK_TIMEOUT,
        });
        self
    }

    pub fn then_with_timeout(mut self, provider: Arc<dyn Provider>, timeout: Duration) -> Self {
        self.links.push(Link { provider, timeout });
        self
    }

    /// Provider names in the order they are tried.
    pub fn names(&self) -> Vec<&str> {
        self.links.iter().map(|l| l.provider.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    async fn attempt(
        link: &Link,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        match tokio::time::timeout(link.timeout, link.provider.complete(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::Timeout(format!(
                "{} gave no answer within {}s",
                link.provider.name(),
                link.timeout.as_secs()
            ))),
        }
    }
}

impl Default for OracleChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for OracleChain {
    fn name(&self) -> &str {
        "oracle"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut last = ProviderError::NotConfigured("no oracle provider configured".into());

        for (position, link) in self.links.iter().enumerate() {
            let provider = link.provider.name();
            debug!(provider, position, "Asking oracle");

            match Self::attempt(link, request.clone()).await {
                Ok(response) => {
                    if position > 0 {
                        warn!(provider, "Oracle answered from a fallback provider");
                    }
                    return Ok(response);
                }
                Err(e @ ProviderError::AuthenticationFailed(_)) => {
                    error!(provider, error = %e, "Oracle rejected the API key");
                    last = e;
                }
                Err(e) => {
                    warn!(provider, error = %e, "Oracle provider failed");
                    last = e;
                }
            }
        }

        Err(last)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        for link in &self.links {
            if matches!(link.provider.health_check().await, Ok(true)) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospector_core::message::Message;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behaviour {
        Answer(&'static str),
        Fail(ProviderError),
        Hang,
    }

    struct StubOracle {
        name: &'static str,
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl StubOracle {
        fn new(name: &'static str, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                name,
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provider for StubOracle {
        fn name(&self) -> &str {
            self.name
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Answer(text) => Ok(ProviderResponse {
                    message: Message::assistant(*text),
                    usage: None,
                    model: "stub".into(),
                }),
                Behaviour::Fail(e) => Err(e.clone()),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(ProviderError::Network("woke up".into()))
                }
            }
        }
    }

    fn request() -> ProviderRequest {
        ProviderRequest::new("deepseek-chat", vec![Message::user("Find SaaS founders")])
    }

    #[tokio::test]
    async fn primary_answer_skips_the_rest() {
        let primary = StubOracle::new("deepseek", Behaviour::Answer("plan ready"));
        let backup = StubOracle::new("openai", Behaviour::Answer("unused"));
        let chain = OracleChain::new().then(primary.clone()).then(backup.clone());

        let response = chain.complete(request()).await.unwrap();
        assert_eq!(response.message.content, "plan ready");
        assert_eq!((primary.calls(), backup.calls()), (1, 0));
    }

    #[tokio::test]
    async fn rate_limited_primary_falls_through() {
        let primary = StubOracle::new(
            "deepseek",
            Behaviour::Fail(ProviderError::RateLimited { retry_after_secs: 30 }),
        );
        let backup = StubOracle::new("openai", Behaviour::Answer("from backup"));
        let chain = OracleChain::new().then(primary.clone()).then(backup.clone());

        let response = chain.complete(request()).await.unwrap();
        assert_eq!(response.message.content, "from backup");
        assert_eq!((primary.calls(), backup.calls()), (1, 1));
    }

    #[tokio::test]
    async fn every_link_failing_reports_the_last_error() {
        let chain = OracleChain::new()
            .then(StubOracle::new(
                "deepseek",
                Behaviour::Fail(ProviderError::Network("connection refused".into())),
            ))
            .then(StubOracle::new(
                "openai",
                Behaviour::Fail(ProviderError::AuthenticationFailed("bad key".into())),
            ));

        let err = chain.complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_link_times_out() {
        let backup = StubOracle::new("openai", Behaviour::Answer("late but fine"));
        let chain = OracleChain::new()
            .then_with_timeout(StubOracle::new("deepseek", Behaviour::Hang), Duration::from_secs(5))
            .then(backup.clone());

        let response = chain.complete(request()).await.unwrap();
        assert_eq!(response.message.content, "late but fine");
        assert_eq!(backup.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn lone_hung_link_is_a_timeout_error() {
        let chain = OracleChain::new().then_with_timeout(
            StubOracle::new("deepseek", Behaviour::Hang),
            Duration::from_secs(5),
        );

        let err = chain.complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(ref m) if m.contains("deepseek")));
    }

    #[tokio::test]
    async fn empty_chain_is_not_configured() {
        let chain = OracleChain::new();
        assert!(chain.is_empty());
        let err = chain.complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn names_follow_insertion_order() {
        let chain = OracleChain::new()
            .then(StubOracle::new("deepseek", Behaviour::Answer("")))
            .then(StubOracle::new("groq", Behaviour::Answer("")));
        assert_eq!(chain.names(), vec!["deepseek", "groq"]);
        assert_eq!(chain.len(), 2);
    }
}
