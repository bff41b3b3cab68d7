//! Provider router: builds the reasoning oracle from configuration.
//!
//! Every configured provider is registered by name. The oracle handed to the
//! planning loop is the default provider, followed by the remaining ones as a
//! fallback chain.

use crate::chain::OracleChain;
use crate::chat::ChatCompletionsProvider;
use prospector_core::provider::Provider;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Routes oracle requests to the correct provider.
pub struct ProviderRouter {
    providers: BTreeMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: BTreeMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }

    /// The default provider first, then every other provider in name order.
    ///
    /// A single provider is returned as-is; more than one is wrapped in an
    /// [`OracleChain`].
    pub fn oracle(&self) -> Arc<dyn Provider> {
        let mut chain: Vec<Arc<dyn Provider>> = Vec::new();
        if let Some(primary) = self.default() {
            chain.push(primary);
        }
        for (name, provider) in &self.providers {
            if *name != self.default_provider {
                chain.push(provider.clone());
            }
        }

        if chain.len() == 1 {
            return chain.remove(0);
        }

        debug!(providers = chain.len(), "Building oracle fallback chain");
        Arc::new(chain.into_iter().fold(OracleChain::new(), OracleChain::then))
    }
}

/// Build providers from configuration.
pub fn build_from_config(config: &prospector_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));

        router.register(
            name.clone(),
            Arc::new(ChatCompletionsProvider::new(name, &base_url, &api_key)),
        );
    }

    // The default provider exists even when it has no table of its own
    if router.get(&config.default_provider).is_none() {
        let api_key = config.api_key.clone().unwrap_or_default();
        let base_url = default_base_url(&config.default_provider);
        router.register(
            config.default_provider.clone(),
            Arc::new(ChatCompletionsProvider::new(
                &config.default_provider,
                &base_url,
                &api_key,
            )),
        );
    }

    router
}

/// Convenience: the oracle for a configuration.
pub fn build_oracle(config: &prospector_config::AppConfig) -> Arc<dyn Provider> {
    build_from_config(config).oracle()
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
