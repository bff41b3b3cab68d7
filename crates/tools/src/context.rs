//! Everything a capability may touch, constructed once per run.

use prospector_config::AppConfig;
use prospector_core::interaction::Interaction;
use prospector_core::provider::Provider;
use prospector_memory::MemoryStore;
use prospector_workflow::SharedTaskGraph;
use std::sync::Arc;

#[derive(Clone)]
pub struct ToolContext {
    pub config: Arc<AppConfig>,
    pub memory: Arc<MemoryStore>,
    pub tasks: SharedTaskGraph,
    pub interaction: Arc<dyn Interaction>,
    /// Used for ICP extraction and email drafting; rule-based and template
    /// fallbacks apply without it.
    pub oracle: Option<Arc<dyn Provider>>,
}

impl ToolContext {
    pub fn new(
        config: Arc<AppConfig>,
        memory: Arc<MemoryStore>,
        tasks: SharedTaskGraph,
        interaction: Arc<dyn Interaction>,
    ) -> Self {
        Self {
            config,
            memory,
            tasks,
            interaction,
            oracle: None,
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn Provider>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn model(&self) -> &str {
        &self.config.default_model
    }

    pub fn dry_run(&self) -> bool {
        self.config.dry_run
    }
}
