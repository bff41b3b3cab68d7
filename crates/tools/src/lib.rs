//! Outreach capabilities for prospector.
//!
//! Each capability implements [`Tool`](prospector_core::tool::Tool) and is
//! registered once per run by [`default_registry`]. Capabilities with more
//! than one backend (lead sources, scrapers, mail transports, CRMs) hold an
//! [`AdapterChain`] and fall through to the next adapter on failure.

pub mod adapter;
mod args;
pub mod context;
pub mod crm;
pub mod email_send;
pub mod email_write;
pub mod icp;
pub mod interaction;
pub mod leads;
pub mod memory;
pub mod scrape;
pub mod tasks;

pub use adapter::{Adapter, AdapterChain, Handled};
pub use context::ToolContext;

use prospector_core::tool::ToolRegistry;
use std::sync::Arc;

/// Create the registry with every capability wired to `ctx`.
///
/// `send_email` is gated through `ctx.interaction`; in dry run every
/// adapter chain is reduced to its local backend.
pub fn default_registry(ctx: &ToolContext) -> ToolRegistry {
    let config = &ctx.config;
    let mut registry = ToolRegistry::new().with_gate(ctx.interaction.clone());

    let mut icp_tool = icp::GenerateIcpTool::new(ctx.memory.clone(), ctx.interaction.clone());
    let scraper = Arc::new(scrape::WebsiteScraper::from_config(config));
    let mut write_tool = email_write::WriteEmailTool::new(scraper.clone()).configured(config);
    if let Some(oracle) = &ctx.oracle {
        icp_tool = icp_tool.with_oracle(oracle.clone(), ctx.model());
        write_tool = write_tool.with_oracle(oracle.clone(), ctx.model());
    }

    registry.register(Box::new(icp_tool));
    registry.register(Box::new(leads::GetLeadsTool::new(
        ctx.memory.clone(),
        leads::lead_chain(config),
        config.leads.default_count as usize,
    )));
    registry.register(Box::new(scrape::ScrapeWebsiteTool::new(scraper)));
    registry.register(Box::new(write_tool));
    registry.register(Box::new(email_send::SendEmailTool::new(
        email_send::transport_chain(config),
    )));
    registry.register(Box::new(crm::LogToCrmTool::new(crm::crm_chain(config))));

    registry.register(Box::new(tasks::AddTaskTool::new(ctx.tasks.clone())));
    registry.register(Box::new(tasks::CompleteTaskTool::new(ctx.tasks.clone())));
    registry.register(Box::new(tasks::AddTaskNoteTool::new(ctx.tasks.clone())));
    registry.register(Box::new(tasks::GetTasksTool::new(ctx.tasks.clone())));

    registry.register(Box::new(interaction::GetUserInputTool::new(ctx.interaction.clone())));
    registry.register(Box::new(interaction::ConfirmActionTool::new(ctx.interaction.clone())));

    registry.register(Box::new(memory::RememberTool::new(ctx.memory.clone())));
    registry.register(Box::new(memory::RecallTool::new(ctx.memory.clone())));
    registry.register(Box::new(memory::EnsureRequiredInputsTool::new(
        ctx.memory.clone(),
        ctx.interaction.clone(),
    )));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospector_channels::ScriptedChannel;
    use prospector_config::AppConfig;
    use prospector_core::tool::Capability;
    use prospector_memory::MemoryStore;
    use prospector_workflow::TaskGraph;
    use serde_json::json;

    fn context(data_dir: &std::path::Path) -> ToolContext {
        let mut config = AppConfig {
            dry_run: true,
            ..AppConfig::default()
        };
        config.paths.data_dir = data_dir.to_path_buf();
        ToolContext::new(
            Arc::new(config),
            Arc::new(MemoryStore::in_memory()),
            TaskGraph::new().shared(),
            Arc::new(ScriptedChannel::silent()),
        )
    }

    #[test]
    fn registry_exposes_every_capability() {
        let dir = tempfile::tempdir().unwrap();
        let registry = default_registry(&context(dir.path()));
        assert_eq!(registry.len(), Capability::ALL.len());
        for capability in Capability::ALL {
            assert!(registry.get(capability).is_some(), "{capability} missing");
        }
    }

    #[tokio::test]
    async fn dry_run_get_leads_serves_sample_leads() {
        let dir = tempfile::tempdir().unwrap();
        let registry = default_registry(&context(dir.path()));

        let result = registry
            .dispatch(
                "get_leads",
                json!({ "industry": "AI SaaS", "role": "Founder", "location": "", "count": 3 }),
            )
            .await;
        assert_eq!(result.get("source"), Some(&json!("local")));
        assert_eq!(result.get("count"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn send_email_without_an_answer_is_declined() {
        let dir = tempfile::tempdir().unwrap();
        let registry = default_registry(&context(dir.path()));

        let result = registry
            .dispatch(
                "send_email",
                json!({ "recipient_email": "a@b.io", "subject": "s", "body": "b" }),
            )
            .await;
        assert_eq!(result.status(), "cancelled");
        assert!(!dir.path().join("emails").exists());
    }
}
