//! `prospector run`: drive the planning loop on one outreach request.

use anyhow::{Context, bail};
use prospector_agent::{PlanningLoop, StopReason, seed_tasks};
use prospector_channels::CliChannel;
use prospector_config::{AppConfig, RunMode};
use prospector_core::interaction::Interaction;
use prospector_memory::{MemoryStore, backend_from_name};
use prospector_tools::{ToolContext, default_registry};
use prospector_workflow::TaskGraph;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub async fn run(
    config_path: Option<&Path>,
    prompt: Option<String>,
    mode: Option<RunMode>,
    max_turns: Option<usize>,
) -> anyhow::Result<()> {
    let mut config = super::load_config(config_path)?;
    if let Some(mode) = mode {
        config.set_mode(mode);
    }
    if let Some(max_turns) = max_turns {
        config.agent.max_turns = max_turns;
    }
    config.validate()?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    DEEPSEEK_API_KEY=sk-...     (recommended)");
        eprintln!("    PROSPECTOR_API_KEY=sk-...   (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", super::config_path(config_path).display());
        eprintln!();
        bail!("No API key found. See above for setup instructions.");
    }

    for dir in config.state_dirs() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let interaction: Arc<dyn Interaction> = Arc::new(CliChannel::new());
    let prompt = match prompt {
        Some(prompt) => prompt,
        None => {
            interaction.show("What would you like the sales agent to do?\n").await?;
            interaction.ask("> ").await?
        }
    };

    let summary = run_with(Arc::new(config), interaction, &prompt).await?;
    if let StopReason::TurnFailed(e) = &summary.stop_reason {
        bail!("Run stopped after a failed turn: {e}");
    }
    Ok(())
}

/// Wire every component from `config` and run the loop to completion.
async fn run_with(
    config: Arc<AppConfig>,
    interaction: Arc<dyn Interaction>,
    prompt: &str,
) -> anyhow::Result<prospector_agent::RunSummary> {
    let memory = Arc::new(MemoryStore::new(backend_from_name(
        &config.memory.backend,
        &config.memory_path(),
    )));
    let tasks = TaskGraph::new().with_report(&config.paths.task_log).shared();
    let oracle = prospector_providers::build_oracle(&config);

    let ctx = ToolContext::new(config.clone(), memory, tasks.clone(), interaction.clone())
        .with_oracle(oracle.clone());
    let tools = Arc::new(default_registry(&ctx));

    info!(
        mode = ?config.agent.mode,
        dry_run = config.dry_run,
        provider = %config.default_provider,
        model = %config.default_model,
        "Starting outreach run"
    );
    println!();
    let dry_run = if config.dry_run { " (dry run)" } else { "" };
    println!("  Mode:      {:?}{dry_run}", config.agent.mode);
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Tools:     {}", tools.names().join(", "));
    println!();

    seed_tasks(
        config.agent.task_seeding,
        &tasks,
        oracle.as_ref(),
        &config.default_model,
        prompt,
    )
    .await;

    let planner = PlanningLoop::new(oracle, &config.default_model, tools, tasks, interaction)
        .with_settings(&config.agent)
        .with_temperature(config.default_temperature);
    let summary = planner.run(prompt).await;

    println!();
    println!("  Run finished after {} turns: {}", summary.turns, summary.stop_reason);
    if !summary.leads.is_empty() {
        println!("  Leads in last batch: {}", summary.leads.len());
        for lead in &summary.leads {
            println!("    - {} ({}, {}) <{}>", lead.name, lead.title, lead.company, lead.email);
        }
    }
    println!("  Task report: {}", config.paths.task_log.display());
    println!();

    Ok(summary)
}
