//! Populating the task graph before the first planning turn.

use prospector_config::TaskSeeding;
use prospector_core::message::Message;
use prospector_core::provider::{Provider, ProviderRequest};
use prospector_workflow::{PlannedTask, SharedTaskGraph, Task, default_outreach_plan, parse_plan};
use tracing::{info, warn};

const PLANNING_PROMPT: &str = "\
You are a sales development agent. Break the user's outreach request into a task list.
Reply with only a JSON array. Each element has \"id\" (task-1, task-2, ...), \"description\",
and \"dependencies\" (ids of tasks that must finish first).
A typical plan: analyze the request, generate the ideal customer profile, find leads,
research each lead, write emails, get approval, send emails, log to the CRM.";

/// Ask the oracle for a plan, or `None` when it fails or replies with nothing usable.
pub async fn plan_with_oracle(
    oracle: &dyn Provider,
    model: &str,
    prompt: &str,
) -> Option<Vec<PlannedTask>> {
    let request = ProviderRequest::new(
        model,
        vec![Message::user(format!("{PLANNING_PROMPT}\n\nUser request: {prompt}"))],
    );

    match oracle.complete(request).await {
        Ok(response) => {
            let plan = parse_plan(&response.message.content);
            if plan.is_none() {
                warn!("Oracle plan was unreadable, using the default plan");
            }
            plan
        }
        Err(e) => {
            warn!(error = %e, "Oracle planning failed, using the default plan");
            None
        }
    }
}

/// Seed `tasks` according to `seeding`. Returns the inserted tasks.
pub async fn seed_tasks(
    seeding: TaskSeeding,
    tasks: &SharedTaskGraph,
    oracle: &dyn Provider,
    model: &str,
    prompt: &str,
) -> Vec<Task> {
    let plan = match seeding {
        TaskSeeding::None => return Vec::new(),
        TaskSeeding::Default => default_outreach_plan(),
        TaskSeeding::Oracle => plan_with_oracle(oracle, model, prompt)
            .await
            .unwrap_or_else(default_outreach_plan),
    };

    let inserted = tasks.lock().await.insert_plan(&plan);
    info!(count = inserted.len(), seeding = ?seeding, "Task graph seeded");
    inserted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SequentialMockProvider;
    use prospector_workflow::TaskGraph;

    #[tokio::test]
    async fn none_leaves_graph_empty() {
        let graph = TaskGraph::new().shared();
        let oracle = SequentialMockProvider::new(vec![]);
        let seeded = seed_tasks(TaskSeeding::None, &graph, &oracle, "m", "x").await;
        assert!(seeded.is_empty());
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn default_inserts_eight_chained_tasks() {
        let graph = TaskGraph::new().shared();
        let oracle = SequentialMockProvider::new(vec![]);
        let seeded = seed_tasks(TaskSeeding::Default, &graph, &oracle, "m", "x").await;
        assert_eq!(seeded.len(), 8);
        let graph = graph.lock().await;
        assert_eq!(graph.get_next_ready_task().unwrap().id.as_str(), "task-1");
    }

    #[tokio::test]
    async fn oracle_plan_wrapped_in_prose() {
        let graph = TaskGraph::new().shared();
        let oracle = SequentialMockProvider::texts(&[
            r#"Sure! ["Find fintech CFOs", "Email them"]"#,
        ]);
        let seeded = seed_tasks(TaskSeeding::Oracle, &graph, &oracle, "m", "x").await;
        assert_eq!(seeded.len(), 2);
        assert_eq!(seeded[1].description, "Email them");
        assert_eq!(seeded[1].dependencies[0].as_str(), "task-1");
    }

    #[tokio::test]
    async fn unreadable_oracle_plan_falls_back_to_default() {
        let graph = TaskGraph::new().shared();
        let oracle = SequentialMockProvider::texts(&["I'd rather not."]);
        let seeded = seed_tasks(TaskSeeding::Oracle, &graph, &oracle, "m", "x").await;
        assert_eq!(seeded.len(), 8);
    }
}
