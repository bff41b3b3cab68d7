//! The planning loop's standing instructions.

use prospector_core::tool::ToolRegistry;

const PREAMBLE: &str =
    "You are an autonomous sales development agent that runs cold outreach for the user.";

const TASK_RULES: &str = "\
Keep a task list while you work:
1. Decide which tasks the request needs and add them with add_task, naming dependencies by task id.
2. Call get_tasks whenever you are unsure what comes next.
3. Mark each task done with complete_task as soon as it is finished.
4. Record findings and decisions with add_task_note.

Do not guess what the user wants. Ask with get_user_input,
and store answers with remember so you never ask twice.
Sending email always needs the user's confirmation; never try to work around it.
Work through the tasks one step at a time.
When everything is done, say that the workflow is completed.";

/// Build the system prompt listing every registered capability.
pub fn system_prompt(tools: &ToolRegistry) -> String {
    let capabilities: Vec<String> = tools
        .definitions()
        .into_iter()
        .map(|d| format!("- {}: {}", d.name, d.description))
        .collect();

    format!(
        "{PREAMBLE}\n\nYou can use these capabilities:\n{}\n\n{TASK_RULES}\n",
        capabilities.join("\n")
    )
}
